//! Constants for the OpenAI gateway

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Per-call timeout applied to every request
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Environment variable holding the organization ID
pub const ORG_ID_ENV: &str = "OPENAI_ORG_ID";

/// Environment variable overriding the base URL
pub const BASE_URL_ENV: &str = "OPENAI_BASE_URL";

/// Header carrying the organization ID
pub const ORGANIZATION_HEADER: &str = "OpenAI-Organization";

/// Page size for batch listings
pub const BATCH_LIST_LIMIT: u32 = 100;

/// Page size for fine-tuning job listings
pub const FINE_TUNE_LIST_LIMIT: u32 = 20;
