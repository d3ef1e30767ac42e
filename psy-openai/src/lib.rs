//! OpenAI gateway for the psy toolkit
//!
//! [`OpenAI`] wraps the provider's REST API: models, files, batch jobs,
//! fine-tuning jobs and chat completions. It implements [`psy_core::Gateway`]
//! so the batch pipeline can run against it or against a test double.

#![warn(missing_docs)]

pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod http;

pub use client::OpenAI;
pub use config::OpenAIConfig;
pub use http::{HttpClient, ReqwestClient};
