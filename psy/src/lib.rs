//! Psy - templated chat-completion scoring over CSV tables
//!
//! Each row of an answer table is merged into a prompt template, sent to a
//! chat model, and the numbers found in the reply are written back as
//! scores. Runs go either through many concurrent requests or through an
//! OpenAI batch job that a later invocation reconciles.
//!
//! # Quick Start
//!
//! ```no_run
//! # #[cfg(all(feature = "openai", feature = "batch"))]
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use psy::batch::{build_requests, run_parallel, ChatParameters};
//! use psy::openai::{OpenAI, OpenAIConfig};
//! use psy::table::TextCache;
//! use std::sync::Arc;
//!
//! let gateway = Arc::new(OpenAI::new(OpenAIConfig::from_env()?)?);
//! let params = ChatParameters {
//!     prompt_file: "prompt.txt".into(),
//!     answer_file: "answers.csv".into(),
//!     answer_field: "answer".into(),
//!     output_file: "scores.csv".into(),
//!     ..Default::default()
//! };
//! let (chats, mut table) = build_requests(gateway.as_ref(), &params, &mut TextCache::new()).await?;
//! let summary = run_parallel(gateway, chats, &mut table, &params, |_| {}).await?;
//! println!("{summary}");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Re-export core types
pub use psy_core::*;

#[cfg(feature = "openai")]
#[cfg_attr(docsrs, doc(cfg(feature = "openai")))]
pub mod openai {
    //! OpenAI gateway
    pub use psy_openai::*;
}

#[cfg(feature = "batch")]
#[cfg_attr(docsrs, doc(cfg(feature = "batch")))]
pub mod batch {
    //! Request building, concurrent runs and batch jobs
    pub use psy_batch::*;
}

pub mod table {
    //! Tabular data store and side-table readers
    pub use psy_table::*;
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use psy_core::{Batch, BatchStatus, ChatRequest, ChatResponse, Error, Gateway, Message, Role};
    pub use psy_table::{Table, TextCache};

    #[cfg(feature = "openai")]
    pub use psy_openai::{OpenAI, OpenAIConfig};

    #[cfg(feature = "batch")]
    pub use psy_batch::{Chat, ChatParameters, Selection};
}
