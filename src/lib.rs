//! Customer feedback classification and response generation.
//!
//! Each text is scored for sentiment, sarcasm and emotion by independent
//! classifiers with fallback chains, then turned into a templated reply
//! with an empathy score.

pub mod composer;
pub mod config;
pub mod deberta_engine;
pub mod emotion;
pub mod engine;
pub mod error;
pub mod normalizer;
pub mod pipeline;
pub mod remote;
pub mod sarcasm;
pub mod sentiment;
pub mod server;
pub mod store;
pub mod tier;
pub mod types;

pub use error::{PipelineError, Result};
pub use pipeline::Pipeline;
pub use types::{Analysis, ClassificationBundle, Label, ResponseRecord};
