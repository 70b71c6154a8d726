//! Studio Providers - HTTP-backed collaborators
//!
//! Implements the core seams against real services:
//! - [`StructuredInvoker`]: OpenAI-compatible structured-output runtime
//! - [`WrapperInvoker`]: generic model wrapper endpoint
//! - [`LangfuseRecorder`]: Langfuse ingestion API
//!
//! [`ProviderSettings`] selects exactly one invocation strategy and the
//! recorder when the studio is built.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod error;
pub mod http;
pub mod langfuse;
pub mod settings;
pub mod structured;
pub mod wrapper;

pub use error::ProviderError;
pub use langfuse::LangfuseRecorder;
pub use settings::ProviderSettings;
pub use structured::StructuredInvoker;
pub use wrapper::WrapperInvoker;
