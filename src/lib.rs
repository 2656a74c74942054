pub mod config;
pub mod error;
pub mod lang;
pub mod ollama;
pub mod retrieval;
pub mod workflow;

pub const USER_AGENT: &str = concat!("heritage-rag/", env!("CARGO_PKG_VERSION"));

pub use config::{Config, ConfigError, Settings};
pub use error::{AskError, ServiceError};
pub use lang::{Lang, LanguageIdentifier, ScriptIdentifier};
pub use ollama::OllamaClient;
pub use retrieval::{FlatIndex, QueryEncoder, VectorIndex};
pub use workflow::{Components, Outcome, SessionReport, Workflow};
