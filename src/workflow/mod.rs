//! The question-answering session: a bounded retrieve, grade and rewrite loop
//! ending in either a grounded answer or a localized not-found message.

mod controller;
mod generator;
mod grader;
pub mod prompts;
mod rewriter;
mod session;

pub use controller::{Components, Workflow};
pub use generator::{AnswerGenerator, LlmGenerator};
pub use grader::{LlmGrader, RelevanceGrader};
pub use rewriter::{LlmRewriter, QueryRewriter};
pub use session::{Attempt, Outcome, Question, SessionReport, Verdict};
