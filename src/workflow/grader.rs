use tracing::debug;

use super::prompts::grading_prompt;
use super::session::{Question, Verdict};
use crate::error::ServiceError;
use crate::ollama::TextModel;

/// Judges whether one passage helps answer the question.
///
/// Calls must not share mutable state: the controller grades the passages of
/// one attempt concurrently.
pub trait RelevanceGrader {
    async fn grade(&self, question: &Question, passage: &str) -> Result<Verdict, ServiceError>;
}

/// Grader that asks a language model for a one-word yes/no judgment.
#[derive(Clone)]
pub struct LlmGrader<M> {
    model: M,
}

impl<M: TextModel> LlmGrader<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }
}

impl<M: TextModel> RelevanceGrader for LlmGrader<M> {
    async fn grade(&self, question: &Question, passage: &str) -> Result<Verdict, ServiceError> {
        let reply = self.model.complete(&grading_prompt(question, passage)).await?;
        let verdict = parse_verdict(&reply);
        debug!(reply = %reply, ?verdict, "graded passage");
        Ok(verdict)
    }
}

/// Relevant only when the first word of the reply is an affirmative.
fn parse_verdict(reply: &str) -> Verdict {
    let first = reply
        .split_whitespace()
        .next()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .unwrap_or_default();

    match first.as_str() {
        "yes" | "نعم" => Verdict::Relevant,
        _ => Verdict::NotRelevant,
    }
}
