use tracing::debug;

use super::prompts::answer_prompt;
use super::session::Question;
use crate::error::ServiceError;
use crate::ollama::{OllamaError, TextModel};
use crate::retrieval::RetrievedPassage;

/// Produces an answer in `question.lang` grounded in `passages`.
pub trait AnswerGenerator {
    async fn generate(
        &self,
        question: &Question,
        passages: &[RetrievedPassage],
    ) -> Result<String, ServiceError>;
}

#[derive(Clone)]
pub struct LlmGenerator<M> {
    model: M,
}

impl<M: TextModel> LlmGenerator<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }
}

impl<M: TextModel> AnswerGenerator for LlmGenerator<M> {
    async fn generate(
        &self,
        question: &Question,
        passages: &[RetrievedPassage],
    ) -> Result<String, ServiceError> {
        let prompt = answer_prompt(question, passages);
        let answer = self.model.complete(&prompt).await?.trim().to_string();
        if answer.is_empty() {
            return Err(OllamaError::EmptyResponse("answer").into());
        }
        debug!(lang = %question.lang, chars = answer.len(), "answer generated");
        Ok(answer)
    }
}
