use tracing::debug;

use super::prompts::rewrite_prompt;
use super::session::{Attempt, Question};
use crate::error::ServiceError;
use crate::ollama::TextModel;

/// Reformulates the original question into a new search query.
///
/// `history` holds every attempt so far, oldest first, so implementations can
/// steer away from phrasings that already retrieved nothing relevant.
pub trait QueryRewriter {
    async fn rewrite(
        &self,
        original: &Question,
        history: &[Attempt],
    ) -> Result<String, ServiceError>;
}

#[derive(Clone)]
pub struct LlmRewriter<M> {
    model: M,
}

impl<M: TextModel> LlmRewriter<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }
}

impl<M: TextModel> QueryRewriter for LlmRewriter<M> {
    async fn rewrite(
        &self,
        original: &Question,
        history: &[Attempt],
    ) -> Result<String, ServiceError> {
        let reply = self.model.complete(&rewrite_prompt(original, history)).await?;
        let query = clean_rewrite(&reply);
        debug!(query = %query, "query rewritten");
        Ok(query)
    }
}

const LABELS: [&str; 3] = ["rewritten query:", "query:", "الاستعلام المُعاد صياغته:"];

/// First non-empty line, without a leading label or wrapping quotes.
fn clean_rewrite(reply: &str) -> String {
    let line = reply
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default();

    let unlabeled = LABELS
        .iter()
        .find_map(|label| {
            let prefix = line.get(..label.len())?;
            (prefix.to_lowercase() == *label).then(|| line[label.len()..].trim_start())
        })
        .unwrap_or(line);

    unlabeled
        .trim_matches(|c: char| matches!(c, '"' | '\'' | '`' | '“' | '”' | '«' | '»'))
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::Lang;
    use crate::ollama::OllamaError;
    use std::sync::Mutex;

    struct ScriptedModel {
        reply: String,
        prompts: Mutex<Vec<String>>,
    }

    impl TextModel for ScriptedModel {
        async fn complete(&self, prompt: &str) -> Result<String, OllamaError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.reply.clone())
        }
    }

    #[test]
    fn strips_label_and_quotes() {
        assert_eq!(
            clean_rewrite("Rewritten Query: \"Petra Nabataean history\""),
            "Petra Nabataean history"
        );
        assert_eq!(clean_rewrite("«تاريخ البتراء»"), "تاريخ البتراء");
    }

    #[test]
    fn keeps_first_non_empty_line() {
        assert_eq!(
            clean_rewrite("\n\n  Petra founding\nThis query focuses on..."),
            "Petra founding"
        );
    }

    #[test]
    fn strips_arabic_label() {
        assert_eq!(
            clean_rewrite("الاستعلام المُعاد صياغته: تاريخ البتراء"),
            "تاريخ البتراء"
        );
    }

    #[test]
    fn empty_reply_stays_empty() {
        assert_eq!(clean_rewrite("   \n "), "");
        assert_eq!(clean_rewrite("\"\""), "");
    }

    #[tokio::test]
    async fn rewrite_includes_history_in_prompt() {
        let rewriter = LlmRewriter::new(ScriptedModel {
            reply: "Query: Nabataean capital Petra".into(),
            prompts: Mutex::new(Vec::new()),
        });
        let question = Question {
            text: "What is the history of this heritage site?".into(),
            lang: Lang::English,
        };
        let history = vec![Attempt {
            query: question.text.clone(),
            passages: vec![],
            verdicts: vec![],
        }];

        let query = rewriter.rewrite(&question, &history).await.unwrap();

        assert_eq!(query, "Nabataean capital Petra");
        let prompts = rewriter.model.prompts.lock().unwrap();
        assert!(prompts[0].contains("- What is the history of this heritage site? (0 relevant)"));
    }
}
