use crate::lang::Lang;
use crate::retrieval::RetrievedPassage;

/// The user's question with its resolved language. Immutable once detected.
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    pub text: String,
    pub lang: Lang,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Relevant,
    NotRelevant,
}

impl Verdict {
    pub fn is_relevant(self) -> bool {
        self == Verdict::Relevant
    }
}

/// One retrieve-and-grade cycle. `verdicts[i]` judges `passages[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Attempt {
    pub query: String,
    pub passages: Vec<RetrievedPassage>,
    pub verdicts: Vec<Verdict>,
}

impl Attempt {
    pub fn relevant_count(&self) -> usize {
        self.verdicts.iter().filter(|v| v.is_relevant()).count()
    }

    /// Relevant passages in retrieved order.
    pub fn relevant_passages(&self) -> Vec<RetrievedPassage> {
        self.passages
            .iter()
            .zip(&self.verdicts)
            .filter(|(_, v)| v.is_relevant())
            .map(|(p, _)| p.clone())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Answered {
        text: String,
        passages_used: Vec<RetrievedPassage>,
    },
    NotFound {
        message: String,
    },
}

impl Outcome {
    pub fn text(&self) -> &str {
        match self {
            Outcome::Answered { text, .. } => text,
            Outcome::NotFound { message } => message,
        }
    }

    pub fn is_answered(&self) -> bool {
        matches!(self, Outcome::Answered { .. })
    }
}

/// Everything one `ask` produced. The session itself is not kept.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    pub question: Question,
    pub attempts: Vec<Attempt>,
    pub outcome: Outcome,
}

impl SessionReport {
    /// Language of the returned text; always the question's language.
    pub fn answer_lang(&self) -> Lang {
        self.question.lang
    }

    /// One line per passage the answer was grounded on, in the order given to
    /// the generator. Empty when nothing was found.
    pub fn sources(&self) -> Vec<String> {
        let Outcome::Answered { passages_used, .. } = &self.outcome else {
            return Vec::new();
        };
        passages_used
            .iter()
            .enumerate()
            .map(|(n, p)| match p.label() {
                Some(label) => format!("{}. {label} (passage {}, score {:.3})", n + 1, p.id, p.score),
                None => format!("{}. passage {} (score {:.3})", n + 1, p.id, p.score),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::Metadata;

    fn passage(id: usize) -> RetrievedPassage {
        RetrievedPassage {
            id,
            score: 1.0 - id as f32 * 0.1,
            text: format!("passage {id}"),
            metadata: Metadata::new(),
        }
    }

    #[test]
    fn relevant_passages_keep_retrieved_order() {
        let attempt = Attempt {
            query: "q".into(),
            passages: (0..4).map(passage).collect(),
            verdicts: vec![
                Verdict::NotRelevant,
                Verdict::Relevant,
                Verdict::NotRelevant,
                Verdict::Relevant,
            ],
        };

        assert_eq!(attempt.relevant_count(), 2);
        let ids: Vec<_> = attempt.relevant_passages().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    fn report(outcome: Outcome) -> SessionReport {
        SessionReport {
            question: Question {
                text: "Who built Petra?".into(),
                lang: Lang::English,
            },
            attempts: vec![],
            outcome,
        }
    }

    #[test]
    fn sources_list_grounding_passages_with_labels() {
        let mut labelled = passage(4);
        labelled.metadata.insert("country".into(), "Jordan".into());
        let answered = report(Outcome::Answered {
            text: "The Nabataeans.".into(),
            passages_used: vec![labelled, passage(7)],
        });

        assert_eq!(
            answered.sources(),
            vec![
                "1. Jordan (passage 4, score 0.600)".to_string(),
                "2. passage 7 (score 0.300)".to_string(),
            ]
        );
    }

    #[test]
    fn not_found_has_no_sources() {
        let not_found = report(Outcome::NotFound {
            message: "nothing".into(),
        });
        assert!(not_found.sources().is_empty());
    }

    #[test]
    fn outcome_text_covers_both_variants() {
        let answered = Outcome::Answered {
            text: "Built by the Nabataeans.".into(),
            passages_used: vec![],
        };
        let not_found = Outcome::NotFound {
            message: "nothing".into(),
        };
        assert_eq!(answered.text(), "Built by the Nabataeans.");
        assert!(answered.is_answered());
        assert_eq!(not_found.text(), "nothing");
        assert!(!not_found.is_answered());
    }
}
