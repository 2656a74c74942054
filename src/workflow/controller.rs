use std::future::Future;

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::generator::AnswerGenerator;
use super::grader::RelevanceGrader;
use super::rewriter::QueryRewriter;
use super::session::{Attempt, Outcome, Question, SessionReport, Verdict};
use crate::config::{ConfigError, Settings};
use crate::error::{AskError, ServiceError};
use crate::lang::{Detection, Lang, LanguageIdentifier};
use crate::retrieval::{QueryEncoder, RetrievedPassage, VectorIndex};

/// The collaborators a workflow drives. Built once per process and shared by
/// every session.
pub struct Components<L, E, V, G, A, R> {
    pub identifier: L,
    pub encoder: E,
    pub index: V,
    pub grader: G,
    pub generator: A,
    pub rewriter: R,
}

enum State {
    Detect,
    Retrieve { query: String },
    Grade {
        query: String,
        passages: Vec<RetrievedPassage>,
    },
    Decide,
    Generate { passages: Vec<RetrievedPassage> },
    Rewrite,
    Done(Outcome),
}

impl State {
    fn name(&self) -> &'static str {
        match self {
            State::Detect => "detect",
            State::Retrieve { .. } => "retrieve",
            State::Grade { .. } => "grade",
            State::Decide => "decide",
            State::Generate { .. } => "generate",
            State::Rewrite => "rewrite",
            State::Done(_) => "done",
        }
    }
}

struct Session {
    question: Question,
    attempts: Vec<Attempt>,
}

/// Answers one question per call: detect the language, retrieve and grade
/// passages, then either generate from the relevant ones or rewrite the query
/// and try again, up to `max_attempts` retrievals.
pub struct Workflow<L, E, V, G, A, R> {
    parts: Components<L, E, V, G, A, R>,
    settings: Settings,
}

impl<L, E, V, G, A, R> Workflow<L, E, V, G, A, R>
where
    L: LanguageIdentifier,
    E: QueryEncoder,
    V: VectorIndex,
    G: RelevanceGrader,
    A: AnswerGenerator,
    R: QueryRewriter,
{
    pub fn new(parts: Components<L, E, V, G, A, R>, settings: Settings) -> Result<Self, ConfigError> {
        settings.validate()?;
        Ok(Self { parts, settings })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Answers `question` in its own language. A question the knowledge base
    /// cannot answer yields the localized not-found message, not an error.
    pub async fn ask(&self, question: &str) -> Result<String, AskError> {
        let report = self.run(question, &CancellationToken::new()).await?;
        Ok(match report.outcome {
            Outcome::Answered { text, .. } => text,
            Outcome::NotFound { message } => message,
        })
    }

    /// Runs one session to completion. `cancel` is checked before every state
    /// transition; in-flight collaborator calls are never interrupted.
    pub async fn run(
        &self,
        question: &str,
        cancel: &CancellationToken,
    ) -> Result<SessionReport, AskError> {
        let mut session = Session {
            question: Question {
                text: question.trim().to_string(),
                lang: self.settings.default_language,
            },
            attempts: Vec::new(),
        };
        let mut state = State::Detect;

        loop {
            if cancel.is_cancelled() && !matches!(state, State::Done(_)) {
                info!(state = state.name(), attempt = session.attempts.len(), "session cancelled");
                return Err(AskError::Cancelled);
            }
            debug!(state = state.name(), attempt = session.attempts.len(), "entering state");

            state = match state {
                State::Detect => {
                    session.question.lang = self.detect(&session.question.text).await;
                    State::Retrieve {
                        query: session.question.text.clone(),
                    }
                }
                State::Retrieve { query } => {
                    let passages = self
                        .retrieve(&query)
                        .await
                        .map_err(AskError::RetrievalUnavailable)?;
                    State::Grade { query, passages }
                }
                State::Grade { query, passages } => {
                    let verdicts = self.grade_all(&session.question, &passages).await;
                    session.attempts.push(Attempt {
                        query,
                        passages,
                        verdicts,
                    });
                    State::Decide
                }
                State::Decide => self.decide(&session),
                State::Rewrite => State::Retrieve {
                    query: self.rewrite(&session).await?,
                },
                State::Generate { passages } => {
                    let text = self
                        .call(self.parts.generator.generate(&session.question, &passages))
                        .await
                        .map_err(AskError::GenerationFailed)?;
                    State::Done(Outcome::Answered {
                        text,
                        passages_used: passages,
                    })
                }
                State::Done(outcome) => {
                    info!(
                        answered = outcome.is_answered(),
                        attempts = session.attempts.len(),
                        lang = %session.question.lang,
                        "session finished"
                    );
                    return Ok(SessionReport {
                        question: session.question,
                        attempts: session.attempts,
                        outcome,
                    });
                }
            };
        }
    }

    async fn detect(&self, text: &str) -> Lang {
        let detection = tokio::time::timeout(
            self.settings.call_timeout,
            self.parts.identifier.identify(text),
        )
        .await
        .unwrap_or_else(|_| Detection::uncertain());

        match detection.lang {
            Some(lang)
                if detection.confidence >= self.settings.min_language_confidence
                    && self.settings.language_set.contains(&lang) =>
            {
                info!(lang = %lang, confidence = detection.confidence, "language detected");
                lang
            }
            _ => {
                let fallback = self.settings.default_language;
                warn!(?detection, fallback = %fallback, "language uncertain, using default");
                fallback
            }
        }
    }

    async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedPassage>, ServiceError> {
        let vector = self.call(self.parts.encoder.encode(query)).await?;
        let hits = self
            .call(self.parts.index.search(&vector, self.settings.top_k))
            .await?;

        let mut passages = Vec::with_capacity(hits.len());
        for hit in hits {
            let stored = self.call(self.parts.index.resolve(hit.id)).await?;
            passages.push(RetrievedPassage {
                id: hit.id,
                score: hit.score,
                text: stored.text,
                metadata: stored.metadata,
            });
        }
        info!(query = %query, retrieved = passages.len(), "passages retrieved");
        Ok(passages)
    }

    /// Grades every passage independently; verdicts come back in passage order.
    async fn grade_all(&self, question: &Question, passages: &[RetrievedPassage]) -> Vec<Verdict> {
        let workers = self
            .settings
            .grade_concurrency
            .min(self.settings.top_k)
            .max(1);

        let verdicts: Vec<Verdict> = stream::iter(passages)
            .map(|passage| async move {
                match self.call(self.parts.grader.grade(question, &passage.text)).await {
                    Ok(verdict) => verdict,
                    Err(e) => {
                        warn!(passage = passage.id, error = %e, "grading failed, treating passage as not relevant");
                        Verdict::NotRelevant
                    }
                }
            })
            .buffered(workers)
            .collect()
            .await;

        let relevant = verdicts.iter().filter(|v| v.is_relevant()).count();
        info!(graded = verdicts.len(), relevant, "passages graded");
        verdicts
    }

    fn decide(&self, session: &Session) -> State {
        let relevant = session
            .attempts
            .last()
            .map(Attempt::relevant_passages)
            .unwrap_or_default();
        let attempts = session.attempts.len();

        if !relevant.is_empty() {
            debug!(relevant = relevant.len(), "decision: generate");
            State::Generate { passages: relevant }
        } else if attempts < self.settings.max_attempts as usize {
            debug!(attempts, "decision: rewrite");
            State::Rewrite
        } else {
            info!(attempts, "no relevant passages after final attempt");
            State::Done(Outcome::NotFound {
                message: self
                    .settings
                    .not_found_message(session.question.lang, &session.question.text),
            })
        }
    }

    async fn rewrite(&self, session: &Session) -> Result<String, AskError> {
        let proposed = self
            .call(
                self.parts
                    .rewriter
                    .rewrite(&session.question, &session.attempts),
            )
            .await
            .map_err(AskError::RewriteFailed)?;

        let query = proposed.trim();
        if query.is_empty() {
            warn!("rewriter returned an empty query, reusing the original question");
            return Ok(session.question.text.clone());
        }
        if already_tried(query, session) {
            warn!(query = %query, "rewriter repeated a query; this attempt will likely be wasted");
        }
        Ok(query.to_string())
    }

    async fn call<T>(
        &self,
        fut: impl Future<Output = Result<T, ServiceError>>,
    ) -> Result<T, ServiceError> {
        let limit = self.settings.call_timeout;
        tokio::time::timeout(limit, fut)
            .await
            .unwrap_or_else(|_| Err(ServiceError::Timeout(limit)))
    }
}

fn already_tried(query: &str, session: &Session) -> bool {
    let normalized = |s: &str| s.trim().to_lowercase();
    let candidate = normalized(query);
    candidate == normalized(&session.question.text)
        || session
            .attempts
            .iter()
            .any(|a| normalized(&a.query) == candidate)
}
