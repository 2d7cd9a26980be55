use std::sync::Arc;

use anyhow::{Error, Result};
use serde::Serialize;
use tokio::sync::mpsc;

use super::models::Session;
use crate::ai::readiness::ReadinessCriteria;
use crate::core::AppConfig;
use crate::investors::{DEFAULT_RECOMMENDATION_COUNT, DatasetSource, InvestorRecord, select};
use crate::openai::{CompletionError, CompletionService, Message, OpenAICompletion, Role};

pub const CLOSING_MESSAGE: &str = "Great! Based on what you've shared about your startup, I've found some VC matches that might be a good fit for you.";

pub const APOLOGY_MESSAGE: &str =
    "Sorry, something went wrong while talking to the assistant. Please try again.";

pub const MISSING_CONFIG_MESSAGE: &str =
    "The assistant isn't configured: set OPENAI_API_KEY to enable chat.";

pub const STEERING_INSTRUCTION: &str = "Focus on gathering essential information about the startup (industry, stage, funding needs) without asking too many questions at once. Once you have enough information, provide a brief conclusion and do not ask for more details.";

/// How a turn produced its reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPath {
    /// Enough was known up front so the model was never called
    Shortcut,
    Streamed,
    Failed,
}

/// The result of one turn. The reply is always user-facing text, even
/// when the turn failed.
#[derive(Clone, Debug)]
pub struct Turn {
    pub reply: String,
    pub recommendations: Option<Vec<InvestorRecord>>,
    pub path: TurnPath,
}

/// Runs the conversation with a startup founder.
///
/// Each turn either concludes right away with investor recommendations
/// when the transcript already says enough about the startup, or asks
/// the completion service for the next reply and checks again with
/// that reply in hand.
///
/// Use `Advisor::builder()` to construct an `Advisor`.
pub struct Advisor {
    completion: Arc<dyn CompletionService>,
    dataset: DatasetSource,
    criteria: ReadinessCriteria,
    recommendation_count: usize,
}

impl Advisor {
    pub fn builder(completion: Arc<dyn CompletionService>) -> AdvisorBuilder {
        AdvisorBuilder::new(completion)
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let completion = OpenAICompletion::new(
            &config.openai_api_hostname,
            config.openai_api_key.as_deref(),
            &config.openai_model,
            config.max_tokens,
        );
        let criteria = match &config.readiness_path {
            Some(path) => ReadinessCriteria::from_path(path)?,
            None => ReadinessCriteria::default(),
        };

        let advisor = Self::builder(Arc::new(completion))
            .dataset(config.dataset.clone())
            .criteria(criteria)
            .recommendation_count(config.recommendation_count)
            .build();
        Ok(advisor)
    }

    pub fn criteria(&self) -> &ReadinessCriteria {
        &self.criteria
    }

    pub fn dataset(&self) -> &DatasetSource {
        &self.dataset
    }

    pub fn recommendation_count(&self) -> usize {
        self.recommendation_count
    }

    pub async fn recommend(&self) -> Vec<InvestorRecord> {
        let pool = self.dataset.load().await;
        select(&pool, self.recommendation_count)
    }

    /// Runs the next turn for `transcript`, which must already end with
    /// the user's latest message. The transcript is not modified.
    ///
    /// If `tx` is set every streamed fragment of the reply is also sent
    /// through it as it arrives.
    pub async fn turn(
        &self,
        transcript: &[Message],
        tx: Option<mpsc::UnboundedSender<String>>,
    ) -> Turn {
        let before = self.criteria.assess(transcript, "");
        tracing::debug!("Readiness before completion: {:?}", before);

        if before.ready {
            let recommendations = self.recommend().await;
            let reply = match transcript.last() {
                Some(msg) if msg.role != Role::User => msg.content.clone(),
                _ => CLOSING_MESSAGE.to_string(),
            };
            return Turn {
                reply,
                recommendations: Some(recommendations),
                path: TurnPath::Shortcut,
            };
        }

        let response = match self.stream_completion(transcript, tx).await {
            Ok(response) => response,
            Err(e) => {
                return Turn {
                    reply: failure_reply(&e),
                    recommendations: None,
                    path: TurnPath::Failed,
                };
            }
        };

        let after = self.criteria.assess(transcript, &response);
        tracing::debug!("Readiness after completion: {:?}", after);

        if !after.ready {
            return Turn {
                reply: response,
                recommendations: None,
                path: TurnPath::Streamed,
            };
        }

        let recommendations = self.recommend().await;
        // Don't leave the user with a question once results are shown
        let reply = if self.criteria.asks_for_more(&response) {
            CLOSING_MESSAGE.to_string()
        } else {
            response
        };

        Turn {
            reply,
            recommendations: Some(recommendations),
            path: TurnPath::Streamed,
        }
    }

    /// Runs the next turn for the session and publishes any
    /// recommendations to it. Returns the reply without appending it.
    pub async fn respond(
        &self,
        session: &mut Session,
        tx: Option<mpsc::UnboundedSender<String>>,
    ) -> String {
        let turn = self.turn(session.transcript().messages(), tx).await;
        if let Some(recommendations) = turn.recommendations {
            session.publish_recommendations(recommendations);
        }
        turn.reply
    }

    async fn stream_completion(
        &self,
        transcript: &[Message],
        tx: Option<mpsc::UnboundedSender<String>>,
    ) -> Result<String, Error> {
        let mut messages = transcript.to_vec();
        if transcript.iter().any(|msg| msg.role == Role::User) {
            messages.push(Message::new(Role::System, STEERING_INSTRUCTION));
        }

        let (fragment_tx, mut fragment_rx) = mpsc::unbounded_channel::<String>();
        let producer = self.completion.stream(fragment_tx, &messages);
        let consumer = async {
            let mut response = String::new();
            while let Some(fragment) = fragment_rx.recv().await {
                if let Some(tx) = &tx {
                    // Listeners going away doesn't stop the turn
                    let _ = tx.send(fragment.clone());
                }
                response.push_str(&fragment);
            }
            response
        };

        let (result, response) = tokio::join!(producer, consumer);
        result?;

        Ok(response)
    }
}

fn failure_reply(e: &Error) -> String {
    match e.downcast_ref::<CompletionError>() {
        Some(CompletionError::MissingApiKey) => {
            tracing::error!("Completion service is not configured: {}", e);
            MISSING_CONFIG_MESSAGE.to_string()
        }
        None => {
            tracing::error!("Chat completion failed: {}. Root cause: {}", e, e.root_cause());
            APOLOGY_MESSAGE.to_string()
        }
    }
}

pub struct AdvisorBuilder {
    completion: Arc<dyn CompletionService>,
    dataset: DatasetSource,
    criteria: ReadinessCriteria,
    recommendation_count: usize,
}

impl AdvisorBuilder {
    pub fn new(completion: Arc<dyn CompletionService>) -> Self {
        Self {
            completion,
            dataset: DatasetSource::Builtin,
            criteria: ReadinessCriteria::default(),
            recommendation_count: DEFAULT_RECOMMENDATION_COUNT,
        }
    }

    pub fn build(self) -> Advisor {
        Advisor {
            completion: self.completion,
            dataset: self.dataset,
            criteria: self.criteria,
            recommendation_count: self.recommendation_count,
        }
    }

    pub fn dataset(mut self, dataset: DatasetSource) -> Self {
        self.dataset = dataset;
        self
    }

    pub fn criteria(mut self, criteria: ReadinessCriteria) -> Self {
        self.criteria = criteria;
        self
    }

    pub fn recommendation_count(mut self, count: usize) -> Self {
        self.recommendation_count = count;
        self
    }
}
