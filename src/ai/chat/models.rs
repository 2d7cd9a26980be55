//! The core models for a conversation with the advisor.
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::mpsc;

use super::core::Advisor;
use crate::investors::InvestorRecord;
use crate::openai::{Message, Role};

pub const GREETING: &str = "hello! i'm finda, your ai assistant for finding the perfect vc match. tell me about your startup and fundraising goals.";

/// Chronological, append-only list of messages.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(transparent)]
pub struct Transcript(Vec<Message>);

impl Transcript {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn new_with_messages(messages: Vec<Message>) -> Self {
        Self(messages)
    }

    pub fn messages(&self) -> &[Message] {
        &self.0
    }

    pub fn push(&mut self, msg: Message) {
        self.0.push(msg)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.0.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.0.iter()
    }
}

/// Everything known about one visitor's conversation. Lives in memory
/// only.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Session {
    pub id: String,
    transcript: Transcript,
    is_loading: bool,
    recommendations: Option<Vec<InvestorRecord>>,
    #[serde(skip)]
    last_active: Option<Instant>,
}

impl Session {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..Default::default()
        }
    }

    /// A session that opens with the assistant's greeting.
    pub fn with_greeting(id: &str) -> Self {
        let mut session = Self::new(id);
        session.push(Message::new(Role::Assistant, GREETING));
        session
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn push(&mut self, msg: Message) {
        self.transcript.push(msg);
        self.touch();
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.is_loading = loading;
        self.touch();
    }

    fn touch(&mut self) {
        self.last_active = Some(Instant::now());
    }

    /// True if no turn is running and nothing has changed for at least
    /// `ttl` before `now`.
    pub fn is_idle(&self, now: Instant, ttl: Duration) -> bool {
        !self.is_loading
            && self
                .last_active
                .is_none_or(|at| now.saturating_duration_since(at) >= ttl)
    }

    pub fn recommendations(&self) -> Option<&[InvestorRecord]> {
        self.recommendations.as_deref()
    }

    /// Replaces the current recommendations.
    pub fn publish_recommendations(&mut self, recommendations: Vec<InvestorRecord>) {
        self.recommendations = Some(recommendations);
    }

    /// Runs one turn of the conversation for `text`: the user message
    /// is appended, the advisor responds and its reply is appended.
    /// Returns the reply.
    pub async fn send(
        &mut self,
        advisor: &Advisor,
        text: &str,
        tx: Option<mpsc::UnboundedSender<String>>,
    ) -> String {
        self.push(Message::new(Role::User, text));
        self.set_loading(true);

        let reply = advisor.respond(self, tx).await;

        self.push(Message::new(Role::Assistant, &reply));
        self.set_loading(false);
        reply
    }
}
