//! Public types for the chat API
use serde::{Deserialize, Serialize};

use crate::ai::chat::{APOLOGY_MESSAGE, TurnPath};
use crate::investors::InvestorRecord;

#[derive(Deserialize)]
pub struct ChatRequest {
    pub session_id: String,
    pub message: String,
}

/// Payload of a `delta` event, one streamed fragment of the reply
#[derive(Serialize, Deserialize)]
pub struct ChatDelta {
    pub content: String,
}

/// Payload of the final `done` event. When `path` is `failed` any
/// deltas already sent are partial and `message` replaces them.
#[derive(Serialize)]
pub struct ChatDone {
    pub message: String,
    pub recommendations: Option<Vec<InvestorRecord>>,
    pub path: TurnPath,
}

impl ChatDone {
    pub fn failed() -> Self {
        Self {
            message: APOLOGY_MESSAGE.to_string(),
            recommendations: None,
            path: TurnPath::Failed,
        }
    }
}
