//! Decides when enough has been learned about a startup to stop asking
//! questions and show investor recommendations.
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::openai::Message;

fn phrases(list: &[&str]) -> Vec<String> {
    list.iter().map(|p| p.to_string()).collect()
}

/// Vocabularies and thresholds used by the readiness check.
///
/// Phrases are matched as lower-case substrings, so `seed` also matches
/// `pre-seed` and `ai` matches inside longer words.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessCriteria {
    pub stage_phrases: Vec<String>,
    pub industry_phrases: Vec<String>,
    pub funding_phrases: Vec<String>,
    /// Phrases in a model response showing it understood the startup
    pub understanding_phrases: Vec<String>,
    /// Phrases in a model response that ask the user for more detail
    pub follow_up_phrases: Vec<String>,
    /// Transcript text longer than this counts as a described business
    pub min_description_chars: usize,
    /// Fewer messages than this is never ready
    pub min_messages: usize,
    pub min_info_score: usize,
    /// Messages needed before `min_info_score` alone is enough
    pub min_exchange_messages: usize,
    /// Score needed when the model response shows understanding
    pub understood_info_score: usize,
}

impl Default for ReadinessCriteria {
    fn default() -> Self {
        Self {
            stage_phrases: phrases(&[
                "pre-seed",
                "preseed",
                "seed",
                "series a",
                "early stage",
                "growth",
                "startup stage",
            ]),
            industry_phrases: phrases(&[
                "tech",
                "ai",
                "software",
                "hardware",
                "biotech",
                "fintech",
                "health",
                "consumer",
                "b2b",
                "saas",
                "enterprise",
                "mobile",
                "platform",
            ]),
            funding_phrases: phrases(&[
                "funding",
                "raise",
                "investment",
                "capital",
                "money",
                "million",
                "financing",
                "investor",
                "cash",
            ]),
            understanding_phrases: phrases(&[
                "i understand",
                "got it",
                "based on what you've shared",
                "sounds like",
                "it seems like",
                "thank you for sharing",
                "thanks for providing",
                "from what you've told me",
            ]),
            follow_up_phrases: phrases(&[
                "could you share",
                "could you tell me",
                "can you provide",
                "would you mind",
            ]),
            min_description_chars: 200,
            min_messages: 2,
            min_info_score: 3,
            min_exchange_messages: 4,
            understood_info_score: 2,
        }
    }
}

impl ReadinessCriteria {
    /// Reads criteria from a JSON file. Keys that are absent keep their
    /// default values.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read readiness criteria {}", path.display()))?;
        let criteria = serde_json::from_str(&json)
            .with_context(|| format!("Invalid readiness criteria in {}", path.display()))?;
        Ok(criteria)
    }

    /// True if the model response asks the user for more information.
    pub fn asks_for_more(&self, response: &str) -> bool {
        contains_any(&response.to_lowercase(), &self.follow_up_phrases)
    }

    /// Scores the transcript and the latest model response.
    pub fn assess(&self, transcript: &[Message], latest_response: &str) -> ReadinessReport {
        if transcript.len() < self.min_messages {
            return ReadinessReport::default();
        }

        let text = transcript
            .iter()
            .map(|msg| msg.content.to_lowercase())
            .collect::<Vec<_>>()
            .join(" ");

        let stage = contains_any(&text, &self.stage_phrases);
        let industry = contains_any(&text, &self.industry_phrases);
        let funding = contains_any(&text, &self.funding_phrases);
        let described = text.chars().count() > self.min_description_chars;
        let info_score = [stage, industry, funding, described]
            .into_iter()
            .filter(|signal| *signal)
            .count();
        let understood = contains_any(&latest_response.to_lowercase(), &self.understanding_phrases);

        let ready = (info_score >= self.min_info_score
            && transcript.len() >= self.min_exchange_messages)
            || (understood && info_score >= self.understood_info_score);

        ReadinessReport {
            stage,
            industry,
            funding,
            described,
            info_score,
            understood,
            ready,
        }
    }

    pub fn is_ready(&self, transcript: &[Message], latest_response: &str) -> bool {
        self.assess(transcript, latest_response).ready
    }
}

fn contains_any(text: &str, phrases: &[String]) -> bool {
    phrases.iter().any(|p| text.contains(p.as_str()))
}

/// The signals behind a readiness decision.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReadinessReport {
    pub stage: bool,
    pub industry: bool,
    pub funding: bool,
    pub described: bool,
    pub info_score: usize,
    pub understood: bool,
    pub ready: bool,
}

/// Readiness with the default criteria.
pub fn is_ready(transcript: &[Message], latest_response: &str) -> bool {
    ReadinessCriteria::default().is_ready(transcript, latest_response)
}
