//! Public types for the investors API
use serde::{Deserialize, Serialize};

use crate::investors::InvestorRecord;

#[derive(Serialize, Deserialize)]
pub struct InvestorsResponse {
    pub total: usize,
    pub investors: Vec<InvestorRecord>,
}

#[derive(Deserialize)]
pub struct RecommendationsParams {
    pub count: Option<usize>,
}

#[derive(Serialize, Deserialize)]
pub struct RecommendationsResponse {
    pub recommendations: Vec<InvestorRecord>,
}
