pub mod chat;
pub mod readiness;
