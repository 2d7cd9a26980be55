mod core;
mod models;

pub use self::core::{
    APOLOGY_MESSAGE, Advisor, AdvisorBuilder, CLOSING_MESSAGE, MISSING_CONFIG_MESSAGE,
    STEERING_INSTRUCTION, Turn, TurnPath,
};
pub use models::{GREETING, Session, Transcript};
