use std::fmt;

use crate::rules::RulesError;

// ---------------------------------------------------------------------------
// EnvError: protocol violations
// ---------------------------------------------------------------------------

/// Caller-side contract violation.
///
/// Bad games (illegal move, flag fall) are *not* errors; they end the episode
/// through the reward and `StepInfo`. These variants cover misuse of the API.
#[derive(Debug, Clone, PartialEq)]
pub enum EnvError {
    /// Action index outside `[0, 4095]`.
    InvalidAction(i64),
    /// `step` called after the episode ended and before `reset`.
    EpisodeTerminated,
    /// Rejected configuration value.
    InvalidConfig(String),
    /// The rules engine refused an operation the environment considered valid.
    Rules(RulesError),
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidAction(index) => {
                write!(f, "action index {index} outside action space [0, 4095]")
            }
            Self::EpisodeTerminated => {
                write!(f, "episode has terminated; call reset() before step()")
            }
            Self::InvalidConfig(msg) => write!(f, "invalid configuration: {msg}"),
            Self::Rules(e) => write!(f, "rules engine error: {e}"),
        }
    }
}

impl std::error::Error for EnvError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Rules(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RulesError> for EnvError {
    fn from(e: RulesError) -> Self {
        Self::Rules(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn display_messages() {
        assert_eq!(
            EnvError::InvalidAction(5000).to_string(),
            "action index 5000 outside action space [0, 4095]"
        );
        assert!(EnvError::EpisodeTerminated.to_string().contains("reset()"));
    }

    #[test]
    fn rules_error_is_source() {
        let err: EnvError = RulesError::InvalidFen("x".into()).into();
        assert!(err.source().is_some());
        assert!(EnvError::EpisodeTerminated.source().is_none());
    }
}
