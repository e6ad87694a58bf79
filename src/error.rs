// Introspection error handling

use std::fmt;

use thiserror::Error;

/// Which bound an out-of-range index violated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeKind {
    Object,
    Attribute,
    Address,
}

impl fmt::Display for RangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeKind::Object => write!(f, "object"),
            RangeKind::Attribute => write!(f, "attribute"),
            RangeKind::Address => write!(f, "address"),
        }
    }
}

/// How an episode ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum Outcome {
    Victory,
    Defeat,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Victory => write!(f, "victory"),
            Outcome::Defeat => write!(f, "defeat"),
        }
    }
}

#[derive(Error, Debug)]
pub enum IntrospectError {
    /// No adapter is registered for this game. Permanent for the binary.
    #[error("Unsupported game: {game}")]
    UnsupportedGame { game: String },

    /// An adapter or the diff engine was asked about something beyond the declared bounds
    #[error("{kind} {index} out of range for {game} (limit: {limit})")]
    OutOfRange {
        game: String,
        kind: RangeKind,
        index: usize,
        limit: usize,
    },

    /// Step called after the episode reached a terminal state
    #[error("Episode of {game} already finished ({outcome})")]
    EpisodeFinished { game: String, outcome: Outcome },

    #[error("Episode of {game} has not been started")]
    EpisodeNotStarted { game: String },

    /// The interpreter died or produced output we cannot use
    #[error("Interpreter failure in {game}: {reason}")]
    InterpreterFailure { game: String, reason: String },

    #[error("Malformed story file: {0}")]
    MalformedStory(String),

    #[error("Invalid adapter configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl IntrospectError {
    pub fn out_of_range(game: &str, kind: RangeKind, index: usize, limit: usize) -> Self {
        IntrospectError::OutOfRange {
            game: game.to_string(),
            kind,
            index,
            limit,
        }
    }

    pub fn interpreter(game: &str, reason: impl Into<String>) -> Self {
        IntrospectError::InterpreterFailure {
            game: game.to_string(),
            reason: reason.into(),
        }
    }

    /// EpisodeFinished is an expected condition the consumer checks for
    pub fn is_episode_finished(&self) -> bool {
        matches!(self, IntrospectError::EpisodeFinished { .. })
    }
}

pub type Result<T> = std::result::Result<T, IntrospectError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_message_names_index_and_game() {
        let e = IntrospectError::out_of_range("planetfall", RangeKind::Object, 253, 252);
        assert_eq!(
            e.to_string(),
            "object 253 out of range for planetfall (limit: 252)"
        );
    }

    #[test]
    fn test_episode_finished_is_expected_condition() {
        let e = IntrospectError::EpisodeFinished {
            game: "planetfall".to_string(),
            outcome: Outcome::Victory,
        };
        assert!(e.is_episode_finished());
        assert!(!IntrospectError::MalformedStory("x".into()).is_episode_finished());
    }
}
