/// Result alias that carries the custom [`ForestalkError`] type.
pub type Result<T> = std::result::Result<T, ForestalkError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum ForestalkError {
    /// The audio behind a ring could not be fetched or decoded.
    #[error("could not load audio `{url}`: {reason}")]
    MediaLoad { url: String, reason: String },
    /// The media backend refused to start playback, e.g. an autoplay policy.
    #[error("playback of `{url}` was rejected: {reason}")]
    MediaPlayback { url: String, reason: String },
    /// A caller asked for a ring that does not exist. This is a contract
    /// violation rather than something a user can trigger.
    #[error("ring index {index} is out of range for a thread with {len} rings")]
    InvalidIndex { index: usize, len: usize },
    #[error("no thread is bound to the sequencer")]
    NotBound,
    #[error("thread `{0}` does not exist")]
    ThreadNotFound(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl ForestalkError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    /// Media failures are shown to the user as a non-fatal notification;
    /// everything else points at a bug or a broken environment.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, Self::MediaLoad { .. } | Self::MediaPlayback { .. })
    }
}

impl From<&str> for ForestalkError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for ForestalkError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_errors_are_user_facing() {
        let load = ForestalkError::MediaLoad {
            url: "a.webm".into(),
            reason: "404".into(),
        };
        let index = ForestalkError::InvalidIndex { index: 4, len: 2 };

        assert!(load.is_user_facing());
        assert!(!index.is_user_facing());
        assert!(format!("{index}").contains("4"));
    }
}
