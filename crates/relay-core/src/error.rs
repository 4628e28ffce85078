#[derive(thiserror::Error, Debug)]
pub enum DispatchError {
    #[error("No eligible API key in the pool")]
    QuotaExhausted,

    #[error("All {tried} API keys exhausted without a successful response")]
    AllKeysExhausted { tried: usize },

    #[error("Upstream returned status {status}")]
    Upstream { status: u16 },

    #[error("Unexpected response shape: {detail}")]
    ResponseShape { detail: String },

    #[error("Transport failure: {detail}")]
    Transport { detail: String },

    #[error("Actor '{0}' already has a request in flight")]
    ActorBusy(String),

    #[error("Failed to read attachment '{path}': {detail}")]
    AttachmentRead { path: String, detail: String },

    #[error("Empty prompt: no text and no attachments")]
    EmptyPrompt,
}

impl DispatchError {
    /// Whether this failure came from the caller's input rather than the
    /// upstream exchange.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::ActorBusy(_) | Self::AttachmentRead { .. } | Self::EmptyPrompt
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_quota_exhausted() {
        let err = DispatchError::QuotaExhausted;
        assert_eq!(err.to_string(), "No eligible API key in the pool");
    }

    #[test]
    fn test_display_all_keys_exhausted() {
        let err = DispatchError::AllKeysExhausted { tried: 3 };
        assert_eq!(
            err.to_string(),
            "All 3 API keys exhausted without a successful response"
        );
    }

    #[test]
    fn test_display_upstream() {
        let err = DispatchError::Upstream { status: 503 };
        assert_eq!(err.to_string(), "Upstream returned status 503");
    }

    #[test]
    fn test_display_response_shape() {
        let err = DispatchError::ResponseShape {
            detail: "missing candidates[0]".into(),
        };
        assert_eq!(
            err.to_string(),
            "Unexpected response shape: missing candidates[0]"
        );
    }

    #[test]
    fn test_display_transport() {
        let err = DispatchError::Transport {
            detail: "connection refused".into(),
        };
        assert_eq!(err.to_string(), "Transport failure: connection refused");
    }

    #[test]
    fn test_display_actor_busy() {
        let err = DispatchError::ActorBusy("user-42".into());
        assert_eq!(
            err.to_string(),
            "Actor 'user-42' already has a request in flight"
        );
    }

    #[test]
    fn test_display_attachment_read() {
        let err = DispatchError::AttachmentRead {
            path: "/tmp/img.png".into(),
            detail: "No such file or directory".into(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to read attachment '/tmp/img.png': No such file or directory"
        );
    }

    #[test]
    fn test_display_empty_prompt() {
        let err = DispatchError::EmptyPrompt;
        assert_eq!(err.to_string(), "Empty prompt: no text and no attachments");
    }

    #[test]
    fn test_caller_error_classification() {
        assert!(DispatchError::ActorBusy("a".into()).is_caller_error());
        assert!(DispatchError::EmptyPrompt.is_caller_error());
        assert!(
            DispatchError::AttachmentRead {
                path: "x".into(),
                detail: "y".into()
            }
            .is_caller_error()
        );
        assert!(!DispatchError::QuotaExhausted.is_caller_error());
        assert!(!DispatchError::Upstream { status: 500 }.is_caller_error());
        assert!(!DispatchError::AllKeysExhausted { tried: 1 }.is_caller_error());
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DispatchError>();
    }
}
