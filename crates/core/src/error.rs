/// Failures talking to a remote collaborator (chat, analysis, speech).
///
/// The session treats every variant the same way: the turn stops at the
/// failing step and the message is surfaced to the trainee.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("{endpoint} unreachable: {source}")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} returned status {status}")]
    Status {
        endpoint: &'static str,
        status: u16,
    },
    #[error("{endpoint} sent an unexpected response: {reason}")]
    Malformed {
        endpoint: &'static str,
        reason: String,
    },
}
