//! Call error types.

/// Error side of a resolved call.
///
/// Errors are cloned out to every observer of a promise, so both variants
/// carry owned text rather than source errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallError {
    /// The panel reported a failure for this call.
    #[error("Remote call failed: {0}")]
    RemoteCallFailed(String),

    /// The producer panicked, or its thread could not be started.
    #[error("Producer faulted: {0}")]
    ProducerFaulted(String),
}

/// Result type every call producer returns and every observer receives.
pub type Outcome<T> = Result<T, CallError>;
