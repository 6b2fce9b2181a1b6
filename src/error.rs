use thiserror::Error;

/// Error taxonomy for the engine. Every gateway failure is converted to
/// one of these at the call site; a raw transport error never crosses a
/// module boundary.
#[derive(Debug, Clone, Error)]
pub enum BotError {
    /// A gateway call failed (network, HTTP status, malformed body).
    /// Treated as "no data this cycle" by the orchestrator.
    #[error("gateway request failed: {0}")]
    Transient(String),

    /// The gateway answered but did not return enough history to evaluate.
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// Sizing or level derivation is impossible for this signal.
    #[error("computation impossible: {0}")]
    Computation(String),

    /// The exchange refused an order.
    #[error("order rejected: {0}")]
    OrderRejected(String),

    /// The gateway never initialized; the engine is running as a no-op.
    #[error("gateway unavailable")]
    Unavailable,
}

pub type Result<T> = std::result::Result<T, BotError>;

impl BotError {
    pub fn transient(context: &str, err: impl std::fmt::Display) -> Self {
        BotError::Transient(format!("{context}: {err}"))
    }
}
