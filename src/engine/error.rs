/// Rejections surfaced to the caller on the action result.
///
/// Legal-but-losing outcomes (hitting a mine, a void turn) are successes,
/// never errors. Only `Busy` invites a retry. `Conflict` is reserved for
/// the outer economy service's concurrent wallet updates and is not emitted
/// by the engine core.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Reject {
    #[error("room is busy, try again")]
    Busy,
    #[error("room not found")]
    NotFound,
    #[error("illegal action: {0}")]
    IllegalAction(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("corrupt state")]
    Corrupt,
    #[error("conflict")]
    Conflict,
}

impl Reject {
    pub fn illegal(reason: impl Into<String>) -> Self {
        Self::IllegalAction(reason.into())
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidArgument(reason.into())
    }

    /// Whether the caller may simply try again.
    pub fn retryable(&self) -> bool {
        matches!(self, Self::Busy)
    }
}
