use std::fmt;

/// Why a call to [`AsyncMutex::release`](super::AsyncMutex::release) was rejected
///
/// Neither case modifies the queue, so other participants are unaffected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ReleaseError {
    /// The request is not queued on this mutex (released twice, or never acquired here)
    NotFound,
    /// The request is queued but earlier requests have not been released yet
    OutOfOrder,
}

impl fmt::Display for ReleaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "request could not be found"),
            Self::OutOfOrder => write!(f, "prior requests are still unresolved"),
        }
    }
}

impl std::error::Error for ReleaseError {}
