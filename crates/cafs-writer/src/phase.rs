use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of a single tree write.
///
/// `Planning → Writing → Committed` on success. A planning failure goes
/// straight to `Failed`; a writing failure passes through `RollingBack`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WritePhase {
    Planning,
    Writing,
    Committed,
    RollingBack,
    Failed,
}

impl WritePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::Writing => "writing",
            Self::Committed => "committed",
            Self::RollingBack => "rolling_back",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Committed | Self::Failed)
    }

    /// Whether `next` is a legal successor of this phase.
    pub fn can_advance_to(&self, next: WritePhase) -> bool {
        matches!(
            (self, next),
            (Self::Planning, Self::Writing)
                | (Self::Planning, Self::Failed)
                | (Self::Writing, Self::Committed)
                | (Self::Writing, Self::RollingBack)
                | (Self::RollingBack, Self::Failed)
        )
    }

    /// Move to `next` if the transition is legal. Returns false and stays
    /// put otherwise.
    pub fn advance_to(&mut self, next: WritePhase) -> bool {
        if self.can_advance_to(next) {
            *self = next;
            true
        } else {
            false
        }
    }
}

impl fmt::Display for WritePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
