//! Lifecycle status shared by tasks and task items.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Status of a task or task item.
///
/// On the wire the worker sends the integer discriminant (`0..=3`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum TaskStatus {
    #[default]
    Pending = 0,
    Running = 1,
    Completed = 2,
    Failed = 3,
}

impl TaskStatus {
    /// Returns true once the status is `Completed`.
    #[must_use]
    pub const fn is_completed(self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Short lowercase label, used in logs and the CLI.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Unknown wire discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown task status discriminant {0}")]
pub struct UnknownStatus(pub u8);

impl TryFrom<u8> for TaskStatus {
    type Error = UnknownStatus;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Pending),
            1 => Ok(Self::Running),
            2 => Ok(Self::Completed),
            3 => Ok(Self::Failed),
            other => Err(UnknownStatus(other)),
        }
    }
}

impl From<TaskStatus> for u8 {
    fn from(status: TaskStatus) -> Self {
        status as Self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_discriminants() {
        assert_eq!(serde_json::to_string(&TaskStatus::Pending).unwrap(), "0");
        assert_eq!(serde_json::to_string(&TaskStatus::Failed).unwrap(), "3");
        let status: TaskStatus = serde_json::from_str("2").unwrap();
        assert_eq!(status, TaskStatus::Completed);
    }

    #[test]
    fn unknown_discriminant_is_rejected() {
        assert!(serde_json::from_str::<TaskStatus>("7").is_err());
        assert_eq!(TaskStatus::try_from(9), Err(UnknownStatus(9)));
    }

    #[test]
    fn only_completed_is_completed() {
        assert!(TaskStatus::Completed.is_completed());
        assert!(!TaskStatus::Running.is_completed());
        assert!(!TaskStatus::Failed.is_completed());
        assert!(!TaskStatus::Pending.is_completed());
    }
}
