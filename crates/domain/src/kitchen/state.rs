//! Ticket line status machine and ticket priority.

use serde::{Deserialize, Serialize};

/// Status of one kitchen ticket line.
///
/// Lines only move forward one step at a time:
/// `pending → preparing → ready → served`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum LineStatus {
    #[default]
    Pending,
    Preparing,
    Ready,
    Served,
}

impl LineStatus {
    pub fn next(&self) -> Option<LineStatus> {
        match self {
            LineStatus::Pending => Some(LineStatus::Preparing),
            LineStatus::Preparing => Some(LineStatus::Ready),
            LineStatus::Ready => Some(LineStatus::Served),
            LineStatus::Served => None,
        }
    }

    pub fn can_advance_to(&self, to: LineStatus) -> bool {
        self.next() == Some(to)
    }

    /// Returns true once the kitchen is done with the line.
    pub fn is_done(&self) -> bool {
        matches!(self, LineStatus::Ready | LineStatus::Served)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LineStatus::Pending => "pending",
            LineStatus::Preparing => "preparing",
            LineStatus::Ready => "ready",
            LineStatus::Served => "served",
        }
    }
}

impl std::fmt::Display for LineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

impl Priority {
    /// Returns the next priority level, saturating at `High`.
    pub fn escalate(&self) -> Priority {
        match self {
            Priority::Low => Priority::Normal,
            Priority::Normal | Priority::High => Priority::High,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
