//! Scheduler errors.

use std::fmt;

/// Errors reported by the queues and the scheduler engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedError {
    /// Dequeue on an empty queue. Callers are expected to check first.
    EmptyQueue,
    /// A process record could not be created.
    AllocationFailure,
    /// Priority outside `0..max`.
    InvalidPriority { requested: usize, max: usize },
    /// A bounded container is full.
    CapacityExceeded { what: &'static str, capacity: usize },
    /// Rejected configuration value.
    InvalidConfig(&'static str),
}

impl SchedError {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmptyQueue => "queue is empty",
            Self::AllocationFailure => "process record allocation failed",
            Self::InvalidPriority { .. } => "priority out of range",
            Self::CapacityExceeded { .. } => "capacity exceeded",
            Self::InvalidConfig(_) => "invalid configuration",
        }
    }
}

impl fmt::Display for SchedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPriority { requested, max } => {
                write!(f, "{}: {} not below {}", self.as_str(), requested, max)
            }
            Self::CapacityExceeded { what, capacity } => {
                write!(f, "{}: {} holds at most {}", self.as_str(), what, capacity)
            }
            Self::InvalidConfig(reason) => write!(f, "{}: {}", self.as_str(), reason),
            _ => f.write_str(self.as_str()),
        }
    }
}

impl std::error::Error for SchedError {}

pub type SchedResult<T> = Result<T, SchedError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_details() {
        let err = SchedError::InvalidPriority { requested: 20, max: 16 };
        assert_eq!(err.to_string(), "priority out of range: 20 not below 16");

        let err = SchedError::CapacityExceeded { what: "trap set", capacity: 8 };
        assert_eq!(err.to_string(), "capacity exceeded: trap set holds at most 8");

        assert_eq!(SchedError::EmptyQueue.to_string(), "queue is empty");
    }
}
