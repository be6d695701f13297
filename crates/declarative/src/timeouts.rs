//! Per-operation deadlines
//!
//! Every lifecycle call runs inside a bounded operation. The budget comes
//! from a [`Timeouts`] value carried by the resource instance, so there is
//! no process-wide default to mutate.

use std::fmt;
use std::time::{Duration, Instant};

/// Default budget for simple CRUD calls
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Budget for heavier operations
pub const LONG_TIMEOUT: Duration = Duration::from_secs(20 * 60);

/// Lifecycle operation kinds that carry their own timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Timeout budget per operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub create: Duration,
    pub read: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::uniform(DEFAULT_TIMEOUT)
    }
}

impl Timeouts {
    /// Same budget for every operation
    pub fn uniform(timeout: Duration) -> Self {
        Self {
            create: timeout,
            read: timeout,
            update: timeout,
            delete: timeout,
        }
    }

    pub fn get(&self, operation: Operation) -> Duration {
        match operation {
            Operation::Create => self.create,
            Operation::Read => self.read,
            Operation::Update => self.update,
            Operation::Delete => self.delete,
        }
    }

    pub fn set(&mut self, operation: Operation, timeout: Duration) {
        match operation {
            Operation::Create => self.create = timeout,
            Operation::Read => self.read = timeout,
            Operation::Update => self.update = timeout,
            Operation::Delete => self.delete = timeout,
        }
    }
}

/// Receives the deadline of the operation currently running
///
/// Implemented by whatever performs the blocking calls (usually the remote
/// client) so each request can be cut short once the deadline passes.
pub trait DeadlineSink {
    fn set_deadline(&self, deadline: Option<Instant>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeouts_are_five_minutes() {
        let timeouts = Timeouts::default();
        assert_eq!(timeouts.get(Operation::Create), Duration::from_secs(300));
        assert_eq!(timeouts.get(Operation::Delete), Duration::from_secs(300));
    }

    #[test]
    fn test_set_single_operation() {
        let mut timeouts = Timeouts::default();
        timeouts.set(Operation::Update, LONG_TIMEOUT);

        assert_eq!(timeouts.update, LONG_TIMEOUT);
        assert_eq!(timeouts.create, DEFAULT_TIMEOUT);
    }
}
