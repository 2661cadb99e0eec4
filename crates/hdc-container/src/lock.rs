//! Read-only locking.
//!
//! A locked container refuses mutation. What "refuses" means is selected by
//! its [`LockMode`]: the default suppresses the mutation and logs a warning,
//! so a locked container degrades instead of aborting its caller.

use serde::{Deserialize, Serialize};

/// How a read-only container reports an attempted mutation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockMode {
    /// Drop the mutation, log a warning, and return [`Mutation::Suppressed`].
    #[default]
    Warn,
    /// Fail with [`ContainerError::ReadOnlyViolation`].
    ///
    /// [`ContainerError::ReadOnlyViolation`]: crate::error::ContainerError::ReadOnlyViolation
    Error,
}

/// Outcome of a mutating operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mutation {
    /// The container was changed.
    Applied,
    /// The container is read-only and was left unchanged.
    Suppressed,
}

impl Mutation {
    pub fn is_applied(self) -> bool {
        self == Self::Applied
    }

    pub fn is_suppressed(self) -> bool {
        self == Self::Suppressed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_mode_warns() {
        assert_eq!(LockMode::default(), LockMode::Warn);
    }

    #[test]
    fn mutation_predicates() {
        assert!(Mutation::Applied.is_applied());
        assert!(!Mutation::Applied.is_suppressed());
        assert!(Mutation::Suppressed.is_suppressed());
    }
}
