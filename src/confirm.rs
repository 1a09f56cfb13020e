//! Confirmation gate for irreversible actions.
//!
//! Emptying the trash, purging one item, deleting a folder that still holds
//! notes, and importing a backup from another version all ask a [`Confirm`]
//! first. Declining leaves every collection untouched.

/// Answers a yes/no question before a destructive action runs.
pub trait Confirm {
    fn confirm(&self, message: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, message: &str) -> bool {
        self(message)
    }
}

/// Always proceeds. Used by `--yes` and by callers that already asked.
#[derive(Debug, Default, Clone, Copy)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&self, _message: &str) -> bool {
        true
    }
}

/// Always declines.
#[derive(Debug, Default, Clone, Copy)]
pub struct AssumeNo;

impl Confirm for AssumeNo {
    fn confirm(&self, _message: &str) -> bool {
        false
    }
}

/// Result of a confirmation-gated action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision<T> {
    Proceeded(T),
    Declined,
}

impl<T> Decision<T> {
    pub fn is_declined(&self) -> bool {
        matches!(self, Decision::Declined)
    }

    pub fn proceeded(self) -> Option<T> {
        match self {
            Decision::Proceeded(value) => Some(value),
            Decision::Declined => None,
        }
    }
}
