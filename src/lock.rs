use thiserror::Error;

use crate::storage::{keys, PersistedCell, SharedBackend, WriteStatus};

pub const PIN_LENGTH: usize = 4;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LockError {
    #[error("PIN must be exactly 4 digits")]
    InvalidPin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Locked,
    Unlocked,
}

/// The optional four-digit PIN guarding the app at startup.
#[derive(Debug)]
pub struct PinLock {
    pin: PersistedCell<Option<String>>,
}

impl PinLock {
    pub fn load(backend: SharedBackend) -> Self {
        Self {
            pin: PersistedCell::load(backend, keys::PIN, None),
        }
    }

    pub fn has_pin(&self) -> bool {
        self.pin.get().is_some()
    }

    /// `Locked` when a PIN is stored.
    pub fn initial_state(&self) -> LockState {
        if self.has_pin() {
            LockState::Locked
        } else {
            LockState::Unlocked
        }
    }

    pub fn set_pin(&mut self, pin: &str) -> Result<WriteStatus, LockError> {
        if !is_valid_pin(pin) {
            return Err(LockError::InvalidPin);
        }
        Ok(self.pin.set(Some(pin.to_string())))
    }

    pub fn clear_pin(&mut self) -> WriteStatus {
        self.pin.set(None)
    }

    /// Exact comparison; there is no lockout after failed attempts.
    pub fn unlock(&self, attempt: &str) -> bool {
        match self.pin.get() {
            Some(pin) => pin == attempt,
            None => true,
        }
    }
}

fn is_valid_pin(pin: &str) -> bool {
    pin.len() == PIN_LENGTH && pin.bytes().all(|b| b.is_ascii_digit())
}
