//! Reentrancy lock around core operations.

use odra::prelude::*;

use crate::error::CoreError;

/// Exclusive section held for the whole of every core operation.
#[odra::module]
pub struct ReentrancyGuard {
    locked: Var<bool>,
}

#[odra::module]
impl ReentrancyGuard {
    /// An operation is in flight.
    pub fn is_locked(&self) -> bool {
        self.locked.get_or_default()
    }
}

impl ReentrancyGuard {
    /// Takes the section, reverting if it is already held.
    pub fn enter(&mut self) {
        if self.is_locked() {
            self.env().revert(CoreError::Reentrancy);
        }
        self.locked.set(true);
    }

    /// Releases the section.
    pub fn exit(&mut self) {
        self.locked.set(false);
    }
}
