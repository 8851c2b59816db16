//! Consumed-authorization bookkeeping.
//!
//! A nonce moves from unissued to consumed exactly once. Consumption is only
//! ever undone by rolling back the call that performed it; committed entries
//! are permanent.

use std::collections::HashSet;
use vault_types::U256;

/// Journal position for [`NonceBook::revert_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NonceCheckpoint(usize);

/// Set of consumed nonces with an undo journal.
#[derive(Debug, Default)]
pub struct NonceBook {
	consumed: HashSet<U256>,
	journal: Vec<U256>,
}

impl NonceBook {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn is_consumed(&self, nonce: &U256) -> bool {
		self.consumed.contains(nonce)
	}

	/// Marks `nonce` consumed. Returns false if it already was.
	pub fn consume(&mut self, nonce: U256) -> bool {
		if !self.consumed.insert(nonce) {
			return false;
		}
		self.journal.push(nonce);
		true
	}

	pub fn len(&self) -> usize {
		self.consumed.len()
	}

	pub fn is_empty(&self) -> bool {
		self.consumed.is_empty()
	}

	pub fn checkpoint(&self) -> NonceCheckpoint {
		NonceCheckpoint(self.journal.len())
	}

	pub fn revert_to(&mut self, checkpoint: NonceCheckpoint) {
		if checkpoint.0 >= self.journal.len() {
			return;
		}
		for nonce in self.journal.drain(checkpoint.0..) {
			self.consumed.remove(&nonce);
		}
	}

	pub fn commit(&mut self) {
		self.journal.clear();
	}
}
