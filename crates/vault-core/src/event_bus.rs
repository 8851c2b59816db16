//! Broadcast channel for committed contract events.

use tokio::sync::broadcast;
use vault_types::ContractEvent;

/// Fan-out of contract events to any number of subscribers.
///
/// Events are published only after the call that produced them has committed.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<ContractEvent>,
}

impl EventBus {
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<ContractEvent> {
		self.sender.subscribe()
	}

	/// Publishes an event. Having no subscribers is not an error.
	pub fn publish(&self, event: ContractEvent) {
		if self.sender.send(event).is_err() {
			tracing::trace!("No event subscribers");
		}
	}
}
