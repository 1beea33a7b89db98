use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::Rng;

/// Opaque randomness service.
///
/// Issuing a request returns its identifier immediately; the drawn words
/// arrive later through the ledger's randomness-delivery entry point, as a
/// separate call.
#[async_trait]
pub trait RandomnessGateway: Send + Sync {
    async fn request_random_words(&self, num_words: u32) -> u64;
}

/// In-process coordinator handing out monotonically increasing request ids,
/// starting at 1. Fulfillment is driven by whoever holds the ledger: draw the
/// words and deliver them against the recorded id.
#[derive(Debug, Default)]
pub struct SequentialCoordinator {
    next_id: AtomicU64,
    issued: Mutex<Vec<u64>>,
}

impl SequentialCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request ids issued so far, oldest first.
    pub fn issued(&self) -> Vec<u64> {
        self.issued.lock().clone()
    }

    /// Draws words for a fulfillment.
    pub fn draw_words(&self, num_words: u32) -> Vec<u64> {
        let mut rng = rand::thread_rng();
        (0..num_words).map(|_| rng.gen::<u64>()).collect()
    }
}

#[async_trait]
impl RandomnessGateway for SequentialCoordinator {
    async fn request_random_words(&self, _num_words: u32) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.issued.lock().push(id);
        tracing::info!("randomness request {} issued", id);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn request_ids_are_sequential_from_one() {
        let coordinator = SequentialCoordinator::new();
        assert_eq!(coordinator.request_random_words(1).await, 1);
        assert_eq!(coordinator.request_random_words(1).await, 2);
        assert_eq!(coordinator.issued(), vec![1, 2]);
    }

    #[test]
    fn draws_the_requested_number_of_words() {
        let coordinator = SequentialCoordinator::new();
        assert_eq!(coordinator.draw_words(3).len(), 3);
    }
}
