//! Flash messages: queued on one request, shown on the next rendered page.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Info,
    Warning,
    Error,
}

/// A message keyed by a translation identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub level: FlashLevel,
    pub key: String,
}

impl FlashMessage {
    pub fn success(key: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Success,
            key: key.into(),
        }
    }

    pub fn error(key: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Error,
            key: key.into(),
        }
    }
}

/// Per-session queue of messages for the next rendered page
pub trait FlashQueue {
    fn push(&mut self, message: FlashMessage);

    /// Remove and return every queued message
    fn drain(&mut self) -> Vec<FlashMessage>;

    fn push_success(&mut self, key: &str) {
        self.push(FlashMessage::success(key));
    }
}

impl FlashQueue for Vec<FlashMessage> {
    fn push(&mut self, message: FlashMessage) {
        Vec::push(self, message);
    }

    fn drain(&mut self) -> Vec<FlashMessage> {
        std::mem::take(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_empties_queue() {
        let mut queue: Vec<FlashMessage> = Vec::new();
        queue.push_success("policy.accepted");
        FlashQueue::push(&mut queue, FlashMessage::error("oops"));

        let drained = FlashQueue::drain(&mut queue);
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0], FlashMessage::success("policy.accepted"));
        assert!(queue.is_empty());
    }
}
