//! Shared in-memory message list for the active dialog.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use crate::types::Message;

struct Inner {
    messages: Mutex<Vec<Message>>,
    revision: watch::Sender<u64>,
}

/// The message list a turn writes into.
///
/// Cloning shares the same list. Every mutation is one commit: it runs under a
/// single lock and bumps the revision exactly once, so observers never see a
/// half-applied batch.
#[derive(Clone)]
pub struct MessageList {
    inner: Arc<Inner>,
}

impl MessageList {
    pub fn new() -> Self {
        Self::from_messages(Vec::new())
    }

    pub fn from_messages(messages: Vec<Message>) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                messages: Mutex::new(messages),
                revision,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Message>> {
        self.inner
            .messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current messages.
    pub fn snapshot(&self) -> Vec<Message> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace the whole list in one commit.
    pub fn replace(&self, messages: Vec<Message>) {
        self.update(|current| *current = messages);
    }

    /// Apply `f` to the list as one commit.
    pub fn update<R>(&self, f: impl FnOnce(&mut Vec<Message>) -> R) -> R {
        let result = {
            let mut messages = self.lock();
            f(&mut messages)
        };
        self.inner.revision.send_modify(|rev| *rev += 1);
        result
    }

    /// Number of commits applied so far.
    pub fn revision(&self) -> u64 {
        *self.inner.revision.borrow()
    }

    /// Observe commits. The value is the revision counter.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }
}

impl Default for MessageList {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MessageList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageList")
            .field("len", &self.len())
            .field("revision", &self.revision())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let list = MessageList::new();
        let other = list.clone();
        other.update(|messages| messages.push(Message::user("hi")));
        assert_eq!(list.len(), 1);
        assert_eq!(list.revision(), 1);
    }

    #[tokio::test]
    async fn subscribers_see_each_commit() {
        let list = MessageList::new();
        let mut rx = list.subscribe();

        list.replace(vec![Message::user("a"), Message::user("b")]);
        rx.changed().await.unwrap();

        assert_eq!(*rx.borrow_and_update(), 1);
        assert_eq!(list.snapshot().len(), 2);
    }
}
