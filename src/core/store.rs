//! Append-only message history for one chat session.

use crate::core::constants::GREETING;
use crate::core::message::{Message, MessageId, MessageKind, Sender};

#[derive(Debug, Default)]
pub struct MessageStore {
    messages: Vec<Message>,
    next_id: u64,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh session: one assistant greeting and nothing else.
    pub fn seeded() -> Self {
        let mut store = Self::new();
        store.push_assistant(GREETING);
        store
    }

    pub fn push_user(&mut self, kind: MessageKind, content: impl Into<String>) -> Message {
        self.push(Sender::User, kind, content.into())
    }

    /// Assistant replies are always plain text.
    pub fn push_assistant(&mut self, content: impl Into<String>) -> Message {
        self.push(Sender::Assistant, MessageKind::Text, content.into())
    }

    fn push(&mut self, sender: Sender, kind: MessageKind, content: String) -> Message {
        let id = MessageId::from_sequence(self.next_id);
        self.next_id += 1;
        let message = Message::new(id, sender, kind, content);
        self.messages.push(message.clone());
        message
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_store_holds_only_the_greeting() {
        let store = MessageStore::seeded();
        assert_eq!(store.len(), 1);
        let greeting = &store.messages()[0];
        assert!(greeting.is_assistant());
        assert_eq!(greeting.kind(), &MessageKind::Text);
        assert_eq!(greeting.content(), GREETING);
    }

    #[test]
    fn ids_follow_insertion_order() {
        let mut store = MessageStore::seeded();
        let user = store.push_user(MessageKind::Text, "hi");
        let reply = store.push_assistant("hello");

        let ids: Vec<_> = store.messages().iter().map(Message::id).collect();
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(store.last().map(Message::id), Some(reply.id()));
        assert!(user.id() < reply.id());
    }
}
