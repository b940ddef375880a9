//! Append-only conversation history with change notification.

use crate::models::{ChatMessage, Role};
use crate::{Error, Result};
use tokio::sync::watch;

/// Ordered chat history whose first entry is always the system message.
pub struct ConversationState {
    messages: Vec<ChatMessage>,
    tail: watch::Sender<Option<ChatMessage>>,
}

impl ConversationState {
    pub fn new(system: ChatMessage) -> Result<Self> {
        if system.role != Role::System {
            return Err(Error::Conversation(
                "conversation must start with a system message".to_string(),
            ));
        }

        let (tail, _) = watch::channel(Some(system.clone()));
        Ok(Self {
            messages: vec![system],
            tail,
        })
    }

    /// Append a user or assistant message and notify subscribers of the new tail.
    pub fn append(&mut self, message: ChatMessage) -> Result<()> {
        if message.role == Role::System {
            return Err(Error::Conversation(
                "system message can only be set at creation".to_string(),
            ));
        }

        self.messages.push(message.clone());
        self.tail.send_replace(Some(message));
        Ok(())
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Receiver that observes the latest appended message.
    pub fn subscribe(&self) -> watch::Receiver<Option<ChatMessage>> {
        self.tail.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> ConversationState {
        ConversationState::new(ChatMessage::system("sys")).unwrap()
    }

    #[test]
    fn test_starts_with_system_message() {
        let conversation = state();
        assert_eq!(conversation.len(), 1);
        assert_eq!(conversation.messages()[0].role, Role::System);
    }

    #[test]
    fn test_rejects_non_system_seed() {
        assert!(matches!(
            ConversationState::new(ChatMessage::user("hi")),
            Err(Error::Conversation(_))
        ));
    }

    #[test]
    fn test_rejects_second_system_message() {
        let mut conversation = state();
        let err = conversation
            .append(ChatMessage::system("override"))
            .unwrap_err();
        assert!(matches!(err, Error::Conversation(_)));
        assert_eq!(conversation.len(), 1);
    }

    #[test]
    fn test_append_keeps_chronological_order() {
        let mut conversation = state();
        conversation.append(ChatMessage::user("a")).unwrap();
        conversation.append(ChatMessage::assistant("b")).unwrap();

        let roles: Vec<Role> = conversation.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant]);
        assert_eq!(conversation.last().unwrap().content, "b");
    }

    #[test]
    fn test_subscribers_see_latest_tail() {
        let mut conversation = state();
        let mut rx = conversation.subscribe();
        assert!(!rx.has_changed().unwrap());

        conversation.append(ChatMessage::user("a")).unwrap();
        conversation.append(ChatMessage::assistant("b")).unwrap();

        assert!(rx.has_changed().unwrap());
        let tail = rx.borrow_and_update().clone();
        assert_eq!(tail, Some(ChatMessage::assistant("b")));
        assert!(!rx.has_changed().unwrap());
    }
}
