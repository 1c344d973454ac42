use super::types::{GroundingSource, Message, MessageId, Role};

/// Ordered conversation history.
///
/// Append-only, except that the last model message may have text appended
/// while it streams in, or be removed if its request fails.
#[derive(Debug, Clone, Default)]
pub struct MessageHistory {
    messages: Vec<Message>,
}

impl MessageHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) -> MessageId {
        let id = message.id;
        self.messages.push(message);
        id
    }

    pub fn all(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    /// Append streamed text to the last message if it is the given model message
    pub fn append_to_last(&mut self, id: MessageId, delta: &str) -> bool {
        match self.messages.last_mut() {
            Some(last) if last.id == id && last.role == Role::Model => {
                last.text.push_str(delta);
                true
            }
            _ => false,
        }
    }

    /// Replace text and sources of the last message once its stream completes
    pub fn finalize_last(&mut self, id: MessageId, text: String, sources: Vec<GroundingSource>) -> bool {
        match self.messages.last_mut() {
            Some(last) if last.id == id => {
                last.text = text;
                last.sources = sources;
                true
            }
            _ => false,
        }
    }

    /// Drop the last message if it has the given id
    pub fn remove_last_if(&mut self, id: MessageId) -> Option<Message> {
        if self.messages.last().map(|m| m.id) == Some(id) {
            self.messages.pop()
        } else {
            None
        }
    }

    /// The most recent `limit` messages
    pub fn recent(&self, limit: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(limit);
        &self.messages[start..]
    }

    pub fn clear(&mut self) {
        self.messages.clear();
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
    fn test_append_only_touches_last_model_message() {
        let mut history = MessageHistory::new();
        let model_id = history.push(Message::model("Hel"));
        assert!(history.append_to_last(model_id, "lo"));
        assert_eq!(history.last().unwrap().text, "Hello");

        let user_id = history.push(Message::user("hi"));
        assert!(!history.append_to_last(model_id, "!"));
        assert!(!history.append_to_last(user_id, "!"));
        assert_eq!(history.all()[0].text, "Hello");
    }

    #[test]
    fn test_remove_last_if_matches_id() {
        let mut history = MessageHistory::new();
        let first = history.push(Message::user("a"));
        let second = history.push(Message::model("b"));

        assert!(history.remove_last_if(first).is_none());
        assert!(history.remove_last_if(second).is_some());
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_recent_caps_window() {
        let mut history = MessageHistory::new();
        for i in 0..5 {
            history.push(Message::user(format!("m{}", i)));
        }
        let recent = history.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].text, "m3");
        assert_eq!(history.recent(10).len(), 5);
    }
}
