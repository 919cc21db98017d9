use chrono::Utc;

use super::stats::TranscriptMessage;
use crate::transport::{Role, TranscriptFragment};

/// Accumulates transcript fragments per role until the turn completes
#[derive(Debug, Default)]
pub struct TurnAssembler {
    user: String,
    model: String,
}

impl TurnAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, fragment: &TranscriptFragment) {
        self.buffer_mut(fragment.role).push_str(&fragment.text);
    }

    /// Text accumulated so far for `role`
    pub fn pending(&self, role: Role) -> &str {
        match role {
            Role::User => &self.user,
            Role::Model => &self.model,
        }
    }

    /// Emit the finished turn (user first, then model) and reset both buffers
    ///
    /// Buffers that are empty after trimming produce no message.
    pub fn flush(&mut self) -> Vec<TranscriptMessage> {
        let timestamp = Utc::now();
        let mut messages = Vec::with_capacity(2);

        for role in [Role::User, Role::Model] {
            let text = std::mem::take(self.buffer_mut(role));
            let text = text.trim();
            if !text.is_empty() {
                messages.push(TranscriptMessage {
                    role,
                    text: text.to_string(),
                    timestamp,
                });
            }
        }

        messages
    }

    /// Drop any partial turn
    pub fn discard(&mut self) {
        self.user.clear();
        self.model.clear();
    }

    fn buffer_mut(&mut self, role: Role) -> &mut String {
        match role {
            Role::User => &mut self.user,
            Role::Model => &mut self.model,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(role: Role, text: &str) -> TranscriptFragment {
        TranscriptFragment {
            role,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_fragments_join_into_one_message() {
        let mut turns = TurnAssembler::new();
        turns.push(&fragment(Role::Model, "Hel"));
        turns.push(&fragment(Role::Model, "lo"));

        let messages = turns.flush();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::Model);
        assert_eq!(messages[0].text, "Hello");
        assert_eq!(turns.pending(Role::Model), "");
    }

    #[test]
    fn test_user_is_flushed_before_model() {
        let mut turns = TurnAssembler::new();
        turns.push(&fragment(Role::Model, " Sure. "));
        turns.push(&fragment(Role::User, "Can you help?"));

        let messages = turns.flush();
        let roles: Vec<Role> = messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Model]);
        assert_eq!(messages[1].text, "Sure.");
    }

    #[test]
    fn test_whitespace_only_turn_is_not_emitted() {
        let mut turns = TurnAssembler::new();
        turns.push(&fragment(Role::User, "   "));

        assert!(turns.flush().is_empty());
        assert_eq!(turns.pending(Role::User), "");
    }

    #[test]
    fn test_discard_clears_both_roles() {
        let mut turns = TurnAssembler::new();
        turns.push(&fragment(Role::User, "a"));
        turns.push(&fragment(Role::Model, "b"));
        turns.discard();

        assert!(turns.flush().is_empty());
    }
}
