use uuid::Uuid;

use crate::models::Message;

/// Where a new message sits in its conversation's forest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreePlacement {
    pub parent_message_id: Option<Uuid>,
    pub thread_root_id: Uuid,
    pub depth: i32,
}

impl TreePlacement {
    /// A new thread root. `id` is the id the message will be stored under.
    pub fn root(id: Uuid) -> Self {
        Self {
            parent_message_id: None,
            thread_root_id: id,
            depth: 0,
        }
    }

    /// A reply to `parent`, inheriting its thread root.
    pub fn child_of(parent: &Message) -> Self {
        Self {
            parent_message_id: Some(parent.id),
            thread_root_id: parent.thread_root_id,
            depth: parent.depth + 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::MessageRole;

    fn message(id: Uuid, thread_root_id: Uuid, depth: i32) -> Message {
        Message {
            id,
            conversation_id: Uuid::new_v4(),
            parent_message_id: None,
            thread_root_id,
            depth,
            role: MessageRole::User,
            content: "hi".into(),
            author_id: Some("u1".into()),
            metadata: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_root_points_at_itself() {
        let id = Uuid::new_v4();
        let placement = TreePlacement::root(id);
        assert_eq!(placement.thread_root_id, id);
        assert_eq!(placement.depth, 0);
        assert!(placement.parent_message_id.is_none());
    }

    #[test]
    fn test_child_inherits_root_and_increments_depth() {
        let root_id = Uuid::new_v4();
        let parent = message(Uuid::new_v4(), root_id, 3);

        let placement = TreePlacement::child_of(&parent);
        assert_eq!(placement.parent_message_id, Some(parent.id));
        assert_eq!(placement.thread_root_id, root_id);
        assert_eq!(placement.depth, 4);
    }
}
