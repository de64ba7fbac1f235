use std::collections::{HashMap, HashSet, VecDeque};

use uuid::Uuid;

use super::ContextMode;
use crate::models::Message;

/// A conversation's messages indexed by id and by parent.
///
/// Messages are kept in creation order. Equal timestamps keep the order they
/// were supplied in, so callers should pass rows as the store returned them.
#[derive(Debug, Default)]
pub struct MessageArena {
    messages: Vec<Message>,
    by_id: HashMap<Uuid, usize>,
    children: HashMap<Uuid, Vec<usize>>,
}

impl MessageArena {
    pub fn new(mut messages: Vec<Message>) -> Self {
        messages.sort_by_key(|m| m.created_at);

        let mut by_id = HashMap::with_capacity(messages.len());
        let mut children: HashMap<Uuid, Vec<usize>> = HashMap::new();
        for (idx, message) in messages.iter().enumerate() {
            by_id.insert(message.id, idx);
            if let Some(parent) = message.parent_message_id {
                children.entry(parent).or_default().push(idx);
            }
        }

        Self {
            messages,
            by_id,
            children,
        }
    }

    pub fn get(&self, id: Uuid) -> Option<&Message> {
        self.by_id.get(&id).map(|&idx| &self.messages[idx])
    }

    /// All messages in creation order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Direct replies to `id`, in creation order.
    pub fn children(&self, id: Uuid) -> impl Iterator<Item = &Message> {
        self.children
            .get(&id)
            .into_iter()
            .flatten()
            .map(|&idx| &self.messages[idx])
    }

    /// Messages without a parent, in creation order.
    pub fn roots(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| m.is_thread_root())
    }

    /// The path from the top of `id`'s thread down to `id`, inclusive.
    ///
    /// Empty when `id` is unknown. A parent link that leaves the arena ends
    /// the walk; a cycle is cut once every message has been visited.
    pub fn ancestor_chain(&self, id: Uuid) -> Vec<&Message> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = self.get(id);

        while let Some(message) = current {
            if !seen.insert(message.id) {
                tracing::warn!(message_id = %message.id, "Cycle in parent links");
                break;
            }
            chain.push(message);
            current = message.parent_message_id.and_then(|p| self.get(p));
        }

        chain.reverse();
        chain
    }

    /// Every message reachable through child links from `id`, breadth first.
    /// Excludes `id` itself.
    pub fn descendants(&self, id: Uuid) -> Vec<&Message> {
        let mut result = Vec::new();
        let mut seen = HashSet::from([id]);
        let mut queue = VecDeque::from([id]);

        while let Some(current) = queue.pop_front() {
            for child in self.children(current) {
                if seen.insert(child.id) {
                    result.push(child);
                    queue.push_back(child.id);
                }
            }
        }

        result
    }

    /// Number of messages below `id` in its thread.
    pub fn reply_count(&self, id: Uuid) -> usize {
        self.descendants(id).len()
    }

    /// Messages created at or before the target, chronologically.
    pub fn linear_context(&self, id: Uuid) -> Vec<&Message> {
        let Some(target) = self.get(id) else {
            return Vec::new();
        };

        self.messages
            .iter()
            .filter(|m| m.created_at <= target.created_at)
            .collect()
    }

    /// Thread roots created at or before the target's own root, followed by
    /// the target's ancestor chain without that root.
    pub fn thread_context(&self, id: Uuid) -> Vec<&Message> {
        let Some(target) = self.get(id) else {
            return Vec::new();
        };

        let cutoff = self
            .get(target.thread_root_id)
            .map(|root| root.created_at)
            .unwrap_or(target.created_at);

        let mut context: Vec<&Message> = self
            .roots()
            .filter(|root| root.created_at <= cutoff)
            .collect();

        context.extend(
            self.ancestor_chain(id)
                .into_iter()
                .filter(|m| m.id != target.thread_root_id && !m.is_thread_root()),
        );

        context
    }

    /// Context for a completion on `id` under `mode`.
    pub fn context(&self, id: Uuid, mode: ContextMode) -> Vec<&Message> {
        match mode {
            ContextMode::Linear => self.linear_context(id),
            ContextMode::Thread => self.thread_context(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use super::*;
    use crate::{
        models::{MessageRole, NewMessage},
        tree::TreePlacement,
    };

    /// Builds a forest with strictly increasing timestamps.
    struct Forest {
        conversation_id: Uuid,
        messages: Vec<Message>,
        clock: DateTime<Utc>,
    }

    impl Forest {
        fn new() -> Self {
            Self {
                conversation_id: Uuid::new_v4(),
                messages: Vec::new(),
                clock: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            }
        }

        fn add(&mut self, parent: Option<Uuid>, role: MessageRole, content: &str) -> Uuid {
            let id = Uuid::new_v4();
            let placement = match parent {
                None => TreePlacement::root(id),
                Some(p) => {
                    let parent = self.messages.iter().find(|m| m.id == p).unwrap();
                    TreePlacement::child_of(parent)
                }
            };
            self.push(
                NewMessage {
                    id,
                    conversation_id: self.conversation_id,
                    parent_message_id: placement.parent_message_id,
                    thread_root_id: placement.thread_root_id,
                    depth: placement.depth,
                    role,
                    content: content.to_string(),
                    author_id: match role {
                        MessageRole::User => Some("u1".into()),
                        MessageRole::Assistant => None,
                    },
                    metadata: None,
                },
                Duration::seconds(1),
            );
            id
        }

        fn push(&mut self, new: NewMessage, step: Duration) {
            self.clock += step;
            self.messages.push(Message {
                id: new.id,
                conversation_id: new.conversation_id,
                parent_message_id: new.parent_message_id,
                thread_root_id: new.thread_root_id,
                depth: new.depth,
                role: new.role,
                content: new.content,
                author_id: new.author_id,
                metadata: new.metadata,
                created_at: self.clock,
            });
        }

        fn user(&mut self, parent: Option<Uuid>, content: &str) -> Uuid {
            self.add(parent, MessageRole::User, content)
        }

        fn assistant(&mut self, parent: Uuid, content: &str) -> Uuid {
            self.add(Some(parent), MessageRole::Assistant, content)
        }

        fn arena(&self) -> MessageArena {
            MessageArena::new(self.messages.clone())
        }
    }

    fn contents(messages: &[&Message]) -> Vec<String> {
        messages.iter().map(|m| m.content.clone()).collect()
    }

    #[test]
    fn test_root_then_completion_subtree() {
        let mut forest = Forest::new();
        let root = forest.user(None, "Hi");
        let reply = forest.assistant(root, "Hello!");
        let arena = forest.arena();

        let root_msg = arena.get(root).unwrap();
        assert_eq!(root_msg.thread_root_id, root);
        assert_eq!(root_msg.depth, 0);

        let reply_msg = arena.get(reply).unwrap();
        assert_eq!(reply_msg.thread_root_id, root);
        assert_eq!(reply_msg.depth, 1);

        let ids: Vec<Uuid> = arena.descendants(root).iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![reply]);
    }

    #[test]
    fn test_depth_matches_ancestor_chain_length() {
        let mut forest = Forest::new();
        let a = forest.user(None, "a");
        let b = forest.assistant(a, "b");
        let c = forest.user(Some(b), "c");
        let d = forest.assistant(c, "d");
        let arena = forest.arena();

        for id in [a, b, c, d] {
            let message = arena.get(id).unwrap();
            let chain = arena.ancestor_chain(id);
            assert_eq!(chain.len() as i32 - 1, message.depth);
            assert_eq!(chain[0].id, message.thread_root_id);
            assert_eq!(chain.last().unwrap().id, id);
        }
    }

    #[test]
    fn test_ancestor_chain_unknown_id_is_empty() {
        let mut forest = Forest::new();
        forest.user(None, "a");
        assert!(forest.arena().ancestor_chain(Uuid::new_v4()).is_empty());
    }

    #[test]
    fn test_ancestor_chain_survives_cycle() {
        let mut forest = Forest::new();
        let a = forest.user(None, "a");
        let b = forest.assistant(a, "b");
        // Corrupt the data: make the root point at its own child.
        forest.messages[0].parent_message_id = Some(b);
        let arena = forest.arena();

        let chain = arena.ancestor_chain(b);
        assert_eq!(chain.len(), 2);
        assert!(arena.descendants(a).len() <= 2);
    }

    #[test]
    fn test_descendants_excludes_siblings_and_ancestors() {
        let mut forest = Forest::new();
        let root = forest.user(None, "root");
        let left = forest.assistant(root, "left");
        let right = forest.user(Some(root), "right");
        let left_child = forest.user(Some(left), "left child");
        let left_grandchild = forest.assistant(left_child, "left grandchild");
        let _other_root = forest.user(None, "other");
        let arena = forest.arena();

        let ids: HashSet<Uuid> = arena.descendants(left).iter().map(|m| m.id).collect();
        assert_eq!(ids, HashSet::from([left_child, left_grandchild]));
        assert!(!ids.contains(&right));
        assert!(!ids.contains(&root));

        assert_eq!(arena.reply_count(root), 4);
        assert_eq!(arena.reply_count(left_grandchild), 0);
    }

    #[test]
    fn test_descendants_are_breadth_first() {
        let mut forest = Forest::new();
        let root = forest.user(None, "root");
        let a = forest.assistant(root, "a");
        let a1 = forest.user(Some(a), "a1");
        let b = forest.user(Some(root), "b");
        let arena = forest.arena();

        let ids: Vec<Uuid> = arena.descendants(root).iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![a, b, a1]);
    }

    #[test]
    fn test_linear_context_is_chronological_prefix() {
        let mut forest = Forest::new();
        let first = forest.user(None, "first");
        forest.assistant(first, "reply to first");
        let second = forest.user(None, "second");
        let branch = forest.user(Some(first), "late branch");
        forest.assistant(second, "after target");
        let arena = forest.arena();

        let context = arena.linear_context(branch);
        assert_eq!(
            contents(&context),
            vec!["first", "reply to first", "second", "late branch"]
        );
        assert_eq!(
            contents(&arena.linear_context(branch)),
            contents(&context),
            "repeated calls return the same context"
        );
    }

    #[test]
    fn test_linear_context_includes_equal_timestamps() {
        let mut forest = Forest::new();
        let a = forest.user(None, "a");
        let id = Uuid::new_v4();
        forest.push(
            NewMessage {
                id,
                conversation_id: forest.conversation_id,
                parent_message_id: None,
                thread_root_id: id,
                depth: 0,
                role: MessageRole::User,
                content: "same instant".into(),
                author_id: Some("u1".into()),
                metadata: None,
            },
            Duration::zero(),
        );
        let arena = forest.arena();

        assert_eq!(contents(&arena.linear_context(a)), vec!["a", "same instant"]);
    }

    #[test]
    fn test_thread_context_prior_roots_then_chain() {
        let mut forest = Forest::new();
        let r1 = forest.user(None, "r1");
        forest.assistant(r1, "r1 reply");
        let r2 = forest.user(None, "r2");
        let r2a = forest.assistant(r2, "r2 reply");
        let r2b = forest.user(Some(r2a), "r2 follow-up");
        let _r3 = forest.user(None, "r3 later");
        let arena = forest.arena();

        let context = arena.thread_context(r2b);
        assert_eq!(
            contents(&context),
            vec!["r1", "r2", "r2 reply", "r2 follow-up"]
        );
    }

    #[test]
    fn test_thread_context_on_root_is_prior_roots() {
        let mut forest = Forest::new();
        forest.user(None, "r1");
        let r2 = forest.user(None, "r2");
        forest.user(None, "r3");
        let arena = forest.arena();

        assert_eq!(contents(&arena.thread_context(r2)), vec!["r1", "r2"]);
    }

    #[test]
    fn test_context_unknown_target_is_empty() {
        let mut forest = Forest::new();
        forest.user(None, "r1");
        let arena = forest.arena();

        assert!(arena.context(Uuid::new_v4(), ContextMode::Thread).is_empty());
        assert!(arena.context(Uuid::new_v4(), ContextMode::Linear).is_empty());
    }

    #[test]
    fn test_arena_sorts_by_creation_time_stably() {
        let mut forest = Forest::new();
        let a = forest.user(None, "a");
        let b = forest.user(None, "b");
        let mut shuffled = forest.messages.clone();
        shuffled.reverse();
        let arena = MessageArena::new(shuffled);

        let ids: Vec<Uuid> = arena.messages().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![a, b]);
        assert_eq!(arena.roots().count(), 2);
    }
}
