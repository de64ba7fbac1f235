//! Render-ready views of a conversation's forest.
//!
//! The main timeline lists top-level user messages with their direct
//! assistant replies; selecting a message opens a thread panel with its
//! whole subtree. Linear mode is just every message in creation order.
//! Either view can carry the placeholder for a reply still being generated.

use serde::Serialize;
use uuid::Uuid;

use crate::{
    models::{Message, MessageRole},
    tree::{ContextMode, MessageArena},
};

/// A top-level message as shown on the main timeline.
#[derive(Debug, Clone, Serialize)]
pub struct TimelineEntry {
    #[serde(flatten)]
    pub message: Message,
    /// Direct assistant replies, in creation order.
    pub replies: Vec<Message>,
    /// Messages below the first assistant reply, 0 when there is none.
    pub reply_count: usize,
}

/// The side panel for one selected message.
#[derive(Debug, Clone, Serialize)]
pub struct ThreadPanel {
    pub root: Message,
    /// Descendants of `root`, breadth first.
    pub messages: Vec<Message>,
    /// Where a reply typed into the panel attaches.
    pub reply_parent_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Timeline {
    Thread {
        main: Vec<TimelineEntry>,
        thread: Option<ThreadPanel>,
        pending: Option<PendingAssistant>,
    },
    Linear {
        messages: Vec<Message>,
        pending: Option<PendingAssistant>,
    },
}

impl Timeline {
    /// `awaiting` names the message whose completion the client has
    /// requested. It gets a placeholder until an assistant reply exists.
    pub fn build(
        arena: &MessageArena,
        mode: ContextMode,
        selected: Option<Uuid>,
        awaiting: Option<Uuid>,
    ) -> Self {
        let pending = awaiting.and_then(|id| pending_reply(arena, id));
        match mode {
            ContextMode::Linear => Timeline::Linear {
                messages: arena.messages().to_vec(),
                pending,
            },
            ContextMode::Thread => Timeline::Thread {
                main: main_entries(arena),
                thread: selected.and_then(|id| thread_panel(arena, id)),
                pending,
            },
        }
    }
}

fn assistant_replies(arena: &MessageArena, id: Uuid) -> impl Iterator<Item = &Message> {
    arena
        .children(id)
        .filter(|c| c.role == MessageRole::Assistant)
}

fn main_entries(arena: &MessageArena) -> Vec<TimelineEntry> {
    arena
        .roots()
        .filter(|m| m.role == MessageRole::User)
        .map(|m| {
            let replies: Vec<Message> = assistant_replies(arena, m.id).cloned().collect();
            let reply_count = replies.first().map_or(0, |a| arena.reply_count(a.id));
            TimelineEntry {
                message: m.clone(),
                replies,
                reply_count,
            }
        })
        .collect()
}

/// `None` when `id` is not in the conversation, which closes the panel.
fn thread_panel(arena: &MessageArena, id: Uuid) -> Option<ThreadPanel> {
    let root = arena.get(id)?.clone();
    let messages: Vec<Message> = arena.descendants(id).into_iter().cloned().collect();
    let reply_parent_id = messages.last().map(|m| m.id).unwrap_or(root.id);

    Some(ThreadPanel {
        root,
        messages,
        reply_parent_id,
    })
}

/// The placeholder a client shows under `parent` while a completion runs.
/// Its id is `pending-assistant-<parent id>` so it can be swapped in place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingAssistant {
    pub id: String,
    pub conversation_id: Uuid,
    pub parent_message_id: Uuid,
    pub thread_root_id: Uuid,
    pub depth: i32,
    pub role: MessageRole,
    pub content: String,
}

fn pending_reply(arena: &MessageArena, parent_id: Uuid) -> Option<PendingAssistant> {
    let parent = arena.get(parent_id)?;
    if assistant_replies(arena, parent_id).next().is_some() {
        return None;
    }
    Some(pending_assistant(parent))
}

fn pending_assistant(parent: &Message) -> PendingAssistant {
    PendingAssistant {
        id: format!("pending-assistant-{}", parent.id),
        conversation_id: parent.conversation_id,
        parent_message_id: parent.id,
        thread_root_id: parent.thread_root_id,
        depth: parent.depth + 1,
        role: MessageRole::Assistant,
        content: String::new(),
    }
}
