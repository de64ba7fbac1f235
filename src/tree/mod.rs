//! In-memory algorithms over a conversation's message forest.
//!
//! Messages are loaded once per request into a [`MessageArena`]; every walk
//! (ancestor chain, subtree, context assembly) runs over its indexes instead
//! of issuing one query per hop.

mod arena;
mod placement;

pub use arena::*;
pub use placement::*;

/// Context assembly policy for a completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContextMode {
    /// Every message created at or before the target, chronologically.
    Linear,
    /// Prior thread roots, then the target's ancestor chain.
    #[default]
    Thread,
}

impl ContextMode {
    /// Parse the `mode` query parameter. Anything other than `linear` is
    /// thread mode.
    pub fn from_query(mode: Option<&str>) -> Self {
        match mode {
            Some("linear") => ContextMode::Linear,
            _ => ContextMode::Thread,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_from_query() {
        assert_eq!(ContextMode::from_query(Some("linear")), ContextMode::Linear);
        assert_eq!(ContextMode::from_query(Some("thread")), ContextMode::Thread);
        assert_eq!(ContextMode::from_query(Some("LINEAR")), ContextMode::Thread);
        assert_eq!(ContextMode::from_query(None), ContextMode::Thread);
    }
}
