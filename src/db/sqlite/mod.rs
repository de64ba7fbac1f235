mod common;
mod conversations;
mod messages;

pub use conversations::SqliteConversationRepo;
pub use messages::SqliteMessageRepo;
