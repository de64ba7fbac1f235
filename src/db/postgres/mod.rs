mod conversations;
mod messages;

pub use conversations::PostgresConversationRepo;
pub use messages::PostgresMessageRepo;
