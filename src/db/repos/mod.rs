mod conversations;
mod messages;

pub use conversations::*;
pub use messages::*;
