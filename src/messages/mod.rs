pub mod history;
pub mod types;

pub use history::MessageHistory;
pub use types::{GroundingSource, Message, MessageId, Role};
