pub mod conversation;
pub mod page_range;
pub mod question;
pub mod request;

pub use conversation::{Conversation, Message, ServiceReply, ToolInvocation};
pub use page_range::PageRange;
pub use question::{QuestionOptions, QuestionRecord};
pub use request::ExtractionRequest;
