//! Streaming chat answers over Server-Sent Events

mod parser;
mod reader;

pub use parser::{ParserState, SseFrame, SseParser};
pub use reader::{read_chat_stream, ChatCallbacks, ChatStreamEvent, ChatStreamHandler};
