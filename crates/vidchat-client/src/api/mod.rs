//! Typed endpoints of the video chat backend
//!
//! Every method builds a [`RequestDescriptor`](crate::request::RequestDescriptor)
//! and goes through the client's executor, so the refresh-once policy covers
//! them all except the authentication endpoints themselves.

mod account;
mod chat;
mod groups;
mod tags;
mod types;
mod videos;

pub use chat::{CHAT_ENDPOINT, CHAT_STREAM_ENDPOINT};
pub use types::*;
