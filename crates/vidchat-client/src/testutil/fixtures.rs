//! Test fixtures
//!
//! Wire frames and sample payloads as the backend sends them.

use bytes::Bytes;
use serde_json::{json, Value};

/// One SSE frame carrying a token
pub fn token_frame(content: &str) -> String {
    sse_frame(&json!({"type": "token", "content": content}))
}

/// The terminal `done` frame
pub fn done_frame(related_videos: &Value, chat_log_id: Option<i64>) -> String {
    sse_frame(&json!({
        "type": "done",
        "related_videos": related_videos,
        "chat_log_id": chat_log_id,
        "feedback": null,
    }))
}

pub fn sse_frame(payload: &Value) -> String {
    format!("data: {payload}\n\n")
}

/// Related videos as the chat endpoints report them
pub fn sample_related_videos() -> Value {
    json!([
        {"video_id": 1, "title": "Ownership basics", "start_time": 42.0, "end_time": 97.5},
        {"video_id": 2, "title": "Borrowing", "start_time": 0.0, "end_time": 31.0},
    ])
}

pub fn sample_video_json(id: i64) -> Value {
    json!({
        "id": id,
        "title": format!("Lecture {id}"),
        "description": "",
        "file": format!("/media/videos/lecture_{id}.mp4"),
        "status": "completed",
        "tags": [{"id": 1, "name": "rust", "color": "#dea584"}],
        "uploaded_at": "2026-01-05T10:00:00Z",
    })
}

pub fn sample_group_json(id: i64) -> Value {
    json!({
        "id": id,
        "name": format!("Group {id}"),
        "description": "",
        "videos": [sample_video_json(10), sample_video_json(11)],
        "video_count": 2,
        "share_token": null,
    })
}

/// Splits `wire` into chunks of `size` bytes, ignoring character boundaries
pub fn split_every(wire: &str, size: usize) -> Vec<Bytes> {
    wire.as_bytes()
        .chunks(size.max(1))
        .map(Bytes::copy_from_slice)
        .collect()
}
