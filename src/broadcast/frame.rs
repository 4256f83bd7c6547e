//! Wire framing for the event stream
//!
//! Every event is `data: <json>\n\n`. Keep-alives are the SSE comment
//! `: keep-alive\n\n`, which clients ignore.

use axum::body::Bytes;
use serde::Serialize;

use crate::api::presenter::AlertResponse;

/// Handshake written to every viewer before it is registered
pub const CONNECTED_FRAME: &str = "data: {\"type\":\"CONNECTED\"}\n\n";

pub const KEEP_ALIVE_FRAME: &str = ": keep-alive\n\n";

/// Events pushed to viewers
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StreamEvent<'a> {
    Connected,
    NewAlert { payload: &'a AlertResponse },
}

impl StreamEvent<'_> {
    /// Encode as a `data:` frame
    pub fn to_frame(&self) -> Result<Bytes, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(Bytes::from(format!("data: {}\n\n", json)))
    }
}
