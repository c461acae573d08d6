//! # Cursor Utilities
//!
//! Opaque keyset cursors for paginating orders newest-first over
//! `(ordered_at, id)`.

use crate::error::{ApiError, bad_request};
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Position of the last row returned on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCursor {
    pub ordered_at: DateTime<Utc>,
    pub id: Uuid,
}

/// Encode cursor data as an opaque base64 string
pub fn encode_cursor(ordered_at: &DateTime<Utc>, id: &Uuid) -> String {
    let json = serde_json::json!({
        "ordered_at": ordered_at,
        "id": id,
    })
    .to_string();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(json.as_bytes())
}

/// Decode cursor data from an opaque base64 string with validation
pub fn decode_cursor(cursor: &str) -> Result<OrderCursor, ApiError> {
    // Reject oversized input before decoding
    if cursor.len() > 512 {
        return Err(bad_request("cursor is too long"));
    }

    if cursor.is_empty() {
        return Err(bad_request("cursor cannot be empty"));
    }

    if !cursor
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(bad_request("cursor contains invalid characters"));
    }

    let decoded = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(cursor)
        .map_err(|_| bad_request("cursor is not valid base64"))?;

    let cursor_data: OrderCursor = serde_json::from_slice(&decoded)
        .map_err(|_| bad_request("cursor contains invalid JSON structure"))?;

    if cursor_data.id.is_nil() {
        return Err(bad_request("cursor contains invalid ID"));
    }

    Ok(cursor_data)
}
