//! Typed handler layer.
//!
//! These are the functions the HTTP edge mounts: a deserialized request DTO
//! and an [`crate::context::AuthContext`] in, a serializable response DTO or
//! an [`crate::error::ApiError`] (with its HTTP status) out. Routing, header
//! parsing and parameter whitelisting live outside this crate.

pub mod auth;
pub mod sale_items;
pub mod sales;

use serde::Serialize;

/// Envelope for mutations that only need an acknowledgement.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        MessageResponse {
            success: true,
            message: message.into(),
        }
    }
}
