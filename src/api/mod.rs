//! Network surfaces
//!
//! The WebSocket listener subscribers connect to, and the HTTP status service.

pub mod http;
pub mod status;
pub mod websocket;
