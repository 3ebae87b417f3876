//! Viewer transports.

pub mod websocket;
