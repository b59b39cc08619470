//! Domain services used by websocket and HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own registry and membership logic so route handlers can
//! stay focused on protocol translation.

pub mod room;
