//! Room Agent API Library Crate
//!
//! This library contains the web-facing half of the room agent: configuration,
//! the token endpoints, the transport bridge, and routing. The `api` binary is
//! a thin wrapper around it.

pub mod config;
pub mod handlers;
pub mod models;
pub mod router;
pub mod state;
pub mod ws;
