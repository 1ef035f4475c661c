//! Transport Bridge
//!
//! A media transport adapter connects here once per participant session and
//! relays the room events the orchestrator needs:
//!
//! - `protocol`: the JSON messages exchanged with the adapter.
//! - `session`: the connection lifecycle and the `SessionHandle` it exposes.

pub mod protocol;
pub mod session;

pub use session::ws_handler;
