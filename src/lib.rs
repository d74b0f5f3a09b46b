//! linecast: line-oriented TCP servers
//!
//! Two servers are provided:
//! - [`chat`]: every line a client sends is broadcast to all connected clients
//! - [`echo`]: every line a client sends is echoed back to that client
//!
//! [`client`] holds the one-shot demo client used by `linecast-client`.

pub mod chat;
pub mod client;
pub mod config;
pub mod echo;
pub mod line;
pub mod listener;
