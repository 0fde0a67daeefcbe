//! The RPC surface: a pure translator between the HTTP/JSON wire
//! protocol and the coordinator. No replication logic lives here (spec
//! §4.5) — every handler either reads local state directly (internal
//! endpoints, admin observability) or hands the request straight to
//! [`ringstore_coordinator::Coordinator`] / [`ringstore_membership::Membership`].

#[macro_use]
extern crate tracing;

pub mod admin;
pub mod client;
pub mod error;
pub mod helpers;
pub mod internal;
pub mod server;

pub use server::{serve, Context};
