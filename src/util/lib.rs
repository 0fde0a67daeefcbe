//! Cross-cutting utilities shared by every ringstore crate: the common
//! error type, node configuration, and the hashing primitive the ring
//! is built on.

#[macro_use]
extern crate tracing;

pub mod config;
pub mod data;
pub mod error;
