//! gridlink-core — shared leaf types for the gridlink controller core.
//!
//! Holds the identity and configuration types that every other gridlink
//! crate speaks in: which managed resource a session belongs to
//! ([`ResourceId`]), which grid node an event refers to ([`MemberId`]),
//! and how to reach the remote cluster ([`ConnectionConfig`]).
//!
//! No async, no I/O — this crate is deliberately dependency-light so it
//! can sit at the bottom of the workspace graph.

pub mod config;
pub mod identity;

pub use config::{ConnectionConfig, Credentials, TlsOptions};
pub use identity::{MemberId, ResourceId};
