//! Redwindow - Redis-backed fixed-window point consumption
//!
//! This crate records point consumption for rate-limit subjects in fixed
//! windows. State lives in Redis and is mutated only through Lua procedures,
//! so many processes can share one set of counters without coordinating.
//! An in-memory store with the same semantics is provided for single-process
//! use.

pub mod config;
pub mod error;
pub mod procedure;
pub mod ratelimit;
pub mod store;
