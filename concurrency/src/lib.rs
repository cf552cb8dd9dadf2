//! A small crate demonstrating classic concurrency patterns on top of `tokio`.
//!
//! Each pattern lives in its own module and creates its own transient state:
//! - a generator feeding a transformer through channels ([`pipeline`]),
//! - a fixed-size worker pool with a supervisor closing the result queue ([`task`]),
//! - a multiplexer racing several sources against a timeout ([`select`]),
//! - a mutex-guarded counter and a completion barrier ([`sync`]).
//!
//! Channels are closed by ownership: a channel is closed once its last `Sender` is dropped, after which
//! receivers drain any buffered values and then observe `None`. Since only the owner of a sender can close
//! it, sending on a closed channel or closing it twice cannot be expressed. The only runtime fault left is a
//! receiver going away while a stage still sends, which is reported as [`Error::Disconnected`].
//!
//! The [`demo`] module chains every pattern in sequence, using the parameters of a [`config::Config`].

mod error;
pub use error::*;

pub mod config;
pub mod demo;
pub mod pipeline;
pub mod select;
pub mod sync;
pub mod task;
