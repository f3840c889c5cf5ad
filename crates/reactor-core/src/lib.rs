//! Core of the long-polling Bot API gateway.
//!
//! This crate is transport-agnostic: HTTP lives behind the [`ports::Transport`]
//! port, implemented in `reactor-http`.

pub mod actions;
pub mod api;
pub mod codec;
pub mod config;
pub mod domain;
pub mod engine;
pub mod entities;
pub mod errors;
pub mod logging;
pub mod ports;
pub mod server;

#[cfg(test)]
mod test_support;

pub use errors::{Error, Result};
