//! HTTP surface of the Ruckus Unleashed exporter.
//!
//! The binary in `main.rs` parses flags, loads configuration and hands a
//! bound listener to [`server::serve`].

pub mod server;
