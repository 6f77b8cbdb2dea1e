//! Event plumbing between viewer controls and chart panel tasks.
//!
//! Relays follow the `{source}_{event}_relay` naming pattern, e.g.
//! `pause_pressed_relay` or `zoom_completed_relay`. Each relay feeds exactly
//! one receiving task, which owns the state the event mutates.

pub mod relay;

pub use relay::{Relay, RelayError, relay};
