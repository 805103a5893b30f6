//! Application layer use cases for the peer.
//!
//! - **`apply_commands`** – Decodes received lines into `Command`s and applies
//!   them to a `PointerSink` that is injected at construction time.

pub mod apply_commands;
