//! Application layer use cases for the handheld.
//!
//! # What use cases does the handheld have?
//!
//! - **`translate_touch`** – Runs pointer samples through the gesture
//!   recognizer and the command encoder and offers the result to the send
//!   scheduler.  Synchronous; this is the input context.
//!
//! - **`send_commands`** – The `SendScheduler`: rate-limits `MOVE` commands
//!   and writes everything to the serial link from a single background
//!   worker, so the input context never waits on the radio.
//!
//! - **`connect_peer`** – The `ConnectionManager`: resolves a bonded peer,
//!   drives the serial link through connect and close, and turns the output
//!   path on and off.
//!
//! - **`status`** – The user-visible connection status and its broadcast.

pub mod connect_peer;
pub mod send_commands;
pub mod status;
pub mod translate_touch;
