//! Transport infrastructure: the serial link to the peer.
//!
//! [`serial_link::SerialLink`] is the only component that touches a radio
//! [`ByteChannel`](crate::infrastructure::radio::ByteChannel).  Everything
//! above it talks in terms of connect / write / close.

pub mod serial_link;

pub use serial_link::{ConnectError, LinkConfig, LinkError, LinkState, SerialLink};
