//! Infrastructure layer for the handheld application.
//!
//! Contains the adapters around the outside world: the radio stack, the
//! serial link built on top of it, the bonded-peer list, the config file and
//! the touch trace reader.
//!
//! **Dependency rule**: this layer may depend on `remoteplay_core`, but the
//! `application` layer only reaches into it through the traits and the
//! `SerialLink` type re-exported below.
//!
//! # Sub-modules
//!
//! - **`radio`** – `RadioStack` / `ByteChannel` traits plus the TCP serial
//!   emulation and a recording `MockRadio`.
//! - **`transport`** – `SerialLink`, the lifecycle-guarded connection.
//! - **`discovery`** – `PeerDirectory`, the bonded-device list.
//! - **`storage`** – TOML configuration.
//! - **`input`** – recorded touch traces.

pub mod discovery;
pub mod input;
pub mod radio;
pub mod storage;
pub mod transport;
