//! `swp-over-udp` — a sliding-window ARQ byte stream over lossy datagrams.
//!
//! # Architecture
//!
//! ```text
//!  ┌──────────┐    DATA     ┌──────────┐
//!  │  Sender  │────────────▶│ Receiver │──▶ recv()
//!  └────┬─────┘             └─────┬────┘
//!       │                         │
//!       │     cumulative ACKs     │
//!       │◀────────────────────────┘
//!       │
//!  ┌────▼──────────────────────────────┐
//!  │               Link                │
//!  │   (UdpLink / MemoryLink + loss)   │
//!  └───────────────────────────────────┘
//! ```
//!
//! Each module has a single responsibility:
//! - [`packet`]       — wire format (serialise / deserialise)
//! - [`send_window`]  — outstanding-chunk bookkeeping and cumulative ACKs
//! - [`reassembly`]   — reorder buffer and receive watermark
//! - [`timer`]        — per-chunk retransmission timer table
//! - [`sender`]       — sender engine (window, timers, ACK loop)
//! - [`receiver`]     — receiver engine (reassembly loop, delivery queue)
//! - [`link`]         — the datagram link trait and an in-memory link
//! - [`socket`]       — UDP link
//! - [`simulator`]    — synthetic datagram loss
//! - [`config`]       — engine parameters
//! - [`error`]        — engine error type

pub mod config;
pub mod error;
pub mod link;
pub mod packet;
pub mod reassembly;
pub mod receiver;
pub mod send_window;
pub mod sender;
pub mod simulator;
pub mod socket;
pub mod timer;

pub use config::SwpConfig;
pub use error::SwpError;
pub use receiver::Receiver;
pub use sender::Sender;
