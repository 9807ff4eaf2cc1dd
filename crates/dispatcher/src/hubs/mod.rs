//! Hub transports
//!
//! Contains JsonBatch, MemoryHub, and UdpHub.

mod batch;
mod memory;
mod udp;

pub use self::batch::JsonBatch;
pub use self::memory::{MemoryBatch, MemoryClient, MemoryHub, MemoryHubProvider};
pub use self::udp::{UdpClient, UdpHubConfig, UdpHubProvider, DEFAULT_MAX_BATCH_BYTES};
