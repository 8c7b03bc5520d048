//! # Block Storage
//!
//! Cache-dense object and component storage built from fixed-capacity
//! blocks, with a compact (swap-remove) and a free-list policy.

mod block;
mod compact;
mod free_list;

pub use block::BLOCK_CAPACITY;
pub use compact::CompactStorage;
pub use free_list::FreeListStorage;
