//! In-memory storage backend for the Lockgate flow engine.
//!
//! DashMap-backed implementations of every storage trait, for
//! single-node deployments and tests. Authorization code consumption
//! maps onto `DashMap::remove`, which gives the atomic single-use
//! guarantee the code flow relies on.
//!
//! # Example
//!
//! ```ignore
//! use lockgate_auth_memory::MemoryClientStorage;
//!
//! let clients = MemoryClientStorage::new();
//! clients.register(client)?;
//! ```

pub mod keys;
pub mod storage;

pub use keys::HmacKeyProvider;
pub use storage::{
    MemoryApprovalStorage, MemoryClientStorage, MemoryCodeStorage, MemoryDomainStorage,
    MemoryFlowStorage, MemoryRefreshTokenStorage, MemorySessionStorage, MemoryUserStorage,
};
