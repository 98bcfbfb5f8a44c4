//! Session store backends for newsrag.
//!
//! Three interchangeable implementations of [`SessionStore`]:
//!
//! - [`UpstashStore`] talks to a managed Redis reached over Upstash's REST API.
//! - [`RedisStore`] talks to a directly connected Redis server.
//! - [`MemoryStore`] is an in-process fallback that keeps the service usable
//!   without external storage, at the cost of losing history on restart.
//!
//! [`SessionBackend::select`] picks one at startup from the available
//! credentials.
//!
//! [`SessionStore`]: newsrag_core::store::SessionStore

mod backend;
mod direct;
mod memory;
mod upstash;

pub mod error;

pub use backend::{SessionBackend, StoreSettings};
pub use error::{Error, Result};
pub use direct::RedisStore;
pub use memory::MemoryStore;
pub use upstash::UpstashStore;
