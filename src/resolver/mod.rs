//! # Resolver
//!
//! Everything that reads or writes live cluster state.
//!
//! ## Module Structure
//!
//! - `client.rs` - `ResourceClient` / `KindDiscovery` seams and `ClientError`
//! - `live.rs` - implementations over the Kubernetes API
//! - `memory.rs` - in-memory implementation for tests and dry runs
//! - `locator.rs` - reference resolution (GVK/GVR + name or selector)
//! - `identity.rs` - resolved identity and lookup paths

mod client;
mod identity;
mod live;
mod locator;
pub mod memory;

pub use client::{ClientError, DiscoveredResource, KindDiscovery, ResourceClient};
pub use identity::ResourceIdentity;
pub use live::{KubeDiscovery, KubeResourceClient};
pub use locator::{LocateError, Resolved, ResourceLocator, ResourceRef, ResourceType, Target};
pub use memory::MemoryCluster;
