//! Partition context and halo exchange.
//!
//! The assembly never touches communication directly: partition identity and
//! collectives are passed in explicitly through [`HaloExchange`].

mod halo;

pub use halo::{HaloExchange, LocalHalo, PartitionContext, SerialHalo};
