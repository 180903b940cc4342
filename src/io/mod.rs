//! I/O utilities.
//!
//! - **Restart files**: ASCII solution snapshots keyed by global point index
//!   (see [`restart`])

pub mod restart;

pub use restart::{RestartError, column_names, read_restart, write_restart};
