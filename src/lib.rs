// Public crate surface is organized by layer: `domain`, `infrastructure`, `foundation`.
pub mod domain;
pub mod foundation;
pub mod infrastructure;
pub use foundation::{Result, SignerError};
