//! High-water-mark state for double-sign protection.

mod pending;
mod sign_state;

pub use pending::PendingWrites;
pub use sign_state::{
    load_or_create_sign_state, load_sign_state, ChainSignStateConsensus, SignState,
    SignStateConsensus,
};
