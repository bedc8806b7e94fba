//! System-wide constants for the signing watermark core.

/// Consensus signing step for a block proposal.
pub const STEP_PROPOSE: i8 = 1;

/// Consensus signing step for a prevote.
pub const STEP_PREVOTE: i8 = 2;

/// Consensus signing step for a precommit.
pub const STEP_PRECOMMIT: i8 = 3;

/// Number of recent block heights retained in the sign-state cache.
///
/// Operator tooling inspects the cache assuming this window; keep at 3.
pub const BLOCKS_TO_CACHE: i64 = 3;

/// RSA modulus size in bits for cosigner-to-cosigner encryption keys.
pub const RSA_KEY_BITS: usize = 4096;

/// Nanoseconds per second (10^9).
pub const NANOS_PER_SECOND: u64 = 1_000_000_000;
