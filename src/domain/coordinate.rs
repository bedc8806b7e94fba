//! Consensus coordinate algebra: the (height, round, step) watermark order.

use crate::domain::canonical::{CanonicalProposal, CanonicalVote, SignedMsgType};
use crate::foundation::{STEP_PRECOMMIT, STEP_PREVOTE, STEP_PROPOSE};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Totally ordered consensus coordinate.
///
/// The derived `Ord` is lexicographic over (height, round, step), which is
/// exactly the watermark order.
#[derive(
    Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, Deserialize, Serialize,
)]
pub struct HrsKey {
    pub height: i64,
    pub round: i64,
    pub step: i8,
}

impl HrsKey {
    pub const fn new(height: i64, round: i64, step: i8) -> Self {
        Self {
            height,
            round,
            step,
        }
    }

    /// Strictly greater in the watermark order.
    pub fn greater_than(&self, other: HrsKey) -> bool {
        *self > other
    }
}

impl fmt::Display for HrsKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.height, self.round, self.step)
    }
}

/// Inbound request coordinate: HRS plus the wall-clock timestamp carried by
/// the payload. The timestamp takes no part in the watermark order, so this
/// type deliberately has no `Ord`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct HrstKey {
    pub height: i64,
    pub round: i64,
    pub step: i8,
    pub timestamp_nanos: u64,
}

impl HrstKey {
    pub const fn new(height: i64, round: i64, step: i8, timestamp_nanos: u64) -> Self {
        Self {
            height,
            round,
            step,
            timestamp_nanos,
        }
    }

    /// Projection onto the watermark order.
    pub fn hrs(&self) -> HrsKey {
        HrsKey {
            height: self.height,
            round: self.round,
            step: self.step,
        }
    }
}

impl fmt::Display for HrstKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}@{}",
            self.height, self.round, self.step, self.timestamp_nanos
        )
    }
}

/// Signing step of a canonical vote.
///
/// Panics on a non-vote message type: routing a proposal or unknown payload
/// here is a programmer error.
pub fn vote_step(vote: &CanonicalVote) -> i8 {
    match vote.msg_type() {
        SignedMsgType::Prevote => STEP_PREVOTE,
        SignedMsgType::Precommit => STEP_PRECOMMIT,
        other => panic!("unknown vote type: {:?}", other),
    }
}

/// Signing step of a canonical proposal. Proposals only ever sign at the
/// propose step.
pub fn proposal_step(_proposal: &CanonicalProposal) -> i8 {
    STEP_PROPOSE
}
