use crate::domain::canonical::{CanonicalProposal, CanonicalVote};
use crate::foundation::{Result, SignerError, STEP_PRECOMMIT, STEP_PREVOTE, STEP_PROPOSE};
use prost::Message;

/// Decides whether two canonical payloads at the same coordinate differ
/// only in their timestamp field.
///
/// The consensus engine re-broadcasts votes and proposals with refreshed
/// timestamps; a timestamp alone never makes two payloads conflicting for
/// double-sign purposes. Returns `Ok(())` when re-signing is permitted.
pub fn only_differ_by_timestamp(
    step: i8,
    last_sign_bytes: &[u8],
    new_sign_bytes: &[u8],
) -> Result<()> {
    match step {
        STEP_PROPOSE => proposal_only_differs_by_timestamp(last_sign_bytes, new_sign_bytes),
        STEP_PREVOTE | STEP_PRECOMMIT => {
            vote_only_differs_by_timestamp(last_sign_bytes, new_sign_bytes)
        }
        other => Err(SignerError::UnexpectedStep(other)),
    }
}

fn vote_only_differs_by_timestamp(last_sign_bytes: &[u8], new_sign_bytes: &[u8]) -> Result<()> {
    let last_vote =
        CanonicalVote::decode_length_delimited(last_sign_bytes).map_err(|err| {
            SignerError::PayloadDecode {
                input: "last sign bytes",
                kind: "vote",
                details: err.to_string(),
            }
        })?;
    let mut new_vote =
        CanonicalVote::decode_length_delimited(new_sign_bytes).map_err(|err| {
            SignerError::PayloadDecode {
                input: "new sign bytes",
                kind: "vote",
                details: err.to_string(),
            }
        })?;

    // Substitute the previously signed timestamp and compare structurally.
    new_vote.timestamp = last_vote.timestamp.clone();
    if new_vote == last_vote {
        return Ok(());
    }

    match (&last_vote.block_id, &new_vote.block_id) {
        (Some(_), None) => Err(SignerError::NilBlockId),
        (None, Some(_)) => Err(SignerError::NonNilBlockId),
        (Some(last_id), Some(new_id)) if last_id.hash != new_id.hash => {
            Err(SignerError::DifferingBlockIds {
                last: hex::encode(&last_id.hash),
                new: hex::encode(&new_id.hash),
            })
        }
        _ => Err(SignerError::conflicting_data(last_sign_bytes, new_sign_bytes)),
    }
}

fn proposal_only_differs_by_timestamp(last_sign_bytes: &[u8], new_sign_bytes: &[u8]) -> Result<()> {
    let last_proposal =
        CanonicalProposal::decode_length_delimited(last_sign_bytes).map_err(|err| {
            SignerError::PayloadDecode {
                input: "last sign bytes",
                kind: "proposal",
                details: err.to_string(),
            }
        })?;
    let mut new_proposal =
        CanonicalProposal::decode_length_delimited(new_sign_bytes).map_err(|err| {
            SignerError::PayloadDecode {
                input: "new sign bytes",
                kind: "proposal",
                details: err.to_string(),
            }
        })?;

    new_proposal.timestamp = last_proposal.timestamp.clone();
    if new_proposal == last_proposal {
        return Ok(());
    }
    Err(SignerError::conflicting_data(last_sign_bytes, new_sign_bytes))
}
