//! Canonical consensus payloads as signed by the validator.
//!
//! These are hand-declared prost messages matching the consensus engine's
//! canonical, deterministically-encoded protobuf structures. Only the
//! fields that participate in sign-bytes comparison are modeled; equality
//! of decoded messages is structural, which is what the double-sign rules
//! require (byte equality is too strict across encoder versions).

mod compare;

pub use compare::only_differ_by_timestamp;

/// Message discriminant carried in the first field of canonical payloads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum SignedMsgType {
    Unknown = 0,
    Prevote = 1,
    Precommit = 2,
    Proposal = 32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CanonicalPartSetHeader {
    #[prost(uint32, tag = "1")]
    pub total: u32,
    #[prost(bytes = "vec", tag = "2")]
    pub hash: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CanonicalBlockId {
    #[prost(bytes = "vec", tag = "1")]
    pub hash: Vec<u8>,
    #[prost(message, optional, tag = "2")]
    pub part_set_header: Option<CanonicalPartSetHeader>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CanonicalVote {
    #[prost(enumeration = "SignedMsgType", tag = "1")]
    pub r#type: i32,
    #[prost(sfixed64, tag = "2")]
    pub height: i64,
    #[prost(sfixed64, tag = "3")]
    pub round: i64,
    #[prost(message, optional, tag = "4")]
    pub block_id: Option<CanonicalBlockId>,
    #[prost(message, optional, tag = "5")]
    pub timestamp: Option<::prost_types::Timestamp>,
    #[prost(string, tag = "6")]
    pub chain_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CanonicalProposal {
    #[prost(enumeration = "SignedMsgType", tag = "1")]
    pub r#type: i32,
    #[prost(sfixed64, tag = "2")]
    pub height: i64,
    #[prost(sfixed64, tag = "3")]
    pub round: i64,
    #[prost(int64, tag = "4")]
    pub pol_round: i64,
    #[prost(message, optional, tag = "5")]
    pub block_id: Option<CanonicalBlockId>,
    #[prost(message, optional, tag = "6")]
    pub timestamp: Option<::prost_types::Timestamp>,
    #[prost(string, tag = "7")]
    pub chain_id: String,
}

impl CanonicalVote {
    /// Typed view of the raw `type` discriminant; out-of-range values map
    /// to `Unknown`.
    pub fn msg_type(&self) -> SignedMsgType {
        SignedMsgType::try_from(self.r#type).unwrap_or(SignedMsgType::Unknown)
    }
}

impl CanonicalProposal {
    pub fn msg_type(&self) -> SignedMsgType {
        SignedMsgType::try_from(self.r#type).unwrap_or(SignedMsgType::Unknown)
    }
}
