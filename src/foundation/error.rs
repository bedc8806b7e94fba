use thiserror::Error;

/// Stable tags for every error kind, for callers that branch on the kind
/// without matching variant payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    HeightRegression,
    RoundRegression,
    StepRegression,
    SameHrs,
    NoSignBytes,
    ConflictingData,
    DifferingBlockIds,
    NilBlockId,
    NonNilBlockId,
    PayloadDecode,
    UnexpectedStep,
    Storage,
    Serialization,
    KeyGeneration,
    InvalidShardConfig,
    Encoding,
}

#[derive(Debug, Error)]
pub enum SignerError {
    #[error("height regression. Got {got}, last height {last}")]
    HeightRegression { got: i64, last: i64 },

    #[error("round regression at height {height}. Got {got}, last round {last}")]
    RoundRegression { height: i64, got: i64, last: i64 },

    #[error("step regression at height {height} round {round}. Got {got}, last step {last}")]
    StepRegression { height: i64, round: i64, got: i8, last: i8 },

    #[error("HRS is the same as current: {height}:{round}:{step}")]
    SameHrs { height: i64, round: i64, step: i8 },

    #[error("no sign bytes found for current HRS")]
    NoSignBytes,

    #[error("conflicting data. existing: {existing} - new: {new}")]
    ConflictingData { existing: String, new: String },

    #[error("differing block IDs - last vote: {last}, new vote: {new}")]
    DifferingBlockIds { last: String, new: String },

    #[error("already signed vote with non-nil block ID. refusing to sign vote on nil block ID")]
    NilBlockId,

    #[error("already signed vote with nil block ID. refusing to sign vote on non-nil block ID")]
    NonNilBlockId,

    #[error("{input} cannot be decoded into a canonical {kind}: {details}")]
    PayloadDecode {
        input: &'static str,
        kind: &'static str,
        details: String,
    },

    #[error("unexpected sign step: {0}")]
    UnexpectedStep(i8),

    #[error("storage error during {operation}: {details}")]
    Storage { operation: String, details: String },

    #[error("{format} serialization error: {details}")]
    Serialization { format: String, details: String },

    #[error("{scheme} key generation failed: {details}")]
    KeyGeneration {
        scheme: &'static str,
        details: String,
    },

    #[error("invalid shard config: threshold {threshold} of {shards}")]
    InvalidShardConfig { threshold: u8, shards: u8 },

    #[error("encoding error: {0}")]
    Encoding(String),
}

pub type Result<T> = std::result::Result<T, SignerError>;

impl SignerError {
    pub fn code(&self) -> ErrorCode {
        match self {
            SignerError::HeightRegression { .. } => ErrorCode::HeightRegression,
            SignerError::RoundRegression { .. } => ErrorCode::RoundRegression,
            SignerError::StepRegression { .. } => ErrorCode::StepRegression,
            SignerError::SameHrs { .. } => ErrorCode::SameHrs,
            SignerError::NoSignBytes => ErrorCode::NoSignBytes,
            SignerError::ConflictingData { .. } => ErrorCode::ConflictingData,
            SignerError::DifferingBlockIds { .. } => ErrorCode::DifferingBlockIds,
            SignerError::NilBlockId => ErrorCode::NilBlockId,
            SignerError::NonNilBlockId => ErrorCode::NonNilBlockId,
            SignerError::PayloadDecode { .. } => ErrorCode::PayloadDecode,
            SignerError::UnexpectedStep(_) => ErrorCode::UnexpectedStep,
            SignerError::Storage { .. } => ErrorCode::Storage,
            SignerError::Serialization { .. } => ErrorCode::Serialization,
            SignerError::KeyGeneration { .. } => ErrorCode::KeyGeneration,
            SignerError::InvalidShardConfig { .. } => ErrorCode::InvalidShardConfig,
            SignerError::Encoding(_) => ErrorCode::Encoding,
        }
    }

    /// True for any of the height/round/step regression variants.
    pub fn is_regression(&self) -> bool {
        matches!(
            self.code(),
            ErrorCode::HeightRegression | ErrorCode::RoundRegression | ErrorCode::StepRegression
        )
    }

    /// True for any of the conflicting-payload variants, timestamp rule
    /// already applied.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self.code(),
            ErrorCode::ConflictingData
                | ErrorCode::DifferingBlockIds
                | ErrorCode::NilBlockId
                | ErrorCode::NonNilBlockId
        )
    }

    pub fn conflicting_data(existing: &[u8], new: &[u8]) -> Self {
        SignerError::ConflictingData {
            existing: hex::encode(existing),
            new: hex::encode(new),
        }
    }

    pub fn storage(operation: impl Into<String>, details: impl ToString) -> Self {
        SignerError::Storage {
            operation: operation.into(),
            details: details.to_string(),
        }
    }
}

impl From<serde_json::Error> for SignerError {
    fn from(err: serde_json::Error) -> Self {
        SignerError::Serialization {
            format: "json".to_string(),
            details: err.to_string(),
        }
    }
}
