//! Cosigner shard files and the consensus engine's private validator key
//! file.

use crate::foundation::{Result, SignerError};
use crate::infrastructure::keys::{
    create_ed25519_shards, CosignerEciesKey, CosignerEd25519Key, CosignerRsaKey,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ed25519_dalek::SigningKey;
use serde::{Deserialize, Serialize};
use std::path::Path;
use zeroize::Zeroize;

/// Typed model of the consensus engine's `priv_validator_key.json`.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PrivValidatorKey {
    pub address: String,
    pub pub_key: TypedValue,
    pub priv_key: TypedValue,
}

/// The engine's `{"type": ..., "value": base64}` key envelope.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TypedValue {
    #[serde(rename = "type")]
    pub type_tag: String,
    pub value: String,
}

impl PrivValidatorKey {
    /// Decodes the Ed25519 signing key. The engine encodes the private key
    /// as 64 bytes (seed followed by public key); only the seed is needed.
    pub fn signing_key(&self) -> Result<SigningKey> {
        let mut bytes = STANDARD
            .decode(self.priv_key.value.as_bytes())
            .map_err(|err| SignerError::Encoding(format!("priv_key: {}", err)))?;
        if bytes.len() < 32 {
            let got = bytes.len();
            bytes.zeroize();
            return Err(SignerError::Encoding(format!(
                "ed25519 private key must be at least 32 bytes, got {}",
                got
            )));
        }
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&bytes[..32]);
        bytes.zeroize();
        let signing_key = SigningKey::from_bytes(&seed);
        seed.zeroize();
        Ok(signing_key)
    }
}

/// Reads and decodes a `priv_validator_key.json`.
pub fn read_priv_validator_file(path: impl AsRef<Path>) -> Result<PrivValidatorKey> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|err| {
        SignerError::storage(
            "read priv validator key",
            format!("{}: {}", path.display(), err),
        )
    })?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Shards the validator key found in a `priv_validator_key.json`.
pub fn create_ed25519_shards_from_file(
    path: impl AsRef<Path>,
    threshold: u8,
    shards: u8,
) -> Result<Vec<CosignerEd25519Key>> {
    let pv = read_priv_validator_file(path)?;
    let signing_key = pv.signing_key()?;
    create_ed25519_shards(&signing_key, threshold, shards)
}

/// Writes one cosigner key record as compact JSON with mode 0600.
fn write_shard_file<T: Serialize>(key: &T, path: &Path) -> Result<()> {
    let json = serde_json::to_vec(key)?;
    std::fs::write(path, &json).map_err(|err| {
        SignerError::storage("write shard file", format!("{}: {}", path.display(), err))
    })?;
    #[cfg(target_family = "unix")]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).map_err(|err| {
            SignerError::storage(
                "set shard file permissions",
                format!("{}: {}", path.display(), err),
            )
        })?;
    }
    Ok(())
}

pub fn write_cosigner_ed25519_shard_file(
    key: &CosignerEd25519Key,
    path: impl AsRef<Path>,
) -> Result<()> {
    write_shard_file(key, path.as_ref())
}

pub fn write_cosigner_rsa_shard_file(key: &CosignerRsaKey, path: impl AsRef<Path>) -> Result<()> {
    write_shard_file(key, path.as_ref())
}

pub fn write_cosigner_ecies_shard_file(
    key: &CosignerEciesKey,
    path: impl AsRef<Path>,
) -> Result<()> {
    write_shard_file(key, path.as_ref())
}
