//! Cosigner key provisioning: threshold sharding of the validator key and
//! per-cosigner encryption keypairs.

mod files;
mod shards;
mod types;

pub use files::{
    create_ed25519_shards_from_file, read_priv_validator_file, write_cosigner_ecies_shard_file,
    write_cosigner_ed25519_shard_file, write_cosigner_rsa_shard_file, PrivValidatorKey,
};
pub use shards::{
    create_ecies_shards, create_ed25519_shards, create_rsa_shards, recover_ed25519_secret,
};
pub use types::{CosignerEciesKey, CosignerEd25519Key, CosignerRsaKey};
