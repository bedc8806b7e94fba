//! Cosigner key material records and their on-disk JSON shapes.

use curve25519_dalek::Scalar;
use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};

/// One cosigner's share of the validator Ed25519 key.
///
/// Every shard in a batch carries the same validator public key; the shard
/// scalar is this cosigner's Shamir share of the expanded secret.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CosignerEd25519Key {
    #[serde(rename = "pub_key", with = "serde_verifying_key")]
    pub pub_key: VerifyingKey,
    #[serde(rename = "priv_key_shard", with = "serde_scalar")]
    pub private_shard: Scalar,
    pub id: u8,
}

/// One cosigner's RSA identity plus every cosigner's public key, indexed by
/// cosigner id, so any cosigner can encrypt to any other.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CosignerRsaKey {
    pub id: u8,
    #[serde(rename = "rsa_key", with = "serde_rsa_private")]
    pub rsa_key: rsa::RsaPrivateKey,
    #[serde(rename = "rsa_pubs", with = "serde_rsa_publics")]
    pub rsa_pubs: Vec<rsa::RsaPublicKey>,
}

/// One cosigner's ECIES identity (secp256k1) plus every cosigner's public
/// key at the matching index positions.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CosignerEciesKey {
    pub id: u8,
    #[serde(rename = "ecies_key", with = "serde_secp_secret")]
    pub ecies_key: secp256k1::SecretKey,
    #[serde(rename = "ecies_pubs", with = "serde_secp_publics")]
    pub ecies_pubs: Vec<secp256k1::PublicKey>,
}

mod serde_verifying_key {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use ed25519_dalek::VerifyingKey;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(key: &VerifyingKey, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(key.to_bytes()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<VerifyingKey, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = STANDARD
            .decode(s.as_bytes())
            .map_err(serde::de::Error::custom)?;
        let bytes: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| serde::de::Error::custom("ed25519 public key must be 32 bytes"))?;
        VerifyingKey::from_bytes(&bytes).map_err(serde::de::Error::custom)
    }
}

mod serde_scalar {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use curve25519_dalek::Scalar;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(scalar: &Scalar, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(scalar.to_bytes()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Scalar, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = STANDARD
            .decode(s.as_bytes())
            .map_err(serde::de::Error::custom)?;
        let bytes: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| serde::de::Error::custom("key shard must be 32 bytes"))?;
        Option::<Scalar>::from(Scalar::from_canonical_bytes(bytes))
            .ok_or_else(|| serde::de::Error::custom("key shard is not a canonical scalar"))
    }
}

mod serde_rsa_private {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey};
    use rsa::RsaPrivateKey;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(key: &RsaPrivateKey, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let der = key.to_pkcs1_der().map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&STANDARD.encode(der.as_bytes()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<RsaPrivateKey, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let der = STANDARD
            .decode(s.as_bytes())
            .map_err(serde::de::Error::custom)?;
        RsaPrivateKey::from_pkcs1_der(&der).map_err(serde::de::Error::custom)
    }
}

mod serde_rsa_publics {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use rsa::pkcs1::{DecodeRsaPublicKey, EncodeRsaPublicKey};
    use rsa::RsaPublicKey;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(keys: &[RsaPublicKey], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let encoded = keys
            .iter()
            .map(|key| {
                key.to_pkcs1_der()
                    .map(|der| STANDARD.encode(der.as_bytes()))
            })
            .collect::<Result<Vec<String>, _>>()
            .map_err(serde::ser::Error::custom)?;
        encoded.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<RsaPublicKey>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = Vec::<String>::deserialize(deserializer)?;
        encoded
            .iter()
            .map(|s| {
                let der = STANDARD
                    .decode(s.as_bytes())
                    .map_err(serde::de::Error::custom)?;
                RsaPublicKey::from_pkcs1_der(&der).map_err(serde::de::Error::custom)
            })
            .collect()
    }
}

mod serde_secp_secret {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use secp256k1::SecretKey;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(key: &SecretKey, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(key.secret_bytes()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SecretKey, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = STANDARD
            .decode(s.as_bytes())
            .map_err(serde::de::Error::custom)?;
        SecretKey::from_slice(&bytes).map_err(serde::de::Error::custom)
    }
}

mod serde_secp_publics {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use secp256k1::PublicKey;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(keys: &[PublicKey], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let encoded: Vec<String> = keys
            .iter()
            .map(|key| STANDARD.encode(key.serialize()))
            .collect();
        encoded.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<PublicKey>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = Vec::<String>::deserialize(deserializer)?;
        encoded
            .iter()
            .map(|s| {
                let bytes = STANDARD
                    .decode(s.as_bytes())
                    .map_err(serde::de::Error::custom)?;
                PublicKey::from_slice(&bytes).map_err(serde::de::Error::custom)
            })
            .collect()
    }
}
