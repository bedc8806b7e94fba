//! Deterministic threshold sharding of the validator key and parallel
//! generation of per-cosigner encryption keypairs.

use crate::foundation::{Result, SignerError, RSA_KEY_BITS};
use crate::infrastructure::keys::{CosignerEciesKey, CosignerEd25519Key, CosignerRsaKey};
use curve25519_dalek::Scalar;
use ed25519_dalek::hazmat::ExpandedSecretKey;
use ed25519_dalek::SigningKey;
use log::debug;
use rand::rngs::OsRng;

/// Shamir-shards the validator Ed25519 key into `shards` shares with
/// recovery threshold `threshold`.
///
/// The 32-byte seed is first run through the standard Ed25519 secret
/// expansion (SHA-512 and clamping); the resulting signing scalar is the
/// constant term of the dealt polynomial. Every record carries the same
/// validator public key and a 1-based id matching its share index.
pub fn create_ed25519_shards(
    signing_key: &SigningKey,
    threshold: u8,
    shards: u8,
) -> Result<Vec<CosignerEd25519Key>> {
    if threshold == 0 || threshold > shards {
        return Err(SignerError::InvalidShardConfig { threshold, shards });
    }

    let expanded = ExpandedSecretKey::from(&signing_key.to_bytes());
    let shares = deal_shares(expanded.scalar, threshold, shards);
    let pub_key = signing_key.verifying_key();

    debug!(
        "dealt ed25519 shards threshold={} shards={}",
        threshold, shards
    );

    Ok(shares
        .into_iter()
        .enumerate()
        .map(|(i, shard)| CosignerEd25519Key {
            pub_key,
            private_shard: shard,
            id: i as u8 + 1,
        })
        .collect())
}

/// Deals Shamir shares of `secret`: a random polynomial of degree
/// `threshold - 1` with constant term `secret`, evaluated at x = 1..=shards.
fn deal_shares(secret: Scalar, threshold: u8, shards: u8) -> Vec<Scalar> {
    let mut coefficients = Vec::with_capacity(threshold as usize);
    coefficients.push(secret);
    for _ in 1..threshold {
        coefficients.push(Scalar::random(&mut OsRng));
    }
    (1..=shards)
        .map(|x| evaluate(&coefficients, Scalar::from(u64::from(x))))
        .collect()
}

fn evaluate(coefficients: &[Scalar], x: Scalar) -> Scalar {
    // Horner evaluation.
    coefficients
        .iter()
        .rev()
        .fold(Scalar::ZERO, |acc, coefficient| acc * x + coefficient)
}

/// Recovers the dealt secret from at least `threshold` distinct shares by
/// Lagrange interpolation at zero. Intended for provisioning verification;
/// live signing never reassembles the secret in one place.
pub fn recover_ed25519_secret(shares: &[(u8, Scalar)]) -> Scalar {
    let mut secret = Scalar::ZERO;
    for (i, (id_i, share)) in shares.iter().enumerate() {
        let x_i = Scalar::from(u64::from(*id_i));
        let mut numerator = Scalar::ONE;
        let mut denominator = Scalar::ONE;
        for (j, (id_j, _)) in shares.iter().enumerate() {
            if i == j {
                continue;
            }
            let x_j = Scalar::from(u64::from(*id_j));
            numerator *= x_j;
            denominator *= x_j - x_i;
        }
        secret += share * numerator * denominator.invert();
    }
    secret
}

/// Generates `shards` independent 4096-bit RSA keypairs in parallel and
/// distributes the full ordered public-key list into every record.
pub fn create_rsa_shards(shards: u8) -> Result<Vec<CosignerRsaKey>> {
    let keys = generate_parallel(shards, || {
        rsa::RsaPrivateKey::new(&mut OsRng, RSA_KEY_BITS).map_err(|err| {
            SignerError::KeyGeneration {
                scheme: "rsa",
                details: err.to_string(),
            }
        })
    })?;
    let rsa_pubs: Vec<rsa::RsaPublicKey> =
        keys.iter().map(rsa::RsaPrivateKey::to_public_key).collect();
    Ok(keys
        .into_iter()
        .enumerate()
        .map(|(i, rsa_key)| CosignerRsaKey {
            id: i as u8 + 1,
            rsa_key,
            rsa_pubs: rsa_pubs.clone(),
        })
        .collect())
}

/// Generates `shards` independent secp256k1 ECIES keypairs in parallel and
/// distributes the full ordered public-key list into every record.
pub fn create_ecies_shards(shards: u8) -> Result<Vec<CosignerEciesKey>> {
    let keys = generate_parallel(shards, || Ok(secp256k1::SecretKey::new(&mut OsRng)))?;
    let secp = secp256k1::Secp256k1::new();
    let ecies_pubs: Vec<secp256k1::PublicKey> =
        keys.iter().map(|key| key.public_key(&secp)).collect();
    Ok(keys
        .into_iter()
        .enumerate()
        .map(|(i, ecies_key)| CosignerEciesKey {
            id: i as u8 + 1,
            ecies_key,
            ecies_pubs: ecies_pubs.clone(),
        })
        .collect())
}

/// Runs `count` generators in parallel and collects their outputs in order.
/// The first failure discards the whole batch; partial results never leak
/// to the caller.
fn generate_parallel<T, F>(count: u8, generate: F) -> Result<Vec<T>>
where
    T: Send,
    F: Fn() -> Result<T> + Sync,
{
    let generate = &generate;
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..count)
            .map(|_| scope.spawn(move || generate()))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("key generation thread panicked"))
            .collect()
    })
}
