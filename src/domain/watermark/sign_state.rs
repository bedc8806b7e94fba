//! The sign-state engine: monotonic watermark, recent-decision cache, and
//! durable persistence.

use crate::domain::canonical::only_differ_by_timestamp;
use crate::domain::coordinate::{HrsKey, HrstKey};
use crate::domain::watermark::PendingWrites;
use crate::foundation::util::serde::{base64_bytes, hex_bytes_upper};
use crate::foundation::{ChainId, Result, SignerError, BLOCKS_TO_CACHE};
use crate::infrastructure::storage::write_file_atomic;
use log::{debug, info, warn};
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// An immutable record of one completed signing decision.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SignStateConsensus {
    pub height: i64,
    pub round: i64,
    pub step: i8,
    pub signature: Vec<u8>,
    pub sign_bytes: Vec<u8>,
}

impl SignStateConsensus {
    pub fn new(height: i64, round: i64, step: i8) -> Self {
        Self {
            height,
            round,
            step,
            ..Default::default()
        }
    }

    pub fn hrs_key(&self) -> HrsKey {
        HrsKey {
            height: self.height,
            round: self.round,
            step: self.step,
        }
    }
}

/// A signing decision tagged with the chain it belongs to, for callers that
/// route decisions across per-chain sign states.
#[derive(Clone, Debug)]
pub struct ChainSignStateConsensus {
    pub chain_id: ChainId,
    pub consensus: SignStateConsensus,
}

/// Durable high-water-mark plus a bounded cache of recent signing decisions
/// for one chain.
///
/// All mutable state sits behind one mutex; the condition variable bound to
/// it signals waiters whenever the watermark advances.
#[derive(Debug)]
pub struct SignState {
    file_path: PathBuf,
    inner: Mutex<SignStateInner>,
    cond: Condvar,
}

#[derive(Debug)]
struct SignStateInner {
    height: i64,
    round: i64,
    step: i8,
    nonce_public: Vec<u8>,
    signature: Vec<u8>,
    sign_bytes: Vec<u8>,
    cache: HashMap<HrsKey, SignStateConsensus>,
}

/// On-disk JSON shape of a sign state. `signbytes` is uppercase hex; the
/// other byte fields are base64.
#[derive(Deserialize, Serialize)]
struct SignStateFile {
    height: i64,
    round: i64,
    step: i8,
    #[serde(default, with = "base64_bytes")]
    nonce_public: Vec<u8>,
    #[serde(default, with = "base64_bytes", skip_serializing_if = "Vec::is_empty")]
    signature: Vec<u8>,
    #[serde(
        rename = "signbytes",
        default,
        with = "hex_bytes_upper",
        skip_serializing_if = "Vec::is_empty"
    )]
    sign_bytes: Vec<u8>,
}

impl SignStateInner {
    fn hrs_key(&self) -> HrsKey {
        HrsKey {
            height: self.height,
            round: self.round,
            step: self.step,
        }
    }

    fn check_hrs(&self, hrst: HrstKey) -> Result<bool> {
        if self.height > hrst.height {
            return Err(SignerError::HeightRegression {
                got: hrst.height,
                last: self.height,
            });
        }
        if self.height == hrst.height {
            if self.round > hrst.round {
                return Err(SignerError::RoundRegression {
                    height: hrst.height,
                    got: hrst.round,
                    last: self.round,
                });
            }
            if self.round == hrst.round {
                if self.step > hrst.step {
                    return Err(SignerError::StepRegression {
                        height: hrst.height,
                        round: hrst.round,
                        got: hrst.step,
                        last: self.step,
                    });
                }
                if self.step == hrst.step {
                    if !self.sign_bytes.is_empty() {
                        assert!(
                            !self.signature.is_empty(),
                            "sign state has sign bytes but no signature"
                        );
                        return Ok(true);
                    }
                    return Err(SignerError::NoSignBytes);
                }
            }
        }
        Ok(false)
    }

    fn error_if_less_or_equal(&self, height: i64, round: i64, step: i8) -> Result<()> {
        let hrs = HrsKey::new(height, round, step);
        let current = self.hrs_key();
        if current == hrs {
            return Err(SignerError::SameHrs {
                height,
                round,
                step,
            });
        }
        if !current.greater_than(hrs) {
            return Ok(());
        }
        if current.height > height {
            Err(SignerError::HeightRegression {
                got: height,
                last: current.height,
            })
        } else if current.round > round {
            Err(SignerError::RoundRegression {
                height,
                got: round,
                last: current.round,
            })
        } else {
            Err(SignerError::StepRegression {
                height,
                round,
                got: step,
                last: current.step,
            })
        }
    }

    fn marshal(&self) -> Vec<u8> {
        let file = SignStateFile {
            height: self.height,
            round: self.round,
            step: self.step,
            nonce_public: self.nonce_public.clone(),
            signature: self.signature.clone(),
            sign_bytes: self.sign_bytes.clone(),
        };
        // Serialization of plain integers and byte strings cannot fail.
        serde_json::to_vec_pretty(&file).expect("sign state serializes to JSON")
    }
}

impl SignState {
    fn empty(file_path: PathBuf) -> Self {
        Self {
            file_path,
            inner: Mutex::new(SignStateInner {
                height: 0,
                round: 0,
                step: 0,
                nonce_public: Vec::new(),
                signature: Vec::new(),
                sign_bytes: Vec::new(),
                cache: HashMap::new(),
            }),
            cond: Condvar::new(),
        }
    }

    /// Current high-water-mark coordinate.
    pub fn hrs_key(&self) -> HrsKey {
        self.inner.lock().hrs_key()
    }

    /// Public nonce commitment recorded alongside the high-water-mark.
    pub fn nonce_public(&self) -> Vec<u8> {
        self.inner.lock().nonce_public.clone()
    }

    /// Checks an inbound coordinate against the watermark.
    ///
    /// Returns `Ok(true)` when the coordinate equals the watermark and a
    /// signature is already recorded, `Ok(false)` when the coordinate is
    /// strictly greater, and a regression or `NoSignBytes` error otherwise.
    /// Panics if the state carries sign bytes without a signature.
    pub fn check_hrs(&self, hrst: HrstKey) -> Result<bool> {
        self.inner.lock().check_hrs(hrst)
    }

    /// Fast pre-check for `save`: regression error below the watermark, a
    /// distinct `SameHrs` error at it, `Ok` above it.
    pub fn error_if_less_or_equal(&self, height: i64, round: i64, step: i8) -> Result<()> {
        self.inner.lock().error_if_less_or_equal(height, round, step)
    }

    /// Fast path for "has this coordinate already been signed?".
    ///
    /// Always returns the current high-water-mark; additionally returns the
    /// cached decision for `hrs` when one is retained.
    pub fn get_from_cache(&self, hrs: HrsKey) -> (HrsKey, Option<SignStateConsensus>) {
        let inner = self.inner.lock();
        (inner.hrs_key(), inner.cache.get(&hrs).cloned())
    }

    /// The gate used before starting a fresh threshold signing round.
    ///
    /// At a strictly greater coordinate, signing may proceed (`Ok(None)`).
    /// At the watermark itself, a byte-identical payload replays the stored
    /// signature; a payload that differs only by timestamp grants
    /// permission to re-sign; anything else is a conflict.
    pub fn existing_signature_or_error_if_regression(
        &self,
        hrst: HrstKey,
        sign_bytes: &[u8],
    ) -> Result<Option<Vec<u8>>> {
        let inner = self.inner.lock();
        let same_hrs = inner.check_hrs(hrst)?;
        if !same_hrs {
            // Not a regression; okay to sign.
            return Ok(None);
        }

        if sign_bytes == inner.sign_bytes.as_slice() {
            return Ok(Some(inner.signature.clone()));
        }
        if let Err(err) = only_differ_by_timestamp(inner.step, &inner.sign_bytes, sign_bytes) {
            warn!(
                "conflicting sign request hrs={} error={}",
                inner.hrs_key(),
                err
            );
            return Err(err);
        }

        // Same HRS and the payloads differ only by timestamp; okay to sign
        // again.
        Ok(None)
    }

    /// Admits a new signing decision.
    ///
    /// The decision must strictly advance the watermark. The cache entry,
    /// eviction of heights older than the retention window, the watermark
    /// update, and JSON serialization all happen under the lock; disk I/O
    /// happens after it is released. With a `PendingWrites` counter the
    /// write runs on a spawned thread; otherwise it completes before
    /// returning. A persistence failure aborts the process.
    pub fn save(&self, ssc: SignStateConsensus, pending: Option<&PendingWrites>) -> Result<()> {
        let json = {
            let mut inner = self.inner.lock();
            inner.error_if_less_or_equal(ssc.height, ssc.round, ssc.step)?;

            inner.cache.insert(ssc.hrs_key(), ssc.clone());
            inner
                .cache
                .retain(|hrs, _| hrs.height >= ssc.height - BLOCKS_TO_CACHE);

            inner.height = ssc.height;
            inner.round = ssc.round;
            inner.step = ssc.step;
            inner.signature = ssc.signature;
            inner.sign_bytes = ssc.sign_bytes;
            inner.marshal()
        };

        debug!(
            "sign state advanced hrs={}:{}:{} path={}",
            ssc.height,
            ssc.round,
            ssc.step,
            self.file_path.display()
        );

        // Wake any caller waiting for a decision at this coordinate.
        self.cond.notify_all();

        match pending {
            Some(pending) => {
                pending.add();
                let path = self.file_path.clone();
                let pending = pending.clone();
                std::thread::spawn(move || {
                    persist(&path, &json);
                    pending.done();
                });
            }
            None => persist(&self.file_path, &json),
        }

        Ok(())
    }

    /// Blocks until the next watermark broadcast. Callers must recheck
    /// their predicate (via `get_from_cache`) after waking.
    pub fn cond_wait(&self) {
        let mut inner = self.inner.lock();
        self.cond.wait(&mut inner);
    }

    pub fn cond_broadcast(&self) {
        self.cond.notify_all();
    }

    /// Clone of this state whose cache is seeded with exactly the current
    /// high-water-mark, behind a fresh monitor.
    pub fn fresh_cache(&self) -> SignState {
        let inner = self.inner.lock();
        let hwm = SignStateConsensus {
            height: inner.height,
            round: inner.round,
            step: inner.step,
            signature: inner.signature.clone(),
            sign_bytes: inner.sign_bytes.clone(),
        };
        let mut cache = HashMap::new();
        cache.insert(hwm.hrs_key(), hwm);

        SignState {
            file_path: self.file_path.clone(),
            inner: Mutex::new(SignStateInner {
                height: inner.height,
                round: inner.round,
                step: inner.step,
                nonce_public: inner.nonce_public.clone(),
                signature: inner.signature.clone(),
                sign_bytes: inner.sign_bytes.clone(),
                cache,
            }),
            cond: Condvar::new(),
        }
    }
}

fn persist(path: &Path, json: &[u8]) {
    if path == Path::new("/dev/null") {
        return;
    }
    if path.as_os_str().is_empty() {
        panic!("cannot persist sign state: file path not set");
    }
    if let Err(err) = write_file_atomic(path, json) {
        // A stale watermark on disk can double-sign after a restart.
        panic!(
            "failed to persist sign state to {}: {}",
            path.display(),
            err
        );
    }
}

/// Loads a sign state from disk, seeding the in-memory cache with the
/// persisted high-water-mark.
pub fn load_sign_state(path: impl AsRef<Path>) -> Result<SignState> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|err| {
        SignerError::storage("read sign state", format!("{}: {}", path.display(), err))
    })?;
    let file: SignStateFile = serde_json::from_slice(&bytes)?;

    let state = SignState {
        file_path: path.to_path_buf(),
        inner: Mutex::new(SignStateInner {
            height: file.height,
            round: file.round,
            step: file.step,
            nonce_public: file.nonce_public,
            signature: file.signature,
            sign_bytes: file.sign_bytes,
            cache: HashMap::new(),
        }),
        cond: Condvar::new(),
    };
    debug!(
        "loaded sign state hrs={} path={}",
        state.hrs_key(),
        path.display()
    );
    Ok(state.fresh_cache())
}

/// Loads the sign state at `path`, or initializes and persists an empty one
/// when the file does not exist yet. Any other stat failure propagates.
pub fn load_or_create_sign_state(path: impl AsRef<Path>) -> Result<SignState> {
    let path = path.as_ref();
    match std::fs::metadata(path) {
        Err(err) if err.kind() == ErrorKind::NotFound => {
            info!("initializing new sign state path={}", path.display());
            let state = SignState::empty(path.to_path_buf());
            let json = state.inner.lock().marshal();
            persist(path, &json);
            Ok(state)
        }
        Err(err) => Err(SignerError::storage(
            "stat sign state",
            format!("{}: {}", path.display(), err),
        )),
        Ok(_) => load_sign_state(path),
    }
}
