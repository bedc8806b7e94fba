use crate::foundation::NANOS_PER_SECOND;
use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time as nanoseconds since the Unix epoch.
pub fn now_nanos() -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    now.as_secs()
        .saturating_mul(NANOS_PER_SECOND)
        .saturating_add(u64::from(now.subsec_nanos()))
}
