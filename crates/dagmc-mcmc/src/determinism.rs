use chrono::Utc;
use dagmc_core::derive_substream_seed;

use crate::config::SeedPolicy;

const CLOCK_SUBSTREAM: u64 = 0xC10C_C10C_C10C_C10C;

/// Seed used for a run: the configured master seed, or one derived from the
/// current wall-clock time when none is configured.
pub fn resolve_seed(policy: &SeedPolicy) -> u64 {
    match policy.master_seed {
        Some(seed) => seed,
        None => clock_seed(Utc::now().timestamp_nanos_opt().unwrap_or_default()),
    }
}

/// Hashes a nanosecond timestamp into a seed.
pub fn clock_seed(nanos: i64) -> u64 {
    derive_substream_seed(nanos as u64, CLOCK_SUBSTREAM)
}
