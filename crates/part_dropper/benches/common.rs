use std::time::Duration;

use criterion::{Criterion, Throughput};

/// Whole sessions are slow to set up, so keep the sample count low.
pub const SESSION_SAMPLES: usize = 10;
pub const WARM_UP: Duration = Duration::from_millis(500);
pub const MEASUREMENT_TIME: Duration = Duration::from_secs(3);

pub fn session_criterion() -> Criterion {
    Criterion::default()
        .configure_from_args()
        .sample_size(SESSION_SAMPLES)
        .warm_up_time(WARM_UP)
        .measurement_time(MEASUREMENT_TIME)
}

/// Throughput of a session measured in dropped parts.
pub fn parts_throughput(target_part_count: u32) -> Throughput {
    Throughput::Elements(u64::from(target_part_count))
}
