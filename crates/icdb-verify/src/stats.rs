//! Timing statistics for verify-then-execute runs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Timings and sizes of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStatistics {
    /// 1-based index of the run on this verifier.
    pub run: usize,
    /// Rows requested per batch.
    pub fetch_size: usize,
    /// Records visited while verifying.
    pub records: usize,
    #[serde(with = "millis")]
    pub verification_time: Duration,
    /// Time spent in aggregate post-processing.
    #[serde(with = "millis")]
    pub aggregate_operation_time: Duration,
    #[serde(with = "millis")]
    pub execution_time: Duration,
}

impl RunStatistics {
    /// Mean timings over several runs. `run` is the number of runs averaged.
    pub fn average(runs: &[RunStatistics]) -> Option<RunStatistics> {
        let n = u32::try_from(runs.len()).ok().filter(|n| *n > 0)?;
        let total = |f: fn(&RunStatistics) -> Duration| runs.iter().map(f).sum::<Duration>() / n;
        Some(RunStatistics {
            run: runs.len(),
            fetch_size: runs[0].fetch_size,
            records: runs.iter().map(|r| r.records).sum::<usize>() / runs.len(),
            verification_time: total(|r| r.verification_time),
            aggregate_operation_time: total(|r| r.aggregate_operation_time),
            execution_time: total(|r| r.execution_time),
        })
    }
}

impl fmt::Display for RunStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "run {}: {} records, fetch size {}, verification {:.3} ms, aggregate operation {:.3} ms, execution {:.3} ms",
            self.run,
            self.records,
            self.fetch_size,
            self.verification_time.as_secs_f64() * 1000.0,
            self.aggregate_operation_time.as_secs_f64() * 1000.0,
            self.execution_time.as_secs_f64() * 1000.0,
        )
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_secs_f64() * 1000.0)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let ms = f64::deserialize(deserializer)?;
        Ok(Duration::from_secs_f64(ms.max(0.0) / 1000.0))
    }
}
