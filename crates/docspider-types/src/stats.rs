use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Snapshot returned by `Coordinator::stats()` and reported to the owning
/// system on completion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlStats {
    pub found: u64,
    pub filtered: u64,
    pub crawled: u64,
    pub failed: u64,
    #[serde(with = "duration_secs_f64")]
    pub duration: Duration,
    pub avg_response_time_ms: f64,
    pub jobs_sent: u64,
}

/// Why the completion monitor decided the crawl was over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    MaxPagesBudget,
    MaxDepthBudget,
    Idle,
    Stuck,
    TimeBudget,
    Cancelled,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StopReason::MaxPagesBudget => "max_pages_budget",
            StopReason::MaxDepthBudget => "max_depth_budget",
            StopReason::Idle => "idle",
            StopReason::Stuck => "stuck",
            StopReason::TimeBudget => "time_budget",
            StopReason::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

mod duration_secs_f64 {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Ok(Duration::from_secs_f64(secs))
    }
}
