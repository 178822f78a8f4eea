//! Codec metrics
//!
//! Prometheus counters for every marshal and unmarshal call, plus an
//! in-process aggregator for run summaries.

use metrics::{counter, histogram};
use std::collections::HashMap;

/// Shape of a marshalled document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarshalMode {
    One,
    Many,
    /// No type information or linked data
    Untyped,
}

impl MarshalMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarshalMode::One => "one",
            MarshalMode::Many => "many",
            MarshalMode::Untyped => "untyped",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnmarshalOutcome {
    Ok,
    /// Input is not valid JSON
    Malformed,
    /// Valid JSON that does not match the target type
    Mismatch,
}

impl UnmarshalOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnmarshalOutcome::Ok => "ok",
            UnmarshalOutcome::Malformed => "malformed",
            UnmarshalOutcome::Mismatch => "mismatch",
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, UnmarshalOutcome::Ok)
    }
}

/// Record one marshal call
pub fn record_marshal(type_tag: &'static str, mode: MarshalMode, bytes: usize) {
    counter!(
        "emissor_marshal_total",
        "type" => type_tag,
        "mode" => mode.as_str()
    )
    .increment(1);
    histogram!("emissor_marshal_bytes", "mode" => mode.as_str()).record(bytes as f64);
}

/// Record one unmarshal call
pub fn record_unmarshal(type_tag: &'static str, outcome: UnmarshalOutcome) {
    counter!(
        "emissor_unmarshal_total",
        "type" => type_tag,
        "outcome" => outcome.as_str()
    )
    .increment(1);
}

/// Codec statistics aggregator
///
/// Aggregates in memory for end-of-run summaries.
#[derive(Debug, Clone, Default)]
pub struct CodecStatsAggregator {
    pub total_marshalled: u64,
    pub total_unmarshalled: u64,
    /// Malformed or mismatched documents
    pub total_failed: u64,
    /// Size of marshalled documents in bytes
    pub document_bytes: RunningStats,
    /// Documents per type tag, both directions
    pub type_counts: HashMap<String, u64>,
}

impl CodecStatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_marshal(&mut self, type_tag: &str, bytes: usize) {
        self.total_marshalled += 1;
        self.document_bytes.push(bytes as f64);
        *self.type_counts.entry(type_tag.to_string()).or_insert(0) += 1;
    }

    pub fn record_unmarshal(&mut self, type_tag: &str, outcome: UnmarshalOutcome) {
        self.total_unmarshalled += 1;
        if !outcome.is_ok() {
            self.total_failed += 1;
            return;
        }
        *self.type_counts.entry(type_tag.to_string()).or_insert(0) += 1;
    }

    pub fn summary(&self) -> CodecSummary {
        CodecSummary {
            total_marshalled: self.total_marshalled,
            total_unmarshalled: self.total_unmarshalled,
            total_failed: self.total_failed,
            failure_rate: if self.total_unmarshalled > 0 {
                self.total_failed as f64 / self.total_unmarshalled as f64 * 100.0
            } else {
                0.0
            },
            document_bytes: StatsSummary::from(&self.document_bytes),
            type_counts: self.type_counts.clone(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, Default)]
pub struct CodecSummary {
    pub total_marshalled: u64,
    pub total_unmarshalled: u64,
    pub total_failed: u64,
    pub failure_rate: f64,
    pub document_bytes: StatsSummary,
    pub type_counts: HashMap<String, u64>,
}

impl std::fmt::Display for CodecSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Codec Summary ===")?;
        writeln!(f, "Marshalled documents: {}", self.total_marshalled)?;
        writeln!(
            f,
            "Unmarshalled documents: {} ({} failed, {:.2}%)",
            self.total_unmarshalled, self.total_failed, self.failure_rate
        )?;
        writeln!(f, "Document size (bytes): {}", self.document_bytes)?;

        if !self.type_counts.is_empty() {
            let mut counts: Vec<_> = self.type_counts.iter().collect();
            counts.sort();
            writeln!(f, "Documents per type:")?;
            for (tag, count) in counts {
                writeln!(f, "  {}: {}", tag, count)?;
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.1}, max={:.1}, mean={:.1}, std={:.1} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
