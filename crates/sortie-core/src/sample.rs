//! Timestamped measurement records.
//!
//! A `Sample` is immutable once built: the builder methods consume `self`, and
//! there are no setters. Both the orchestrator's bookkeeping samples and the
//! samples a sortie runner reports use this type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type Metadata = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    metric: String,
    value: f64,
    unit: String,
    #[serde(default)]
    metadata: Metadata,
    timestamp: DateTime<Utc>,
}

impl Sample {
    /// Create a sample stamped with the current time.
    pub fn new(metric: impl Into<String>, value: f64, unit: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            value,
            unit: unit.into(),
            metadata: Metadata::new(),
            timestamp: Utc::now(),
        }
    }

    /// Merge `metadata` into the sample. Later keys win.
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata.extend(metadata);
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn metric(&self) -> &str {
        &self.metric
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn meta(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
