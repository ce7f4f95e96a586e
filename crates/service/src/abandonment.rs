//! Active-vs-abandoned classification for stored cart snapshots.
//!
//! Classification is advisory: it feeds reporting surfaces, never email
//! sends (the scheduler decides those on its own clock). A cart is
//! abandoned once strictly more than the configured window has passed since
//! its last update; a visitor with no snapshot has nothing to abandon.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::CartSnapshot;

/// Unit for the abandonment threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdUnit {
    Minutes,
    Hours,
    Days,
}

impl ThresholdUnit {
    /// Seconds in one unit.
    #[must_use]
    pub const fn seconds(self) -> i64 {
        match self {
            Self::Minutes => 60,
            Self::Hours => 3600,
            Self::Days => 86_400,
        }
    }
}

/// Error parsing a [`ThresholdUnit`] from text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown threshold unit: {0} (expected minutes, hours, or days)")]
pub struct ParseThresholdUnitError(String);

impl std::str::FromStr for ThresholdUnit {
    type Err = ParseThresholdUnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "minutes" => Ok(Self::Minutes),
            "hours" => Ok(Self::Hours),
            "days" => Ok(Self::Days),
            other => Err(ParseThresholdUnitError(other.to_owned())),
        }
    }
}

/// How long a cart may sit untouched before it counts as abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbandonmentThreshold {
    pub value: u32,
    pub unit: ThresholdUnit,
}

impl AbandonmentThreshold {
    #[must_use]
    pub const fn new(value: u32, unit: ThresholdUnit) -> Self {
        Self { value, unit }
    }

    /// The threshold as a concrete duration. The configured value multiplies
    /// the unit in every arm, days included.
    #[must_use]
    pub fn window(self) -> Duration {
        Duration::seconds(i64::from(self.value) * self.unit.seconds())
    }
}

/// Whether a stored cart still counts as in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CartStatus {
    Active,
    Abandoned,
}

/// Classify a snapshot against the threshold at a given instant.
///
/// Abandoned iff the elapsed time since `date_updated` is strictly greater
/// than the window. No snapshot is always `Active`.
#[must_use]
pub fn classify(
    snapshot: Option<&CartSnapshot>,
    threshold: AbandonmentThreshold,
    now: DateTime<Utc>,
) -> CartStatus {
    let Some(snapshot) = snapshot else {
        return CartStatus::Active;
    };

    if now.signed_duration_since(snapshot.date_updated) > threshold.window() {
        CartStatus::Abandoned
    } else {
        CartStatus::Active
    }
}
