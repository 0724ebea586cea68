#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

/// Basis points in one whole (a threshold of 1.0).
pub const BASIS_POINTS_PER_UNIT: u32 = 10_000;

pub const DEFAULT_VOTING_POOL_SIZE: u32 = 5;
pub const DEFAULT_APPROVAL_THRESHOLD_BP: u32 = 4_000;
pub const DEFAULT_VOTING_DURATION_HOURS: u32 = 72;

const MS_PER_HOUR: i64 = 60 * 60 * 1000;
const THRESHOLD_TOLERANCE_BP: f64 = 1e-6;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum GovernanceError {
    #[error("voting pool size must be at least 1")]
    EmptyPool,
    #[error("approval threshold must be in (0, 1], got {0}")]
    ThresholdOutOfRange(String),
    #[error("approval threshold {0} has more than four decimal places")]
    ThresholdTooPrecise(String),
    #[error("voting duration must be at least one hour")]
    ZeroDuration,
    #[error("vote value must be -1, 0 or 1, got {0}")]
    InvalidVoteValue(i64),
}

/// Per-project voting rules.
///
/// The approval threshold is stored in basis points so that
/// `required_yes_votes` never depends on float rounding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernanceSettings {
    pub voting_pool_size: u32,
    pub approval_threshold_bp: u32,
    pub voting_duration_hours: u32,
}

impl Default for GovernanceSettings {
    fn default() -> Self {
        Self {
            voting_pool_size: DEFAULT_VOTING_POOL_SIZE,
            approval_threshold_bp: DEFAULT_APPROVAL_THRESHOLD_BP,
            voting_duration_hours: DEFAULT_VOTING_DURATION_HOURS,
        }
    }
}

impl GovernanceSettings {
    /// `approval_threshold` is a ratio in (0, 1] with at most four decimal
    /// places; finer values are rejected rather than rounded.
    pub fn try_new(
        voting_pool_size: u32,
        approval_threshold: f64,
        voting_duration_hours: u32,
    ) -> Result<Self, GovernanceError> {
        let settings = Self {
            voting_pool_size,
            approval_threshold_bp: threshold_to_bp(approval_threshold)?,
            voting_duration_hours,
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), GovernanceError> {
        if self.voting_pool_size == 0 {
            return Err(GovernanceError::EmptyPool);
        }
        if self.approval_threshold_bp == 0 || self.approval_threshold_bp > BASIS_POINTS_PER_UNIT {
            return Err(GovernanceError::ThresholdOutOfRange(format!(
                "{}",
                self.approval_threshold()
            )));
        }
        if self.voting_duration_hours == 0 {
            return Err(GovernanceError::ZeroDuration);
        }
        Ok(())
    }

    pub fn approval_threshold(&self) -> f64 {
        f64::from(self.approval_threshold_bp) / f64::from(BASIS_POINTS_PER_UNIT)
    }

    /// `max(1, ceil(threshold * pool))`, computed in integers.
    pub fn required_yes_votes(&self) -> u32 {
        let scaled = u64::from(self.approval_threshold_bp) * u64::from(self.voting_pool_size);
        let required = scaled.div_ceil(u64::from(BASIS_POINTS_PER_UNIT));
        u32::try_from(required).unwrap_or(u32::MAX).max(1)
    }

    /// Epoch millis at which voting on a Change published at `published_at_ms` closes.
    pub fn closes_at_ms(&self, published_at_ms: i64) -> i64 {
        published_at_ms.saturating_add(i64::from(self.voting_duration_hours) * MS_PER_HOUR)
    }
}

fn threshold_to_bp(value: f64) -> Result<u32, GovernanceError> {
    if !value.is_finite() || value <= 0.0 || value > 1.0 {
        return Err(GovernanceError::ThresholdOutOfRange(value.to_string()));
    }
    let scaled = value * f64::from(BASIS_POINTS_PER_UNIT);
    let bp = scaled.round();
    if bp < 1.0 {
        return Err(GovernanceError::ThresholdOutOfRange(value.to_string()));
    }
    // Only float noise may be rounded away, never a real fifth decimal.
    if (scaled - bp).abs() > THRESHOLD_TOLERANCE_BP {
        return Err(GovernanceError::ThresholdTooPrecise(value.to_string()));
    }
    // Bounded by the range check above.
    Ok(bp as u32)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum VoteValue {
    Down,
    Clear,
    Up,
}

impl VoteValue {
    pub fn as_i64(self) -> i64 {
        match self {
            VoteValue::Down => -1,
            VoteValue::Clear => 0,
            VoteValue::Up => 1,
        }
    }
}

impl TryFrom<i64> for VoteValue {
    type Error = GovernanceError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(VoteValue::Down),
            0 => Ok(VoteValue::Clear),
            1 => Ok(VoteValue::Up),
            other => Err(GovernanceError::InvalidVoteValue(other)),
        }
    }
}

impl From<VoteValue> for i64 {
    fn from(value: VoteValue) -> Self {
        value.as_i64()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    pub yes: u32,
    pub no: u32,
}

impl VoteTally {
    pub fn from_values(values: impl IntoIterator<Item = VoteValue>) -> Self {
        let mut tally = Self::default();
        for value in values {
            match value {
                VoteValue::Up => tally.yes += 1,
                VoteValue::Down => tally.no += 1,
                VoteValue::Clear => {}
            }
        }
        tally
    }

    pub fn net(&self) -> i64 {
        i64::from(self.yes) - i64::from(self.no)
    }

    /// Only yes votes count; no votes never block a Change.
    pub fn is_passing(&self, settings: &GovernanceSettings) -> bool {
        self.yes >= settings.required_yes_votes()
    }

    pub fn progress(&self, settings: &GovernanceSettings) -> MergeProgress {
        MergeProgress {
            required: settings.required_yes_votes(),
            current: self.yes,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeProgress {
    pub required: u32,
    pub current: u32,
}

impl MergeProgress {
    pub fn is_met(&self) -> bool {
        self.current >= self.required
    }

    pub fn remaining(&self) -> u32 {
        self.required.saturating_sub(self.current)
    }
}
