//! Core domain types for the FeedSafe system.
//!
//! This module defines the fundamental types used throughout the system:
//! - The user profile driving the clearance model
//! - Consumed drinks (active session) and planned drinks (planning mode)
//! - Feed predictions
//! - Planning moments and the strategy that shapes them
//! - Diagnostics for input that had to be dropped or defaulted

use crate::time::TimeInput;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Profile
// ============================================================================

/// Grams of pure alcohol in one standard drink (NL/EU)
pub const DEFAULT_STD_DRINK_GRAMS: f64 = 10.0;

/// Per-user parameters for the clearance model
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    #[serde(default)]
    pub weight_kg: Option<f64>,

    #[serde(default = "default_std_drink_grams")]
    pub std_drink_grams: f64,

    /// Multiplier (>= 1.0) applied to every required wait
    #[serde(default = "default_conservative_factor")]
    pub conservative_factor: f64,
}

fn default_std_drink_grams() -> f64 {
    DEFAULT_STD_DRINK_GRAMS
}

fn default_conservative_factor() -> f64 {
    1.0
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            weight_kg: None,
            std_drink_grams: DEFAULT_STD_DRINK_GRAMS,
            conservative_factor: 1.0,
        }
    }
}

impl Profile {
    pub fn with_weight(weight_kg: f64) -> Self {
        Self {
            weight_kg: Some(weight_kg),
            ..Self::default()
        }
    }
}

// ============================================================================
// Drinks
// ============================================================================

/// A drink that has already been consumed
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DrinkEntry {
    pub id: Uuid,
    /// Epoch ms at which the drink was consumed
    pub timestamp: i64,
    pub glasses: u32,
    /// Standard drinks per glass for this beverage
    pub units_per_glass: f64,
    /// Overrides the profile's standard-drink grams for this entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grams_per_unit: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drink_type_id: Option<String>,
}

impl DrinkEntry {
    pub fn new(timestamp: i64, glasses: u32, units_per_glass: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp,
            glasses,
            units_per_glass,
            grams_per_unit: None,
            drink_type_id: None,
        }
    }
}

/// A drink the user intends to have later in the evening
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PlannedDrink {
    pub id: String,
    pub drink_type_id: String,
    pub time: TimeInput,
    /// Number of glasses; missing means one
    #[serde(default)]
    pub amount: Option<f64>,
}

impl PlannedDrink {
    pub fn new(drink_type_id: impl Into<String>, time: impl Into<TimeInput>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            drink_type_id: drink_type_id.into(),
            time: time.into(),
            amount: None,
        }
    }

    pub fn with_amount(mut self, amount: f64) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn glasses(&self) -> f64 {
        self.amount.unwrap_or(1.0)
    }
}

// ============================================================================
// Feeds
// ============================================================================

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FeedOrigin {
    Predicted,
    Manual,
}

/// An expected (or user-entered) baby feed
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FeedPrediction {
    /// Epoch ms
    pub time: i64,
    pub amount_ml: f64,
    /// 0..=1
    pub confidence: f64,
    pub origin: FeedOrigin,
}

impl FeedPrediction {
    /// A feed the user entered themselves
    pub fn manual(time: i64, amount_ml: f64) -> Self {
        Self {
            time,
            amount_ml,
            confidence: 1.0,
            origin: FeedOrigin::Manual,
        }
    }
}

// ============================================================================
// Planning
// ============================================================================

/// How densely pump moments are inserted
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// As few pumps as possible within the comfort ceiling
    #[default]
    Minimal,
    /// A pump on a fixed cadence
    Conservative,
}

impl std::str::FromStr for Strategy {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "minimal" => Ok(Strategy::Minimal),
            "conservative" => Ok(Strategy::Conservative),
            other => Err(crate::Error::Input(format!("unknown strategy: {}", other))),
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MomentStatus {
    Safe,
    Warning,
    Unsafe,
}

/// What happens at a planning moment
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MomentKind {
    Drink { drink_type_id: String },
    Feed,
    Pump,
    Safe,
}

impl MomentKind {
    /// Tie-break for moments sharing a timestamp
    pub fn sort_rank(&self) -> u8 {
        match self {
            MomentKind::Drink { .. } => 0,
            MomentKind::Feed => 1,
            MomentKind::Pump => 2,
            MomentKind::Safe => 3,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            MomentKind::Drink { .. } => "drink",
            MomentKind::Feed => "feed",
            MomentKind::Pump => "pump",
            MomentKind::Safe => "safe",
        }
    }
}

/// A single event in a generated evening plan
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PlanningMoment {
    pub kind: MomentKind,
    /// Epoch ms
    pub time: i64,
    pub label: String,
    pub description: String,
    pub status: MomentStatus,
}

impl PlanningMoment {
    pub fn new(
        kind: MomentKind,
        time: i64,
        label: impl Into<String>,
        description: impl Into<String>,
        status: MomentStatus,
    ) -> Self {
        Self {
            kind,
            time,
            label: label.into(),
            description: description.into(),
            status,
        }
    }

    pub fn is_pump(&self) -> bool {
        matches!(self.kind, MomentKind::Pump)
    }
}

// ============================================================================
// Diagnostics
// ============================================================================

/// A record that was dropped or replaced by a default during a calculation
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct InputIssue {
    /// Which kind of record, e.g. `planned_drink`
    pub record: String,
    pub id: Option<String>,
    pub reason: String,
}

impl InputIssue {
    pub fn new(record: &str, id: Option<String>, reason: impl Into<String>) -> Self {
        let issue = Self {
            record: record.to_string(),
            id,
            reason: reason.into(),
        };
        tracing::warn!(
            "Ignoring {} {}: {}",
            issue.record,
            issue.id.as_deref().unwrap_or("-"),
            issue.reason
        );
        issue
    }
}
