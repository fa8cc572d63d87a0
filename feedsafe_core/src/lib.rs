#![forbid(unsafe_code)]

//! Core calculations for FeedSafe, a planner for breastfeeding after drinking.
//!
//! This crate provides:
//! - The weight-based clearance model and custom drink conversion
//! - Feed prediction
//! - The evening planner (drinks, feeds, pumps, safe-to-feed time)
//! - A countdown for a session that is under way
//! - Persistence for plans and the drink log
//!
//! The calculation modules are pure: every function takes `now` (epoch ms)
//! explicitly and never fails; unusable input is dropped and reported.

pub mod types;
pub mod error;
pub mod time;
pub mod config;
pub mod logging;
pub mod catalog;
pub mod clearance;
pub mod converter;
pub mod feeds;
pub mod planner;
pub mod countdown;
pub mod plan_store;
pub mod drink_log;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use time::TimeInput;
pub use config::Config;
pub use catalog::{build_default_catalog, get_default_catalog, BeverageCatalog};
pub use clearance::{hours_per_standard_drink, remaining_hours, standard_drink_units, total_remaining_ms};
pub use converter::to_standard_drinks;
pub use feeds::predict_feeds;
pub use planner::{generate_plan, Plan, PlanRequest};
pub use countdown::{CountdownEngine, CountdownStatus};
pub use plan_store::PersistedPlan;
pub use drink_log::{DrinkSink, JsonlDrinkLog};
