//! Feed prediction.
//!
//! Extrapolates the next few feeds from the last observed feed and the
//! baby's usual interval. The confidence is a heuristic that creeps up the
//! longer it has been since the last feed; it is not a statistical estimate.

use crate::time::{hours_to_ms, is_valid_epoch_ms, MS_PER_HOUR};
use crate::types::{FeedOrigin, FeedPrediction};

/// Number of feeds predicted ahead
pub const PREDICTION_COUNT: usize = 4;

const BASE_CONFIDENCE: f64 = 0.8;
const CONFIDENCE_GAIN_PER_DAY: f64 = 0.15;
const MIN_CONFIDENCE: f64 = 0.6;
const MAX_CONFIDENCE: f64 = 0.95;

/// Predict the next feeds after `last_feed_time`.
///
/// Returns an empty list when there is no last feed or the interval is not a
/// positive number of hours.
pub fn predict_feeds(
    last_feed_time: Option<i64>,
    interval_hours: f64,
    amount_ml: f64,
    now: i64,
) -> Vec<FeedPrediction> {
    let Some(last) = last_feed_time else {
        return Vec::new();
    };
    if !is_valid_epoch_ms(last) {
        tracing::warn!("Last feed {} out of range, no predictions", last);
        return Vec::new();
    }

    if !(interval_hours.is_finite() && interval_hours > 0.0) {
        tracing::warn!("Feed interval {} unusable, no predictions", interval_hours);
        return Vec::new();
    }

    let amount_ml = if amount_ml.is_finite() && amount_ml >= 0.0 {
        amount_ml
    } else {
        0.0
    };

    let confidence = confidence_for(last, now);
    let interval_ms = hours_to_ms(interval_hours);

    (1..=PREDICTION_COUNT as i64)
        .map(|k| FeedPrediction {
            time: last.saturating_add(k.saturating_mul(interval_ms)),
            amount_ml,
            confidence,
            origin: FeedOrigin::Predicted,
        })
        .collect()
}

fn confidence_for(last_feed: i64, now: i64) -> f64 {
    let hours_since = now.saturating_sub(last_feed) as f64 / MS_PER_HOUR as f64;
    (BASE_CONFIDENCE + (hours_since / 24.0) * CONFIDENCE_GAIN_PER_DAY)
        .clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
}

/// Combine predictions with feeds the user entered by hand.
///
/// A manual feed replaces any prediction less than half an interval away
/// from it. The result is sorted by time.
pub fn merge_feeds(
    predicted: &[FeedPrediction],
    manual: &[FeedPrediction],
    interval_hours: f64,
) -> Vec<FeedPrediction> {
    let window = if interval_hours.is_finite() && interval_hours > 0.0 {
        hours_to_ms(interval_hours) / 2
    } else {
        0
    };

    let mut merged: Vec<FeedPrediction> = predicted
        .iter()
        .filter(|p| {
            !manual
                .iter()
                .any(|m| m.time.saturating_sub(p.time).saturating_abs() < window)
        })
        .cloned()
        .collect();
    merged.extend(manual.iter().cloned());
    merged.sort_by_key(|f| f.time);
    merged
}
