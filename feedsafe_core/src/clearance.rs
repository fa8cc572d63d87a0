//! Alcohol clearance model.
//!
//! Hours per standard drink follow a three-point weight nomogram
//! (54 kg → 2.5 h, 68 kg → 2.25 h, 82 kg → 2.0 h). Multiple drinks are
//! combined zero-order: each entry's remaining time is computed on its own
//! and the results are summed. For drinks taken close together this
//! overestimates the wait compared to a shared pool; the nomogram is
//! additive and we keep it that way.

use crate::time::{hours_to_ms, is_valid_epoch_ms, MS_PER_HOUR};
use crate::types::{DrinkEntry, InputIssue, Profile, DEFAULT_STD_DRINK_GRAMS};

/// Used when no (usable) weight is known
pub const DEFAULT_HOURS_PER_DRINK: f64 = 2.5;

/// Below the lowest calibration point we do not extrapolate
pub const UNDERWEIGHT_HOURS_PER_DRINK: f64 = 2.8;

const CALIBRATION: [(f64, f64); 3] = [(54.0, 2.5), (68.0, 2.25), (82.0, 2.0)];

/// Hours needed to clear one standard drink for the given body weight
pub fn hours_per_standard_drink(weight_kg: Option<f64>) -> f64 {
    let weight = match weight_kg {
        Some(w) if w.is_finite() && w > 0.0 => w,
        _ => return DEFAULT_HOURS_PER_DRINK,
    };

    let [(w0, h0), (w1, h1), (w2, h2)] = CALIBRATION;

    if weight < w0 {
        UNDERWEIGHT_HOURS_PER_DRINK
    } else if weight < w1 {
        lerp(weight, (w0, h0), (w1, h1))
    } else if weight < w2 {
        lerp(weight, (w1, h1), (w2, h2))
    } else {
        h2
    }
}

fn lerp(x: f64, (x0, y0): (f64, f64), (x1, y1): (f64, f64)) -> f64 {
    y0 + (x - x0) / (x1 - x0) * (y1 - y0)
}

/// Replace unusable profile values with conservative defaults
pub fn sanitize_profile(profile: &Profile) -> (Profile, Vec<InputIssue>) {
    let mut issues = Vec::new();
    let mut clean = profile.clone();

    if !(clean.std_drink_grams.is_finite() && clean.std_drink_grams > 0.0) {
        issues.push(InputIssue::new(
            "profile",
            None,
            format!(
                "std_drink_grams {} unusable, using {}",
                clean.std_drink_grams, DEFAULT_STD_DRINK_GRAMS
            ),
        ));
        clean.std_drink_grams = DEFAULT_STD_DRINK_GRAMS;
    }

    if !(clean.conservative_factor.is_finite() && clean.conservative_factor >= 1.0) {
        issues.push(InputIssue::new(
            "profile",
            None,
            format!(
                "conservative_factor {} below 1.0, using 1.0",
                clean.conservative_factor
            ),
        ));
        clean.conservative_factor = 1.0;
    }

    if let Some(w) = clean.weight_kg {
        if !(w.is_finite() && w > 0.0) {
            issues.push(InputIssue::new(
                "profile",
                None,
                format!("weight_kg {} unusable, treating as unknown", w),
            ));
            clean.weight_kg = None;
        }
    }

    (clean, issues)
}

/// Why an entry cannot take part in the calculation, if it cannot
pub fn entry_problem(entry: &DrinkEntry) -> Option<String> {
    if !is_valid_epoch_ms(entry.timestamp) {
        return Some(format!("timestamp {} out of range", entry.timestamp));
    }
    if entry.glasses == 0 {
        return Some("glasses must be positive".into());
    }
    if !(entry.units_per_glass.is_finite() && entry.units_per_glass >= 0.0) {
        return Some(format!("units_per_glass {} unusable", entry.units_per_glass));
    }
    if let Some(g) = entry.grams_per_unit {
        if !(g.is_finite() && g >= 0.0) {
            return Some(format!("grams_per_unit {} unusable", g));
        }
    }
    None
}

/// Number of standard drinks an entry amounts to
pub fn standard_drink_units(entry: &DrinkEntry, profile: &Profile) -> f64 {
    if entry_problem(entry).is_some() {
        return 0.0;
    }
    let std_grams = effective_std_grams(profile);
    let grams_per_unit = entry.grams_per_unit.unwrap_or(std_grams);
    let grams = entry.glasses as f64 * entry.units_per_glass * grams_per_unit;
    grams / std_grams
}

/// Required clearance for one entry, ignoring elapsed time
pub fn required_hours(entry: &DrinkEntry, profile: &Profile) -> f64 {
    standard_drink_units(entry, profile)
        * hours_per_standard_drink(profile.weight_kg)
        * effective_factor(profile)
}

/// Hours still to wait for one entry at `now` (epoch ms)
pub fn remaining_hours(entry: &DrinkEntry, profile: &Profile, now: i64) -> f64 {
    let required = required_hours(entry, profile);
    let elapsed = (now.saturating_sub(entry.timestamp) as f64 / MS_PER_HOUR as f64).max(0.0);
    (required - elapsed).max(0.0)
}

/// Sum of every entry's remaining time, in milliseconds
pub fn total_remaining_ms(entries: &[DrinkEntry], profile: &Profile, now: i64) -> i64 {
    let hours: f64 = entries
        .iter()
        .map(|e| remaining_hours(e, profile, now))
        .sum();
    hours_to_ms(hours)
}

/// Instant at which every entry has cleared on its own.
///
/// `None` when there is nothing to clear.
pub fn clearance_deadline_ms(entries: &[DrinkEntry], profile: &Profile) -> Option<i64> {
    entries
        .iter()
        .filter(|e| entry_problem(e).is_none())
        .map(|e| e.timestamp.saturating_add(hours_to_ms(required_hours(e, profile))))
        .max()
}

fn effective_std_grams(profile: &Profile) -> f64 {
    if profile.std_drink_grams.is_finite() && profile.std_drink_grams > 0.0 {
        profile.std_drink_grams
    } else {
        DEFAULT_STD_DRINK_GRAMS
    }
}

fn effective_factor(profile: &Profile) -> f64 {
    if profile.conservative_factor.is_finite() {
        profile.conservative_factor.max(1.0)
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::parse_iso;

    fn wine_at(ts: i64) -> DrinkEntry {
        DrinkEntry {
            grams_per_unit: Some(10.0),
            ..DrinkEntry::new(ts, 1, 1.0)
        }
    }

    #[test]
    fn test_calibration_points() {
        assert_eq!(hours_per_standard_drink(Some(54.0)), 2.5);
        assert_eq!(hours_per_standard_drink(Some(68.0)), 2.25);
        assert_eq!(hours_per_standard_drink(Some(82.0)), 2.0);
    }

    #[test]
    fn test_underweight_floor_is_discontinuous() {
        assert_eq!(hours_per_standard_drink(Some(53.9)), 2.8);
        assert_eq!(hours_per_standard_drink(Some(40.0)), 2.8);
        assert_eq!(hours_per_standard_drink(Some(54.0)), 2.5);
    }

    #[test]
    fn test_interpolation_midpoints() {
        assert!((hours_per_standard_drink(Some(61.0)) - 2.375).abs() < 1e-12);
        assert!((hours_per_standard_drink(Some(75.0)) - 2.125).abs() < 1e-12);
    }

    #[test]
    fn test_flat_above_upper_point() {
        assert_eq!(hours_per_standard_drink(Some(120.0)), 2.0);
    }

    #[test]
    fn test_missing_or_bad_weight_uses_default() {
        assert_eq!(hours_per_standard_drink(None), 2.5);
        assert_eq!(hours_per_standard_drink(Some(f64::NAN)), 2.5);
        assert_eq!(hours_per_standard_drink(Some(-3.0)), 2.5);
    }

    #[test]
    fn test_standard_units_with_gram_override() {
        let profile = Profile::default();
        let mut entry = DrinkEntry::new(0, 2, 1.0);
        entry.grams_per_unit = Some(14.0);
        assert!((standard_drink_units(&entry, &profile) - 2.8).abs() < 1e-12);
    }

    #[test]
    fn test_remaining_before_and_after_drink() {
        let profile = Profile::with_weight(68.0);
        let entry = wine_at(10 * MS_PER_HOUR);

        // `now` before the drink: elapsed clamps to zero
        assert_eq!(remaining_hours(&entry, &profile, 0), 2.25);
        assert_eq!(remaining_hours(&entry, &profile, 11 * MS_PER_HOUR), 1.25);
        assert_eq!(remaining_hours(&entry, &profile, 20 * MS_PER_HOUR), 0.0);
    }

    #[test]
    fn test_conservative_factor_scales_wait() {
        let profile = Profile {
            conservative_factor: 1.5,
            ..Profile::with_weight(82.0)
        };
        assert_eq!(required_hours(&wine_at(0), &profile), 3.0);
    }

    #[test]
    fn test_wine_at_20_for_68kg_is_safe_at_2215() {
        let drink_at = parse_iso("2026-10-18T20:00:00Z").unwrap();
        let profile = Profile::with_weight(68.0);
        let remaining = total_remaining_ms(&[wine_at(drink_at)], &profile, drink_at);
        assert_eq!(
            drink_at + remaining,
            parse_iso("2026-10-18T22:15:00Z").unwrap()
        );
    }

    #[test]
    fn test_two_beers_without_weight_clear_at_midnight() {
        let drink_at = parse_iso("2026-10-18T19:00:00Z").unwrap();
        let beer = DrinkEntry::new(drink_at, 2, 1.0);
        let remaining = total_remaining_ms(&[beer], &Profile::default(), drink_at);
        assert_eq!(remaining, 5 * MS_PER_HOUR);
        assert_eq!(
            drink_at + remaining,
            parse_iso("2026-10-19T00:00:00Z").unwrap()
        );
    }

    #[test]
    fn test_entries_are_summed_not_pooled() {
        let profile = Profile::default();
        let entries = vec![wine_at(0), wine_at(0), wine_at(0)];
        assert_eq!(total_remaining_ms(&entries, &profile, 0), hours_to_ms(7.5));
    }

    #[test]
    fn test_bad_entry_contributes_nothing() {
        let profile = Profile::default();
        let mut bad = DrinkEntry::new(0, 1, f64::NAN);
        bad.grams_per_unit = None;
        assert!(entry_problem(&bad).is_some());
        assert_eq!(total_remaining_ms(&[bad, wine_at(0)], &profile, 0), hours_to_ms(2.5));
    }

    #[test]
    fn test_clearance_deadline_is_latest_entry() {
        let profile = Profile::default();
        let entries = vec![wine_at(0), wine_at(MS_PER_HOUR)];
        assert_eq!(
            clearance_deadline_ms(&entries, &profile),
            Some(MS_PER_HOUR + hours_to_ms(2.5))
        );
        assert_eq!(clearance_deadline_ms(&[], &profile), None);
    }

    #[test]
    fn test_extreme_instants_do_not_overflow() {
        let profile = Profile::default();
        let ancient = DrinkEntry::new(i64::MIN + 5, 1, 1.0);
        assert!(entry_problem(&ancient).is_some());
        assert_eq!(remaining_hours(&ancient, &profile, i64::MAX - 5), 0.0);
        assert_eq!(total_remaining_ms(&[ancient.clone()], &profile, i64::MAX - 5), 0);
        assert_eq!(clearance_deadline_ms(&[ancient], &profile), None);

        // `now` far on either side of a normal drink
        let drink = wine_at(0);
        assert_eq!(remaining_hours(&drink, &profile, i64::MAX), 0.0);
        assert_eq!(remaining_hours(&drink, &profile, i64::MIN), 2.5);
    }

    #[test]
    fn test_huge_entry_saturates_deadline() {
        let profile = Profile::default();
        let mut entry = wine_at(0);
        entry.units_per_glass = 1e300;
        assert_eq!(clearance_deadline_ms(&[entry], &profile), Some(i64::MAX));
    }

    #[test]
    fn test_sanitize_profile_reports_issues() {
        let profile = Profile {
            weight_kg: Some(f64::INFINITY),
            std_drink_grams: 0.0,
            conservative_factor: 0.5,
        };
        let (clean, issues) = sanitize_profile(&profile);
        assert_eq!(clean, Profile::default());
        assert_eq!(issues.len(), 3);
    }
}
