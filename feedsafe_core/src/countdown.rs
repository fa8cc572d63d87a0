//! Live countdown for a drinking session that is already under way.
//!
//! The engine keeps only the entry list and re-evaluates the clearance model
//! from scratch for every `now` it is handed; the caller owns the clock and
//! ticks it (the CLI does so once per second).

use crate::clearance::{clearance_deadline_ms, entry_problem, sanitize_profile, total_remaining_ms};
use crate::time::MS_PER_MINUTE;
use crate::types::{DrinkEntry, InputIssue, Profile};
use serde::{Deserialize, Serialize};

/// Snapshot of the countdown at one instant
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountdownStatus {
    pub now: i64,
    pub remaining_ms: i64,
    pub is_safe: bool,
    /// `now + remaining_ms`, saturating
    pub safe_at: i64,
}

#[derive(Clone, Debug)]
pub struct CountdownEngine {
    entries: Vec<DrinkEntry>,
    profile: Profile,
    margin_ms: i64,
    issues: Vec<InputIssue>,
}

impl CountdownEngine {
    /// Unusable entries and profile values are dropped or defaulted here and
    /// reported through [`CountdownEngine::issues`].
    pub fn new(entries: Vec<DrinkEntry>, profile: &Profile, safety_margin_minutes: i64) -> Self {
        let (profile, mut issues) = sanitize_profile(profile);

        let entries: Vec<DrinkEntry> = entries
            .into_iter()
            .filter(|e| match entry_problem(e) {
                Some(reason) => {
                    issues.push(InputIssue::new("drink_entry", Some(e.id.to_string()), reason));
                    false
                }
                None => true,
            })
            .collect();

        let margin_ms = if safety_margin_minutes < 0 {
            issues.push(InputIssue::new(
                "safety_margin",
                None,
                format!("negative margin {} treated as 0", safety_margin_minutes),
            ));
            0
        } else {
            safety_margin_minutes.saturating_mul(MS_PER_MINUTE)
        };

        tracing::debug!(
            "Countdown over {} entries, margin {} ms",
            entries.len(),
            margin_ms
        );

        Self {
            entries,
            profile,
            margin_ms,
            issues,
        }
    }

    /// Milliseconds until feeding is safe, never negative.
    ///
    /// While any drink is still clearing this is the summed remaining time
    /// plus the margin. Once everything has cleared the margin runs down from
    /// the moment the last entry cleared.
    pub fn remaining_ms(&self, now: i64) -> i64 {
        let total = total_remaining_ms(&self.entries, &self.profile, now);
        if total > 0 {
            return total.saturating_add(self.margin_ms);
        }
        match clearance_deadline_ms(&self.entries, &self.profile) {
            Some(deadline) => deadline
                .saturating_add(self.margin_ms)
                .saturating_sub(now)
                .max(0),
            None => 0,
        }
    }

    pub fn is_safe(&self, now: i64) -> bool {
        self.remaining_ms(now) <= 0
    }

    pub fn status(&self, now: i64) -> CountdownStatus {
        let remaining_ms = self.remaining_ms(now);
        CountdownStatus {
            now,
            remaining_ms,
            is_safe: remaining_ms <= 0,
            safe_at: now.saturating_add(remaining_ms),
        }
    }

    pub fn entries(&self) -> &[DrinkEntry] {
        &self.entries
    }

    pub fn issues(&self) -> &[InputIssue] {
        &self.issues
    }
}
