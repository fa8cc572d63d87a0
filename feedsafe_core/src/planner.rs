//! Evening planner.
//!
//! Turns a list of planned drinks and predicted feeds into an ordered list of
//! planning moments and the single safe-to-feed instant:
//!
//! 1. Safe time = last drink + 2 h per standard drink + safety margin
//! 2. Seed the last feed before drinking (given, or one hour before start)
//! 3. One unsafe moment per drink
//! 4. Predicted feeds before the safe time are fed early when the gap allows,
//!    otherwise replaced by a bottle of stored milk
//! 5. Pumps keep the time since the breasts were last emptied bounded,
//!    sparse (minimal) or on a fixed cadence (conservative)
//! 6. Terminal safe moment, then sort by time
//!
//! The rolling "last emptied" anchor is carried through a fold over the
//! feeds in chronological order. Nothing here reads the clock.

use crate::catalog::BeverageCatalog;
use crate::time::{hours_to_ms, is_valid_epoch_ms, TimeInput, MAX_EPOCH_MS, MS_PER_HOUR, MS_PER_MINUTE};
use crate::types::{
    FeedPrediction, InputIssue, MomentKind, MomentStatus, PlannedDrink, PlanningMoment, Strategy,
};

/// Planning mode allows two hours per standard drink
pub const HOURS_PER_PLANNED_DRINK: f64 = 2.0;

/// Longest comfortable stretch without emptying (minimal strategy)
pub const MAX_COMFORT_MS: i64 = 5 * MS_PER_HOUR;

/// Pump cadence for the conservative strategy
pub const CONSERVATIVE_INTERVAL_MS: i64 = 150 * MS_PER_MINUTE;

/// No pump is placed closer than this to the safe time
pub const NEAR_SAFE_THRESHOLD_MS: i64 = 90 * MS_PER_MINUTE;

/// An early feed happens this long before the start of the evening
pub const FEED_EARLIER_LEAD_MS: i64 = 30 * MS_PER_MINUTE;

/// Minimum time between two breastfeeds
pub const MIN_FEED_GAP_MS: i64 = 2 * MS_PER_HOUR;

/// Upper bound on pumps in a single window
const MAX_PUMPS_PER_WINDOW: usize = 48;

/// Everything the planner needs for one computation
#[derive(Clone, Debug, PartialEq)]
pub struct PlanRequest {
    pub planned_drinks: Vec<PlannedDrink>,
    pub predicted_feeds: Vec<FeedPrediction>,
    /// Epoch ms at which the evening starts
    pub start_time: i64,
    pub last_feed_time: Option<TimeInput>,
    pub strategy: Strategy,
    pub safety_margin_minutes: i64,
}

impl PlanRequest {
    pub fn new(start_time: i64) -> Self {
        Self {
            planned_drinks: Vec::new(),
            predicted_feeds: Vec::new(),
            start_time,
            last_feed_time: None,
            strategy: Strategy::default(),
            safety_margin_minutes: 0,
        }
    }
}

/// Result of one planning run
#[derive(Clone, Debug, PartialEq)]
pub struct Plan {
    /// Sorted by time, see [`sort_moments`]
    pub moments: Vec<PlanningMoment>,
    pub safe_feed_time: Option<i64>,
    /// Input that was dropped or defaulted
    pub issues: Vec<InputIssue>,
}

impl Plan {
    fn empty(issues: Vec<InputIssue>) -> Self {
        Self {
            moments: Vec::new(),
            safe_feed_time: None,
            issues,
        }
    }

    pub fn pump_times(&self) -> Vec<i64> {
        self.moments
            .iter()
            .filter(|m| m.is_pump())
            .map(|m| m.time)
            .collect()
    }
}

#[derive(Clone, Debug)]
struct ValidDrink {
    drink_type_id: String,
    time: i64,
    amount: f64,
}

/// Build the plan for an evening
pub fn generate_plan(request: &PlanRequest, catalog: &BeverageCatalog) -> Plan {
    let mut issues = Vec::new();

    let drinks = normalize_drinks(&request.planned_drinks, &mut issues);
    if drinks.is_empty() {
        tracing::debug!("No usable planned drinks, empty plan");
        return Plan::empty(issues);
    }

    let margin_minutes = if request.safety_margin_minutes < 0 {
        issues.push(InputIssue::new(
            "safety_margin",
            None,
            format!("negative margin {} treated as 0", request.safety_margin_minutes),
        ));
        0
    } else {
        request.safety_margin_minutes
    };

    let Some(mut safe) = safe_feed_time(&drinks, catalog, margin_minutes) else {
        return Plan::empty(issues);
    };
    if safe > MAX_EPOCH_MS {
        issues.push(InputIssue::new(
            "safe_feed_time",
            None,
            "clearance runs past the supported range, clamped",
        ));
        safe = MAX_EPOCH_MS;
    }

    let start = resolve_start(request, &drinks, &mut issues);
    let last_feed = resolve_last_feed(request, start, &mut issues);

    let mut moments = Vec::new();
    moments.push(PlanningMoment::new(
        MomentKind::Feed,
        last_feed.time,
        "Laatste voeding",
        if last_feed.synthetic {
            "Voed vlak voordat je begint met drinken"
        } else {
            "Laatste voeding voordat je begint met drinken"
        },
        MomentStatus::Safe,
    ));

    for drink in &drinks {
        let multiplier = catalog.multiplier(&drink.drink_type_id);
        moments.push(PlanningMoment::new(
            MomentKind::Drink {
                drink_type_id: drink.drink_type_id.clone(),
            },
            drink.time,
            catalog.label(&drink.drink_type_id),
            format!(
                "{} glas ({:.1} standaardglas)",
                format_amount(drink.amount),
                drink.amount * multiplier
            ),
            MomentStatus::Unsafe,
        ));
    }

    let feeds = normalize_feeds(&request.predicted_feeds, last_feed.time, &mut issues);
    let (before_safe, after_safe): (Vec<&FeedPrediction>, Vec<&FeedPrediction>) =
        feeds.iter().partition(|f| f.time < safe);

    let ctx = Context {
        start,
        safe,
        strategy: request.strategy,
    };

    let sequencer = before_safe.into_iter().fold(
        Sequencer::new(&ctx, last_feed.time),
        Sequencer::absorb_feed,
    );
    let sequencer = after_safe
        .into_iter()
        .fold(sequencer.trailing_pumps(), Sequencer::absorb_feed);

    moments.extend(sequencer.moments);
    moments.push(PlanningMoment::new(
        MomentKind::Safe,
        safe,
        "Veilig om te voeden",
        "Vanaf nu kun je weer borstvoeding geven",
        MomentStatus::Safe,
    ));

    sort_moments(&mut moments);

    tracing::info!(
        "Generated {:?} plan: {} moments, {} drinks, safe at {}",
        request.strategy,
        moments.len(),
        drinks.len(),
        crate::time::to_iso(safe)
    );

    Plan {
        moments,
        safe_feed_time: Some(safe),
        issues,
    }
}

/// Sort by time; ties go drink < feed < pump < safe, then by label and
/// description so the order never depends on input order.
pub fn sort_moments(moments: &mut [PlanningMoment]) {
    moments.sort_by(|a, b| {
        (a.time, a.kind.sort_rank(), &a.label, &a.description)
            .cmp(&(b.time, b.kind.sort_rank(), &b.label, &b.description))
    });
}

fn normalize_drinks(planned: &[PlannedDrink], issues: &mut Vec<InputIssue>) -> Vec<ValidDrink> {
    let mut drinks = Vec::with_capacity(planned.len());
    for drink in planned {
        let Some(time) = drink.time.to_epoch_ms() else {
            issues.push(InputIssue::new(
                "planned_drink",
                Some(drink.id.clone()),
                format!("unparseable time {:?}", drink.time),
            ));
            continue;
        };
        let amount = drink.glasses();
        if !(amount.is_finite() && amount > 0.0) {
            issues.push(InputIssue::new(
                "planned_drink",
                Some(drink.id.clone()),
                format!("amount {} is not a positive number", amount),
            ));
            continue;
        }
        drinks.push(ValidDrink {
            drink_type_id: drink.drink_type_id.clone(),
            time,
            amount,
        });
    }
    // Canonical order keeps the floating-point sum identical for any
    // permutation of the same drinks.
    drinks.sort_by(|a, b| {
        a.time
            .cmp(&b.time)
            .then_with(|| a.drink_type_id.cmp(&b.drink_type_id))
            .then_with(|| a.amount.total_cmp(&b.amount))
    });
    drinks
}

fn normalize_feeds(
    feeds: &[FeedPrediction],
    last_feed: i64,
    issues: &mut Vec<InputIssue>,
) -> Vec<FeedPrediction> {
    let mut usable: Vec<FeedPrediction> = feeds
        .iter()
        .filter(|f| {
            if !is_valid_epoch_ms(f.time) {
                issues.push(InputIssue::new(
                    "feed",
                    Some(f.time.to_string()),
                    "time out of range",
                ));
                return false;
            }
            if f.time <= last_feed {
                tracing::debug!("Skipping feed at {} not after the last feed", f.time);
                return false;
            }
            if !f.amount_ml.is_finite() {
                issues.push(InputIssue::new(
                    "feed",
                    Some(crate::time::to_iso(f.time)),
                    "amount is not a number",
                ));
                return false;
            }
            true
        })
        .cloned()
        .collect();
    usable.sort_by_key(|f| f.time);
    usable
}

/// Safe-to-feed instant for the given drinks, `None` when there are none
fn safe_feed_time(drinks: &[ValidDrink], catalog: &BeverageCatalog, margin_minutes: i64) -> Option<i64> {
    let last_drink = drinks.iter().map(|d| d.time).max()?;
    let total_standard_drinks: f64 = drinks
        .iter()
        .map(|d| d.amount * catalog.multiplier(&d.drink_type_id))
        .sum();
    let clearance_ms = hours_to_ms(total_standard_drinks * HOURS_PER_PLANNED_DRINK);
    let margin_ms = margin_minutes.saturating_mul(MS_PER_MINUTE);

    tracing::debug!(
        "{:.2} standard drinks, {:.2} h clearance after last drink",
        total_standard_drinks,
        total_standard_drinks * HOURS_PER_PLANNED_DRINK
    );

    Some(last_drink.saturating_add(clearance_ms).saturating_add(margin_ms))
}

struct LastFeed {
    time: i64,
    synthetic: bool,
}

/// The requested start, or the first drink when the start is out of range
fn resolve_start(request: &PlanRequest, drinks: &[ValidDrink], issues: &mut Vec<InputIssue>) -> i64 {
    if is_valid_epoch_ms(request.start_time) {
        return request.start_time;
    }
    let first_drink = drinks.iter().map(|d| d.time).min().unwrap_or(MAX_EPOCH_MS);
    issues.push(InputIssue::new(
        "start_time",
        None,
        format!(
            "{} out of range, starting at the first drink",
            request.start_time
        ),
    ));
    first_drink
}

fn resolve_last_feed(request: &PlanRequest, start: i64, issues: &mut Vec<InputIssue>) -> LastFeed {
    if let Some(input) = &request.last_feed_time {
        match input.to_epoch_ms() {
            Some(time) => return LastFeed { time, synthetic: false },
            None => issues.push(InputIssue::new(
                "last_feed_time",
                None,
                format!("unparseable time {:?}, assuming one hour before start", input),
            )),
        }
    }
    LastFeed {
        time: start.saturating_sub(MS_PER_HOUR),
        synthetic: true,
    }
}

struct Context {
    start: i64,
    safe: i64,
    strategy: Strategy,
}

/// Fold state while walking the feeds in time order
struct Sequencer<'a> {
    ctx: &'a Context,
    /// Last time the breasts were emptied (breastfeed or pump)
    last_empty: i64,
    /// Last breastfeed
    last_feed: i64,
    moments: Vec<PlanningMoment>,
}

impl<'a> Sequencer<'a> {
    fn new(ctx: &'a Context, last_feed: i64) -> Self {
        Self {
            ctx,
            last_empty: last_feed,
            last_feed,
            moments: Vec::new(),
        }
    }

    fn absorb_feed(mut self, feed: &FeedPrediction) -> Self {
        let ctx = self.ctx;

        if feed.time >= ctx.safe {
            self.moments.push(PlanningMoment::new(
                MomentKind::Feed,
                feed.time,
                "Baby voeding",
                "Gewone borstvoeding",
                MomentStatus::Safe,
            ));
            self.last_empty = self.last_empty.max(feed.time);
            self.last_feed = self.last_feed.max(feed.time);
            return self;
        }

        let earlier = ctx.start - FEED_EARLIER_LEAD_MS;
        if earlier - self.last_feed >= MIN_FEED_GAP_MS && feed.time - earlier >= FEED_EARLIER_LEAD_MS
        {
            self.moments.push(PlanningMoment::new(
                MomentKind::Feed,
                earlier,
                "Voed eerder",
                "Geef deze voeding vlak voor het eerste drankje",
                MomentStatus::Safe,
            ));
            self.last_empty = self.last_empty.max(earlier);
            self.last_feed = earlier;
            return self;
        }

        // Under the minimal strategy a bottle leaves the breasts full, so
        // `last_empty` stays where it was.
        self.moments.push(PlanningMoment::new(
            MomentKind::Feed,
            feed.time,
            "Flesje geven",
            "Geef afgekolfde melk uit de voorraad",
            MomentStatus::Warning,
        ));

        if ctx.strategy == Strategy::Conservative {
            let pumps = schedule_conservative_pumps(self.last_empty, feed.time, ctx.safe);
            self.last_empty = self.last_empty.max(pumps.last().copied().unwrap_or(feed.time));
            self.push_pumps(pumps);
        }

        self
    }

    /// Pumps between the last emptying and the safe time
    fn trailing_pumps(mut self) -> Self {
        let ctx = self.ctx;
        if self.last_empty >= ctx.safe {
            return self;
        }
        let pumps = match ctx.strategy {
            Strategy::Minimal => schedule_strategic_pumps(self.last_empty, ctx.safe),
            Strategy::Conservative => {
                schedule_conservative_pumps(self.last_empty, ctx.safe, ctx.safe)
            }
        };
        if let Some(&last) = pumps.last() {
            self.last_empty = last;
        }
        self.push_pumps(pumps);
        self
    }

    fn push_pumps(&mut self, pumps: Vec<i64>) {
        for time in pumps {
            self.moments.push(PlanningMoment::new(
                MomentKind::Pump,
                time,
                "Kolven",
                "Kolf af en gooi de melk weg",
                MomentStatus::Warning,
            ));
        }
    }
}

/// Minimal strategy: as few pumps as the 5-hour comfort ceiling allows.
///
/// A pump that would land within 90 minutes of the safe time is replaced by
/// one exactly 90 minutes before it, and the walk stops there.
pub fn schedule_strategic_pumps(last_empty: i64, safe_feed_time: i64) -> Vec<i64> {
    let mut pumps = Vec::new();
    if safe_feed_time.saturating_sub(last_empty) <= MAX_COMFORT_MS {
        return pumps;
    }

    let mut candidate = last_empty.saturating_add(MAX_COMFORT_MS);
    while candidate < safe_feed_time && pumps.len() < MAX_PUMPS_PER_WINDOW {
        if safe_feed_time.saturating_sub(candidate) < NEAR_SAFE_THRESHOLD_MS {
            let fallback = safe_feed_time.saturating_sub(NEAR_SAFE_THRESHOLD_MS);
            if fallback > pumps.last().copied().unwrap_or(last_empty) {
                pumps.push(fallback);
            }
            break;
        }
        pumps.push(candidate);
        candidate = candidate.saturating_add(MAX_COMFORT_MS);
    }

    if pumps.len() == MAX_PUMPS_PER_WINDOW {
        tracing::warn!("Pump window truncated at {} pumps", MAX_PUMPS_PER_WINDOW);
    }
    pumps
}

/// Conservative strategy: a pump every 2.5 hours strictly between `from` and
/// `to`, skipping any within 90 minutes of the safe time.
pub fn schedule_conservative_pumps(from: i64, to: i64, safe_feed_time: i64) -> Vec<i64> {
    let mut pumps = Vec::new();
    let mut candidate = from.saturating_add(CONSERVATIVE_INTERVAL_MS);
    while candidate < to && pumps.len() < MAX_PUMPS_PER_WINDOW {
        if safe_feed_time.saturating_sub(candidate).saturating_abs() >= NEAR_SAFE_THRESHOLD_MS {
            pumps.push(candidate);
        }
        candidate = candidate.saturating_add(CONSERVATIVE_INTERVAL_MS);
    }

    if pumps.len() == MAX_PUMPS_PER_WINDOW {
        tracing::warn!("Pump window truncated at {} pumps", MAX_PUMPS_PER_WINDOW);
    }
    pumps
}

fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("{}", amount as i64)
    } else {
        format!("{:.1}", amount)
    }
}
