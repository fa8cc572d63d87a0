//! Persisted plan shape and its storage.
//!
//! Plans are stored as camelCase JSON so the app's storage layer can read
//! them unchanged. Every instant is written as ISO-8601 with millisecond
//! precision; on the way in both ISO strings and epoch-ms numbers are
//! accepted. Saving takes an exclusive lock and renames a temp file over the
//! target.

use crate::planner::{Plan, PlanRequest};
use crate::time::{to_iso, TimeInput};
use crate::types::{InputIssue, MomentKind, MomentStatus, PlannedDrink, PlanningMoment, Strategy};
use crate::{Error, Result};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PersistedDrink {
    pub id: String,
    #[serde(rename = "type")]
    pub drink_type_id: String,
    pub time: TimeInput,
    #[serde(default)]
    pub amount: Option<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PersistedMoment {
    #[serde(rename = "type")]
    pub moment_type: String,
    pub time: TimeInput,
    pub label: String,
    pub description: String,
    pub status: MomentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drink_type_id: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PersistedPlan {
    pub planned_drinks: Vec<PersistedDrink>,
    pub selected_date: TimeInput,
    pub start_time: TimeInput,
    pub safe_feed_time: Option<TimeInput>,
    pub last_feed_time: Option<TimeInput>,
    pub feed_duration_min: u32,
    pub strategy: Strategy,
    pub generated_at: TimeInput,
    pub planning_moments: Vec<PersistedMoment>,
}

impl From<&PlanningMoment> for PersistedMoment {
    fn from(moment: &PlanningMoment) -> Self {
        let drink_type_id = match &moment.kind {
            MomentKind::Drink { drink_type_id } => Some(drink_type_id.clone()),
            _ => None,
        };
        PersistedMoment {
            moment_type: moment.kind.type_name().to_string(),
            time: TimeInput::iso(moment.time),
            label: moment.label.clone(),
            description: moment.description.clone(),
            status: moment.status,
            drink_type_id,
        }
    }
}

impl PersistedMoment {
    fn to_moment(&self) -> std::result::Result<PlanningMoment, String> {
        let time = self
            .time
            .to_epoch_ms()
            .ok_or_else(|| format!("unparseable time {:?}", self.time))?;
        let kind = match self.moment_type.as_str() {
            "drink" => MomentKind::Drink {
                drink_type_id: self
                    .drink_type_id
                    .clone()
                    .unwrap_or_else(|| crate::catalog::OTHER_ID.to_string()),
            },
            "feed" => MomentKind::Feed,
            "pump" => MomentKind::Pump,
            "safe" => MomentKind::Safe,
            other => return Err(format!("unknown moment type {:?}", other)),
        };
        Ok(PlanningMoment {
            kind,
            time,
            label: self.label.clone(),
            description: self.description.clone(),
            status: self.status,
        })
    }
}

impl PersistedPlan {
    /// Capture a generated plan together with the request that produced it
    pub fn from_plan(
        request: &PlanRequest,
        plan: &Plan,
        selected_date: i64,
        feed_duration_min: u32,
        generated_at: i64,
    ) -> Self {
        let planned_drinks = request
            .planned_drinks
            .iter()
            .map(|d| PersistedDrink {
                id: d.id.clone(),
                drink_type_id: d.drink_type_id.clone(),
                time: normalize_time(&d.time),
                amount: Some(d.glasses()),
            })
            .collect();

        PersistedPlan {
            planned_drinks,
            selected_date: TimeInput::iso(selected_date),
            start_time: TimeInput::iso(request.start_time),
            safe_feed_time: plan.safe_feed_time.map(TimeInput::iso),
            last_feed_time: request.last_feed_time.as_ref().map(normalize_time),
            feed_duration_min,
            strategy: request.strategy,
            generated_at: TimeInput::iso(generated_at),
            planning_moments: plan.moments.iter().map(PersistedMoment::from).collect(),
        }
    }

    /// Rebuild the moment list; unreadable moments are dropped and reported
    pub fn to_moments(&self) -> (Vec<PlanningMoment>, Vec<InputIssue>) {
        let mut issues = Vec::new();
        let mut moments = Vec::with_capacity(self.planning_moments.len());
        for (idx, stored) in self.planning_moments.iter().enumerate() {
            match stored.to_moment() {
                Ok(moment) => moments.push(moment),
                Err(reason) => issues.push(InputIssue::new(
                    "planning_moment",
                    Some(idx.to_string()),
                    reason,
                )),
            }
        }
        (moments, issues)
    }

    /// Planner input for recomputing this plan.
    ///
    /// Feeds and the safety margin are not part of the stored shape, so the
    /// caller supplies the current ones.
    pub fn to_request(
        &self,
        predicted_feeds: Vec<crate::FeedPrediction>,
        safety_margin_minutes: i64,
    ) -> Result<PlanRequest> {
        let start_time = self.start_time.to_epoch_ms().ok_or_else(|| {
            Error::Input(format!("stored plan has unparseable startTime {:?}", self.start_time))
        })?;

        Ok(PlanRequest {
            planned_drinks: self
                .planned_drinks
                .iter()
                .map(|d| PlannedDrink {
                    id: d.id.clone(),
                    drink_type_id: d.drink_type_id.clone(),
                    time: d.time.clone(),
                    amount: d.amount,
                })
                .collect(),
            predicted_feeds,
            start_time,
            last_feed_time: self.last_feed_time.clone(),
            strategy: self.strategy,
            safety_margin_minutes,
        })
    }

    pub fn safe_feed_time_ms(&self) -> Option<i64> {
        self.safe_feed_time.as_ref().and_then(TimeInput::to_epoch_ms)
    }

    /// Load a stored plan with shared locking.
    ///
    /// Returns `None` if the file doesn't exist or cannot be parsed.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            tracing::info!("No stored plan at {:?}", path);
            return Ok(None);
        }

        let file = File::open(path)?;
        file.lock_shared()?;

        let mut contents = String::new();
        let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
        file.unlock()?;
        read?;

        match serde_json::from_str::<PersistedPlan>(&contents) {
            Ok(plan) => {
                tracing::debug!("Loaded plan from {:?}", path);
                Ok(Some(plan))
            }
            Err(e) => {
                tracing::warn!("Failed to parse plan file {:?}: {}. Ignoring it.", path, e);
                Ok(None)
            }
        }
    }

    /// Save atomically: temp file, sync, rename over the original
    pub fn save(&self, path: &Path) -> Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| Error::Other(format!("plan path {:?} has no parent", path)))?;
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string_pretty(self)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;
        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved plan to {:?}", path);
        Ok(())
    }
}

/// Parseable instants become ISO strings; anything else is kept verbatim
fn normalize_time(input: &TimeInput) -> TimeInput {
    match input.to_epoch_ms() {
        Some(ms) => TimeInput::Text(to_iso(ms)),
        None => input.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::get_default_catalog;
    use crate::planner::generate_plan;
    use crate::time::{parse_iso, MS_PER_HOUR};
    use crate::types::FeedPrediction;

    fn sample() -> (PlanRequest, Plan) {
        let start = parse_iso("2026-10-18T20:00:00Z").unwrap();
        let mut request = PlanRequest::new(start);
        request.strategy = Strategy::Conservative;
        request.planned_drinks = vec![
            PlannedDrink::new("wine", start).with_amount(2.0),
            PlannedDrink::new("beer", "2026-10-18T21:15:00Z"),
        ];
        request.predicted_feeds = vec![FeedPrediction::manual(start + 2 * MS_PER_HOUR, 120.0)];
        let plan = generate_plan(&request, get_default_catalog());
        (request, plan)
    }

    #[test]
    fn test_json_shape() {
        let (request, plan) = sample();
        let stored = PersistedPlan::from_plan(&request, &plan, request.start_time, 20, request.start_time);
        let json: serde_json::Value = serde_json::to_value(&stored).unwrap();

        assert_eq!(json["strategy"], "conservative");
        assert_eq!(json["startTime"], "2026-10-18T20:00:00.000Z");
        assert_eq!(json["plannedDrinks"][0]["type"], "wine");
        assert_eq!(json["plannedDrinks"][1]["time"], "2026-10-18T21:15:00.000Z");
        assert_eq!(json["lastFeedTime"], serde_json::Value::Null);
        assert_eq!(json["feedDurationMin"], 20);
        assert_eq!(json["planningMoments"][1]["type"], "drink");
        assert_eq!(json["planningMoments"][1]["drinkTypeId"], "wine");
        assert!(json["planningMoments"][0].get("drinkTypeId").is_none());
    }

    #[test]
    fn test_moments_survive_round_trip() {
        let (request, plan) = sample();
        let stored = PersistedPlan::from_plan(&request, &plan, request.start_time, 20, request.start_time);

        let text = serde_json::to_string(&stored).unwrap();
        let parsed: PersistedPlan = serde_json::from_str(&text).unwrap();
        let (moments, issues) = parsed.to_moments();

        assert!(issues.is_empty());
        assert_eq!(moments, plan.moments);
        assert_eq!(parsed.safe_feed_time_ms(), plan.safe_feed_time);
    }

    #[test]
    fn test_reload_recomputes_same_plan() {
        let (request, plan) = sample();
        let stored = PersistedPlan::from_plan(&request, &plan, request.start_time, 20, request.start_time);

        let reloaded = stored
            .to_request(request.predicted_feeds.clone(), request.safety_margin_minutes)
            .unwrap();
        let again = generate_plan(&reloaded, get_default_catalog());
        assert_eq!(again.moments, plan.moments);
    }

    #[test]
    fn test_accepts_epoch_numbers_and_drops_bad_moments() {
        let json = r#"{
            "plannedDrinks": [{"id": "a", "type": "beer", "time": 1792353600000, "amount": 1}],
            "selectedDate": "2026-10-18T00:00:00Z",
            "startTime": 1792353600000,
            "safeFeedTime": null,
            "lastFeedTime": null,
            "feedDurationMin": 15,
            "strategy": "minimal",
            "generatedAt": "2026-10-18T18:00:00Z",
            "planningMoments": [
                {"type": "drink", "time": 1792353600000, "label": "Bier", "description": "", "status": "unsafe", "drinkTypeId": "beer"},
                {"type": "party", "time": 1792353600000, "label": "?", "description": "", "status": "safe"},
                {"type": "pump", "time": "soon", "label": "Kolven", "description": "", "status": "warning"}
            ]
        }"#;
        let stored: PersistedPlan = serde_json::from_str(json).unwrap();
        let (moments, issues) = stored.to_moments();
        assert_eq!(moments.len(), 1);
        assert_eq!(issues.len(), 2);

        let request = stored.to_request(vec![], 0).unwrap();
        assert_eq!(request.start_time, parse_iso("2026-10-18T20:00:00Z").unwrap());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("plan.json");
        let (request, plan) = sample();
        let stored = PersistedPlan::from_plan(&request, &plan, request.start_time, 20, request.start_time);

        stored.save(&path).unwrap();
        let loaded = PersistedPlan::load(&path).unwrap().unwrap();
        assert_eq!(loaded, stored);

        // Only plan.json remains, no stray temp files
        let extras: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name() != "plan.json")
            .collect();
        assert!(extras.is_empty(), "found extras: {:?}", extras);
    }

    #[test]
    fn test_load_missing_or_corrupt_is_none() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("plan.json");
        assert!(PersistedPlan::load(&path).unwrap().is_none());

        std::fs::write(&path, "{ not json").unwrap();
        assert!(PersistedPlan::load(&path).unwrap().is_none());
    }
}
