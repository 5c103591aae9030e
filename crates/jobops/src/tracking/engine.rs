//! Application tracking engine.
//!
//! Maintains the invariant that a job's `status`, `outcome`, and
//! `closed_at` always reflect its chronologically latest stage events,
//! across appends, in-place edits, and deletions of any event. Every
//! mutation ends with a full re-derivation from the event history.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::error::TrackingError;
use super::stage::{Outcome, Stage, StageInput};
use crate::db::stage_event_repo::{self, StageEventRow};
use crate::db::{job_repo, Database};

/// A stage event as exposed to callers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageEvent {
    pub id: String,
    pub job_id: String,
    pub from_stage: Option<String>,
    pub to_stage: String,
    pub title: String,
    pub occurred_at: i64,
    pub outcome: Option<String>,
    pub group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub created_at: String,
}

impl StageEvent {
    fn from_db(row: StageEventRow) -> Self {
        let metadata = row
            .metadata
            .as_deref()
            .and_then(|m| serde_json::from_str(m).ok());
        Self {
            id: row.id,
            job_id: row.job_id,
            from_stage: row.from_stage,
            to_stage: row.to_stage,
            title: row.title,
            occurred_at: row.occurred_at,
            outcome: row.outcome,
            group_id: row.group_id,
            metadata,
            created_at: row.created_at,
        }
    }
}

/// Parameters for `transition_stage`. Only `to_stage` is required.
#[derive(Debug, Default, Clone)]
pub struct TransitionRequest {
    /// Target stage, or the `no_change` sentinel.
    pub to_stage: String,
    /// Unix seconds; defaults to now.
    pub occurred_at: Option<i64>,
    /// Defaults to the resolved stage's label.
    pub title: Option<String>,
    pub outcome: Option<String>,
    pub group_id: Option<String>,
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Partial update for an existing stage event.
///
/// The double-`Option` on `outcome` distinguishes "leave untouched"
/// (`None`) from "clear" (`Some(None)`).
#[derive(Debug, Default, Clone)]
pub struct StageEventPatch {
    pub to_stage: Option<String>,
    pub title: Option<String>,
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
    pub outcome: Option<Option<String>>,
}

/// The stage-tracking engine. Cheap to clone; shares the database handle.
#[derive(Clone)]
pub struct TrackingEngine {
    db: Database,
}

impl TrackingEngine {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Appends a stage-transition event to a job and re-derives its
    /// status fields.
    ///
    /// The first event for a job also stamps `applied_at` and moves the
    /// job into the `applied` status. Two identical calls create two
    /// distinct events; there is no deduplication.
    pub fn transition_stage(
        &self,
        job_id: &str,
        req: TransitionRequest,
    ) -> Result<StageEvent, TrackingError> {
        job_repo::find_by_id(&self.db, job_id)?
            .ok_or_else(|| TrackingError::JobNotFound(job_id.to_string()))?;

        let input = StageInput::parse(&req.to_stage)
            .ok_or_else(|| TrackingError::InvalidStage(req.to_stage.clone()))?;
        let outcome = match &req.outcome {
            Some(raw) => Some(
                Outcome::parse(raw).ok_or_else(|| TrackingError::InvalidOutcome(raw.clone()))?,
            ),
            None => None,
        };

        let history = stage_event_repo::list_for_job(&self.db, job_id)?;
        let latest_stage = history.last().map(|e| e.to_stage.clone());

        // The sentinel annotates the timeline without moving the pipeline.
        let to_stage = match input {
            StageInput::Stage(stage) => stage.as_str().to_string(),
            StageInput::NoChange => latest_stage
                .clone()
                .unwrap_or_else(|| Stage::Applied.as_str().to_string()),
        };

        let occurred_at = req.occurred_at.unwrap_or_else(now_unix);
        let title = req.title.unwrap_or_else(|| {
            Stage::parse(&to_stage)
                .map(|s| s.label().to_string())
                .unwrap_or_else(|| to_stage.clone())
        });

        let now = Utc::now().to_rfc3339();
        let row = StageEventRow {
            id: Uuid::new_v4().to_string(),
            job_id: job_id.to_string(),
            from_stage: latest_stage,
            to_stage,
            title,
            occurred_at,
            outcome: outcome.map(|o| o.as_str().to_string()),
            group_id: req.group_id,
            metadata: req
                .metadata
                .map(|m| serde_json::Value::Object(m).to_string()),
            created_at: now.clone(),
        };
        stage_event_repo::insert(&self.db, &row)?;

        if history.is_empty() {
            job_repo::set_applied(&self.db, job_id, &rfc3339_from_unix(occurred_at), &now)?;
        }
        self.recompute(job_id)?;

        log::debug!(
            "Recorded stage event {} for job {} ({} -> {})",
            row.id,
            job_id,
            row.from_stage.as_deref().unwrap_or("-"),
            row.to_stage
        );

        Ok(StageEvent::from_db(row))
    }

    /// Applies a partial update to an event, then re-derives the owning
    /// job's status fields.
    ///
    /// A metadata-only patch leaves the stored outcome untouched.
    pub fn update_stage_event(
        &self,
        event_id: &str,
        patch: StageEventPatch,
    ) -> Result<(), TrackingError> {
        let mut event = stage_event_repo::find_by_id(&self.db, event_id)?
            .ok_or_else(|| TrackingError::EventNotFound(event_id.to_string()))?;

        if let Some(raw) = &patch.to_stage {
            let stage =
                Stage::parse(raw).ok_or_else(|| TrackingError::InvalidStage(raw.clone()))?;
            event.to_stage = stage.as_str().to_string();
        }
        if let Some(title) = patch.title {
            event.title = title;
        }
        if let Some(metadata) = patch.metadata {
            event.metadata = Some(serde_json::Value::Object(metadata).to_string());
        }
        if let Some(outcome) = &patch.outcome {
            event.outcome = match outcome {
                Some(raw) => Some(
                    Outcome::parse(raw)
                        .ok_or_else(|| TrackingError::InvalidOutcome(raw.clone()))?
                        .as_str()
                        .to_string(),
                ),
                None => None,
            };
        }

        stage_event_repo::update(&self.db, &event)?;
        self.recompute(&event.job_id)
    }

    /// Removes an event, then re-derives the owning job's status fields
    /// from the remaining history.
    pub fn delete_stage_event(&self, event_id: &str) -> Result<(), TrackingError> {
        let event = stage_event_repo::find_by_id(&self.db, event_id)?
            .ok_or_else(|| TrackingError::EventNotFound(event_id.to_string()))?;

        stage_event_repo::delete(&self.db, event_id)?;
        self.recompute(&event.job_id)
    }

    /// Returns the job's full event history in replay order. "Latest"
    /// everywhere in the engine means the last element of this sequence.
    pub fn get_stage_events(&self, job_id: &str) -> Result<Vec<StageEvent>, TrackingError> {
        job_repo::find_by_id(&self.db, job_id)?
            .ok_or_else(|| TrackingError::JobNotFound(job_id.to_string()))?;

        let rows = stage_event_repo::list_for_job(&self.db, job_id)?;
        Ok(rows.into_iter().map(StageEvent::from_db).collect())
    }

    /// Recomputes a job's derived fields from its full event history.
    ///
    /// Always a full rescan. Deriving incrementally from the prior
    /// derived state would drift after edits or deletes of non-latest
    /// events.
    fn recompute(&self, job_id: &str) -> Result<(), TrackingError> {
        let events = stage_event_repo::list_for_job(&self.db, job_id)?;
        let now = Utc::now().to_rfc3339();

        if events.is_empty() {
            // No event left to derive from. Status stays as-is; outcome
            // and closed_at are cleared.
            job_repo::update_derived(&self.db, job_id, None, None, None, &now)?;
            return Ok(());
        }

        // Outcome and closed_at stick to the latest outcome-bearing
        // event, even when later events without an outcome exist.
        let closing = events.iter().rev().find(|e| e.outcome.is_some());
        let outcome = closing.and_then(|e| e.outcome.as_deref());
        let closed_at = closing.map(|e| e.occurred_at);

        job_repo::update_derived(&self.db, job_id, Some("applied"), outcome, closed_at, &now)?;
        Ok(())
    }
}

fn now_unix() -> i64 {
    Utc::now().timestamp()
}

/// Converts Unix seconds to an RFC 3339 string, falling back to the
/// current time for out-of-range values.
fn rfc3339_from_unix(secs: i64) -> String {
    match DateTime::<Utc>::from_timestamp(secs, 0) {
        Some(dt) => dt.to_rfc3339(),
        None => {
            log::warn!("Timestamp {} out of range, using current time", secs);
            Utc::now().to_rfc3339()
        }
    }
}
