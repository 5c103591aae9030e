//! End-to-end tests for the stage-tracking engine and its scheduler
//! integration, exercised through the public API only.

use std::sync::Arc;

use jobops::db::job_repo::{self, JobRow};
use jobops::{
    BackupManager, BackupTask, DailyScheduler, Database, StageEventPatch, TrackingEngine,
    TransitionRequest,
};

fn new_engine() -> (TrackingEngine, Database, String) {
    let db = Database::open_in_memory().expect("in-memory database");
    let job = JobRow::new("Acme", "Backend Engineer");
    let job_id = job.id.clone();
    job_repo::insert(&db, &job).unwrap();
    (TrackingEngine::new(db.clone()), db, job_id)
}

fn transition(
    engine: &TrackingEngine,
    job_id: &str,
    to_stage: &str,
    occurred_at: i64,
    outcome: Option<&str>,
) -> jobops::StageEvent {
    engine
        .transition_stage(
            job_id,
            TransitionRequest {
                to_stage: to_stage.to_string(),
                occurred_at: Some(occurred_at),
                outcome: outcome.map(|o| o.to_string()),
                ..Default::default()
            },
        )
        .unwrap()
}

#[test]
fn test_full_application_lifecycle() {
    let (engine, db, job_id) = new_engine();

    transition(&engine, &job_id, "applied", 1000, None);
    transition(&engine, &job_id, "recruiter_screen", 2000, None);
    let closing = transition(&engine, &job_id, "closed", 3000, Some("rejected"));

    let job = job_repo::find_by_id(&db, &job_id).unwrap().unwrap();
    assert_eq!(job.status, "applied");
    assert_eq!(job.outcome.as_deref(), Some("rejected"));
    assert_eq!(job.closed_at, Some(3000));
    assert_eq!(job.applied_at.as_deref(), Some("1970-01-01T00:16:40+00:00"));

    let events = engine.get_stage_events(&job_id).unwrap();
    assert_eq!(events.len(), 3);
    assert_eq!(events[0].from_stage, None);
    assert_eq!(events[1].from_stage.as_deref(), Some("applied"));
    assert_eq!(events[2].from_stage.as_deref(), Some("recruiter_screen"));

    // Deleting the closing event reopens the application.
    engine.delete_stage_event(&closing.id).unwrap();
    let job = job_repo::find_by_id(&db, &job_id).unwrap().unwrap();
    assert_eq!(job.status, "applied");
    assert_eq!(job.outcome, None);
    assert_eq!(job.closed_at, None);
    assert_eq!(engine.get_stage_events(&job_id).unwrap().len(), 2);
}

#[test]
fn test_editing_mid_history_rederives_latest() {
    let (engine, db, job_id) = new_engine();

    transition(&engine, &job_id, "applied", 1000, None);
    let mid = transition(&engine, &job_id, "onsite", 2000, None);
    transition(&engine, &job_id, "offer", 3000, None);

    // Giving a non-latest event an outcome must not win over later
    // outcome-less events for status, but it is the only outcome-bearing
    // event, so outcome/closed_at stick to it.
    engine
        .update_stage_event(
            &mid.id,
            StageEventPatch {
                outcome: Some(Some("withdrawn".to_string())),
                ..Default::default()
            },
        )
        .unwrap();

    let job = job_repo::find_by_id(&db, &job_id).unwrap().unwrap();
    assert_eq!(job.status, "applied");
    assert_eq!(job.outcome.as_deref(), Some("withdrawn"));
    assert_eq!(job.closed_at, Some(2000));

    // Clearing it again reopens the application.
    engine
        .update_stage_event(
            &mid.id,
            StageEventPatch {
                outcome: Some(None),
                ..Default::default()
            },
        )
        .unwrap();
    let job = job_repo::find_by_id(&db, &job_id).unwrap().unwrap();
    assert_eq!(job.outcome, None);
    assert_eq!(job.closed_at, None);
}

#[test]
fn test_two_jobs_track_independently() {
    let (engine, db, job_a) = new_engine();
    let other = JobRow::new("Globex", "Platform Engineer");
    let job_b = other.id.clone();
    job_repo::insert(&db, &other).unwrap();

    transition(&engine, &job_a, "applied", 1000, None);
    transition(&engine, &job_b, "applied", 1000, None);
    transition(&engine, &job_b, "closed", 2000, Some("withdrawn"));

    let a = job_repo::find_by_id(&db, &job_a).unwrap().unwrap();
    let b = job_repo::find_by_id(&db, &job_b).unwrap().unwrap();
    assert_eq!(a.outcome, None);
    assert_eq!(b.outcome.as_deref(), Some("withdrawn"));
    assert_eq!(engine.get_stage_events(&job_a).unwrap().len(), 1);
    assert_eq!(engine.get_stage_events(&job_b).unwrap().len(), 2);
}

#[test]
fn test_persisted_state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("jobops.db");

    let job_id = {
        let db = Database::open(&path).unwrap();
        let engine = TrackingEngine::new(db.clone());
        let job = JobRow::new("Acme", "Backend Engineer");
        let job_id = job.id.clone();
        job_repo::insert(&db, &job).unwrap();
        transition(&engine, &job_id, "applied", 1000, None);
        transition(&engine, &job_id, "closed", 2000, Some("offer_accepted"));
        job_id
    };

    let db = Database::open(&path).unwrap();
    let engine = TrackingEngine::new(db.clone());
    let job = job_repo::find_by_id(&db, &job_id).unwrap().unwrap();
    assert_eq!(job.status, "applied");
    assert_eq!(job.outcome.as_deref(), Some("offer_accepted"));
    assert_eq!(job.closed_at, Some(2000));
    assert_eq!(engine.get_stage_events(&job_id).unwrap().len(), 2);
}

#[test]
fn test_scheduled_backup_wiring() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open_in_memory().unwrap();
    let manager = Arc::new(BackupManager::new(
        db,
        dir.path().join("backups"),
        7,
    ));
    let scheduler = DailyScheduler::new(Arc::new(BackupTask::new(manager)));

    scheduler.start(3).unwrap();
    assert!(scheduler.is_running());

    // Manual trigger runs the backup task out of band.
    assert!(scheduler.trigger_now());
    let backup_dir = dir.path().join("backups");
    let mut created = false;
    for _ in 0..100 {
        if backup_dir.exists() && std::fs::read_dir(&backup_dir).unwrap().count() == 1 {
            created = true;
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(10));
    }
    assert!(created, "backup file was not created");
    assert!(scheduler.is_running());

    scheduler.stop();
    assert!(!scheduler.is_running());
    assert_eq!(scheduler.next_run(), None);
}
