//! End-to-end tests for the sync pipeline, driving `SyncRunner` with an
//! in-memory inbox and a scripted classifier against an in-memory store.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::{fast_retry, FakeInbox, FakeMessage, ScriptedClassifier};
use jobtrail::db::{application_repo, processed_repo, Database};
use jobtrail::status::Status;
use jobtrail::sync::{SyncError, SyncOptions, SyncRunner};

fn options() -> SyncOptions {
    SyncOptions {
        retry: fast_retry(2),
        ..SyncOptions::default()
    }
}

fn runner(db: &Database, inbox: FakeInbox, classifier: ScriptedClassifier) -> SyncRunner {
    SyncRunner::new(db.clone(), Arc::new(inbox), Arc::new(classifier), options())
}

const ACME_REPLY: &str = "Company: Acme\nJob Title: Engineer\nLocation: Berlin\nStatus: Applied";
const BETA_REPLY: &str = "Company: Beta\nJob Title: Designer\nStatus: Applied";

#[tokio::test]
async fn test_creates_records_for_new_applications() {
    let db = Database::open_in_memory().unwrap();
    let inbox = FakeInbox::new(vec![
        FakeMessage::new("m1", "Thanks for applying to Acme", "acme body").in_thread("t-1"),
        FakeMessage::new("m2", "Your Beta application", "beta body"),
    ]);
    let classifier = ScriptedClassifier::new()
        .reply("acme body", ACME_REPLY)
        .reply("beta body", BETA_REPLY);

    let report = runner(&db, inbox, classifier).run().await.unwrap();
    assert_eq!(report.fetched, 2);
    assert_eq!(report.created, 2);
    assert_eq!(report.failed, 0);

    db.with_conn(|conn| {
        let records = application_repo::list_all(conn)?;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].company, "Acme");
        assert_eq!(records[0].location, "Berlin");
        assert_eq!(records[0].thread_id.as_deref(), Some("t-1"));
        assert_eq!(records[1].company, "Beta");
        assert_eq!(records[1].location, "Unknown");

        // Each creation logs an initial status transition.
        let changes = application_repo::status_changes_for(conn, records[0].id.unwrap())?;
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].old_status, None);
        assert_eq!(changes[0].new_status, Status::Applied);

        assert!(processed_repo::is_processed(conn, "m1")?);
        assert!(processed_repo::is_processed(conn, "m2")?);
        Ok(())
    })
    .unwrap();
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let db = Database::open_in_memory().unwrap();
    let message = || {
        FakeInbox::new(vec![FakeMessage::new(
            "m1",
            "Thanks for applying",
            "acme body",
        )])
    };
    let classifier = || ScriptedClassifier::new().reply("acme body", ACME_REPLY);

    let first = runner(&db, message(), classifier()).run().await.unwrap();
    assert_eq!(first.created, 1);

    let second = runner(&db, message(), classifier()).run().await.unwrap();
    assert_eq!(second.created, 0);
    assert_eq!(second.skipped, 1);

    db.with_conn(|conn| {
        assert_eq!(application_repo::count(conn)?, 1);
        Ok(())
    })
    .unwrap();
}

#[tokio::test]
async fn test_thread_reply_updates_status() {
    let db = Database::open_in_memory().unwrap();
    let inbox = FakeInbox::new(vec![
        FakeMessage::new("m1", "Thanks for applying", "acme body").in_thread("t-1"),
        FakeMessage::new("m2", "Update on your application", "decline body").in_thread("t-1"),
    ]);
    let classifier = ScriptedClassifier::new()
        .reply("acme body", ACME_REPLY)
        // Same thread, so the update wins despite the sparse extraction.
        .reply(
            "decline body",
            "Company: Acme\nJob Title: Unknown\nStatus: Declined",
        );

    let report = runner(&db, inbox, classifier).run().await.unwrap();
    assert_eq!(report.created, 1);
    assert_eq!(report.updated, 1);

    db.with_conn(|conn| {
        let records = application_repo::list_all(conn)?;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, Status::Declined);
        assert_eq!(records[0].job_title, "Engineer");

        // The persisted record is reachable through both correlation keys.
        let by_thread = application_repo::find_by_thread_id(conn, "t-1")?.unwrap();
        assert_eq!(by_thread.id, records[0].id);
        let by_key = application_repo::find_by_company_title(conn, "acme", "engineer")?.unwrap();
        assert_eq!(by_key.id, records[0].id);

        let changes = application_repo::status_changes_for(conn, records[0].id.unwrap())?;
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[1].old_status, Some(Status::Applied));
        assert_eq!(changes[1].new_status, Status::Declined);
        Ok(())
    })
    .unwrap();
}

#[tokio::test]
async fn test_same_status_reply_changes_nothing() {
    let db = Database::open_in_memory().unwrap();
    let inbox = FakeInbox::new(vec![
        FakeMessage::new("m1", "Thanks for applying", "acme body").in_thread("t-1"),
        FakeMessage::new("m2", "Receipt confirmation", "confirm body").in_thread("t-1"),
    ]);
    let classifier = ScriptedClassifier::new()
        .reply("acme body", ACME_REPLY)
        .reply("confirm body", ACME_REPLY);

    let report = runner(&db, inbox, classifier).run().await.unwrap();
    assert_eq!(report.created, 1);
    assert_eq!(report.unchanged, 1);

    db.with_conn(|conn| {
        assert_eq!(application_repo::count_status_changes(conn)?, 1);
        assert!(processed_repo::is_processed(conn, "m2")?);
        Ok(())
    })
    .unwrap();
}

#[tokio::test]
async fn test_irrelevant_message_marked_processed_without_record() {
    let db = Database::open_in_memory().unwrap();
    let inbox = FakeInbox::new(vec![FakeMessage::new(
        "m1",
        "Weekly newsletter",
        "newsletter body",
    )]);
    let classifier = ScriptedClassifier::new().irrelevant("Weekly newsletter");

    let report = runner(&db, inbox, classifier).run().await.unwrap();
    assert_eq!(report.not_job_related, 1);

    db.with_conn(|conn| {
        assert_eq!(application_repo::count(conn)?, 0);
        assert!(processed_repo::is_processed(conn, "m1")?);
        assert_eq!(processed_repo::count_job_related(conn)?, 0);
        Ok(())
    })
    .unwrap();
}

#[tokio::test]
async fn test_classifier_refusal_marked_processed() {
    let db = Database::open_in_memory().unwrap();
    // Passes the pre-filter but the extraction comes back with the refusal
    // sentinel (no scripted reply).
    let inbox = FakeInbox::new(vec![FakeMessage::new(
        "m1",
        "Your order has shipped",
        "shop body",
    )]);
    let classifier = ScriptedClassifier::new();

    let report = runner(&db, inbox, classifier).run().await.unwrap();
    assert_eq!(report.not_job_related, 1);

    db.with_conn(|conn| {
        assert_eq!(application_repo::count(conn)?, 0);
        assert!(processed_repo::is_processed(conn, "m1")?);
        Ok(())
    })
    .unwrap();
}

#[tokio::test]
async fn test_poisoned_message_skipped_after_retries() {
    let db = Database::open_in_memory().unwrap();
    let inbox = FakeInbox::new(vec![
        FakeMessage::new("m1", "Rate limited forever", "poison body"),
        FakeMessage::new("m2", "Thanks for applying", "acme body"),
    ]);
    let classifier = ScriptedClassifier::new()
        .failing("poison body")
        .reply("acme body", ACME_REPLY);

    let report = runner(&db, inbox, classifier).run().await.unwrap();
    assert_eq!(report.failed, 1);
    assert_eq!(report.created, 1);

    db.with_conn(|conn| {
        // The poisoned message is marked so later runs never reclassify it.
        assert!(processed_repo::is_processed(conn, "m1")?);
        assert_eq!(processed_repo::count_job_related(conn)?, 1);
        assert_eq!(application_repo::count(conn)?, 1);
        Ok(())
    })
    .unwrap();
}

#[tokio::test]
async fn test_transient_preview_failure_does_not_block_run() {
    let db = Database::open_in_memory().unwrap();
    let inbox = FakeInbox::new(vec![
        FakeMessage::new("m1", "unreachable", "never classified"),
        FakeMessage::new("m2", "Thanks for applying", "acme body"),
    ])
    .with_failing_preview("m1");
    let classifier = ScriptedClassifier::new().reply("acme body", ACME_REPLY);

    let report = runner(&db, inbox, classifier).run().await.unwrap();
    assert_eq!(report.failed, 1);
    assert_eq!(report.created, 1);
}

#[tokio::test]
async fn test_interruption_persists_partial_progress() {
    let db = Database::open_in_memory().unwrap();
    let inbox = Arc::new(FakeInbox::new(vec![
        FakeMessage::new("m1", "Thanks for applying", "acme body"),
        FakeMessage::new("m2", "Your Beta application", "beta body"),
        FakeMessage::new("m3", "Another one", "beta body"),
    ]));
    let classifier = ScriptedClassifier::new()
        .reply("acme body", ACME_REPLY)
        .reply("beta body", BETA_REPLY);

    let runner = SyncRunner::new(db.clone(), inbox.clone(), Arc::new(classifier), options());
    // The flag is raised while the first message is being previewed.
    inbox.set_cancel_after(1, runner.cancel_flag());
    assert!(!runner.cancel_flag().load(Ordering::SeqCst));

    let report = runner.run().await.unwrap();

    // Message 1 finishes (cancellation is cooperative), the rest are left
    // for the next run.
    assert_eq!(report.created, 1);
    db.with_conn(|conn| {
        assert_eq!(application_repo::count(conn)?, 1);
        assert!(processed_repo::is_processed(conn, "m1")?);
        assert!(!processed_repo::is_processed(conn, "m2")?);
        assert!(!processed_repo::is_processed(conn, "m3")?);
        Ok(())
    })
    .unwrap();
}

#[tokio::test]
async fn test_listing_failure_aborts_run() {
    let db = Database::open_in_memory().unwrap();
    let inbox = FakeInbox::new(vec![]).with_failing_listing();
    let classifier = ScriptedClassifier::new();

    let err = runner(&db, inbox, classifier).run().await.unwrap_err();
    assert!(matches!(err, SyncError::Fetch(_)));
}

#[tokio::test]
async fn test_concurrent_run_is_rejected() {
    let db = Database::open_in_memory().unwrap();
    let holder = jobtrail::db::lock::acquire(&db, "other-run")
        .unwrap()
        .expect("lock free");

    let inbox = FakeInbox::new(vec![]);
    let classifier = ScriptedClassifier::new();
    let err = runner(&db, inbox, classifier).run().await.unwrap_err();
    assert!(matches!(err, SyncError::StoreLocked));

    holder.release().unwrap();
    let inbox = FakeInbox::new(vec![]);
    let classifier = ScriptedClassifier::new();
    assert!(runner(&db, inbox, classifier).run().await.is_ok());
}

#[tokio::test]
async fn test_max_messages_bounds_the_run() {
    let db = Database::open_in_memory().unwrap();
    let inbox = FakeInbox::new(vec![
        FakeMessage::new("m1", "Thanks for applying", "acme body"),
        FakeMessage::new("m2", "Your Beta application", "beta body"),
    ]);
    let classifier = ScriptedClassifier::new()
        .reply("acme body", ACME_REPLY)
        .reply("beta body", BETA_REPLY);

    let mut opts = options();
    opts.max_messages = 1;
    let runner = SyncRunner::new(db.clone(), Arc::new(inbox), Arc::new(classifier), opts);
    let report = runner.run().await.unwrap();
    assert_eq!(report.fetched, 1);
    assert_eq!(report.created, 1);
}
