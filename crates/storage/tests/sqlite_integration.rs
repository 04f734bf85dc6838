use progress_core::keys;
use progress_core::model::{
    BatchId, BatchUserAggregate, ContentId, ContentProgressRecord, CourseEnrollment, CourseId,
    ProcessingStatus, ProgressStatus, RecordId, UserId,
};
use progress_core::time::fixed_now;
use storage::repository::{
    AggregateRepository, EnrollmentRepository, ProgressRepository, Storage, StorageError,
};
use storage::sqlite::SqliteRepository;

fn build_record(content: &str, version: u64) -> ContentProgressRecord {
    let user_id = UserId::new("u1");
    let content_id = ContentId::new(content);
    let course_id = CourseId::new("course1");
    let batch_id = BatchId::new("b1");
    ContentProgressRecord {
        id: keys::content_progress_key(&user_id, &content_id, &course_id, &batch_id),
        user_id,
        content_id,
        course_id,
        batch_id,
        status: ProgressStatus::Started,
        progress: 40,
        view_count: u32::try_from(version).unwrap(),
        completed_count: 0,
        last_access_time: Some(fixed_now()),
        last_completed_time: None,
        last_updated_time: fixed_now(),
        version,
    }
}

fn build_enrollment() -> CourseEnrollment {
    let user_id = UserId::new("u1");
    let course_id = CourseId::new("course1");
    let batch_id = BatchId::new("b1");
    CourseEnrollment {
        id: keys::enrollment_key(&user_id, &course_id, &batch_id),
        user_id,
        course_id,
        batch_id,
        course_progress: 3,
        leaf_node_count: Some(10),
        status: ProgressStatus::Started,
        completed_on: None,
        last_read_content_id: Some(ContentId::new("c1")),
        last_read_content_status: Some(ProgressStatus::Completed),
        processing_status: ProcessingStatus::New,
        date_time: fixed_now(),
    }
}

#[tokio::test]
async fn sqlite_round_trips_progress_records() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_progress?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    repo.batch_insert(&[build_record("c1", 1), build_record("c2", 1)])
        .await
        .unwrap();

    let fetched = repo
        .get_records(
            &UserId::new("u1"),
            &BatchId::new("b1"),
            &[ContentId::new("c1"), ContentId::new("c2"), ContentId::new("c3")],
        )
        .await
        .unwrap();
    assert_eq!(fetched.len(), 2);

    let c1 = fetched
        .iter()
        .find(|r| r.content_id == ContentId::new("c1"))
        .unwrap();
    assert_eq!(c1.status, ProgressStatus::Started);
    assert_eq!(c1.progress, 40);
    assert_eq!(c1.last_access_time, Some(fixed_now()));
    assert_eq!(c1.version, 1);

    let by_id = repo.get_record_by_id(&c1.id).await.unwrap();
    assert_eq!(by_id.as_ref(), Some(c1));
}

#[tokio::test]
async fn sqlite_enforces_the_version_condition() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_version?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    repo.batch_insert(&[build_record("c1", 1)]).await.unwrap();

    // Same version again loses the race.
    let err = repo.batch_insert(&[build_record("c1", 1)]).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict));

    // The successor version lands.
    repo.batch_insert(&[build_record("c1", 2)]).await.unwrap();

    // A conflicting record rolls back its whole batch.
    let err = repo
        .batch_insert(&[build_record("c9", 1), build_record("c1", 2)])
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict));
    let c9 = repo
        .get_records(&UserId::new("u1"), &BatchId::new("b1"), &[ContentId::new("c9")])
        .await
        .unwrap();
    assert!(c9.is_empty(), "conflicted batch must not be partially persisted");
}

#[tokio::test]
async fn sqlite_replaces_batch_user_aggregate() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_aggregate?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let first = BatchUserAggregate {
        batch_id: BatchId::new("b1"),
        user_id: UserId::new("u1"),
        last_read_content_id: ContentId::new("c1"),
        last_read_content_status: ProgressStatus::Started,
    };
    repo.upsert_aggregate(&first).await.unwrap();

    let second = BatchUserAggregate {
        last_read_content_id: ContentId::new("c2"),
        last_read_content_status: ProgressStatus::Completed,
        ..first.clone()
    };
    repo.upsert_aggregate(&second).await.unwrap();

    let fetched = repo
        .get_aggregate(&BatchId::new("b1"), &UserId::new("u1"))
        .await
        .unwrap()
        .expect("aggregate stored");
    assert_eq!(fetched, second);
}

#[tokio::test]
async fn storage_aggregate_composes_the_sqlite_backends() {
    let storage = Storage::sqlite("sqlite:file:memdb_storage?mode=memory&cache=shared")
        .await
        .expect("connect and migrate");

    storage
        .progress
        .batch_insert(&[build_record("c1", 1)])
        .await
        .unwrap();
    let fetched = storage
        .progress
        .get_records(&UserId::new("u1"), &BatchId::new("b1"), &[ContentId::new("c1")])
        .await
        .unwrap();
    assert_eq!(fetched.len(), 1);

    let aggregate = BatchUserAggregate {
        batch_id: BatchId::new("b1"),
        user_id: UserId::new("u1"),
        last_read_content_id: ContentId::new("c1"),
        last_read_content_status: ProgressStatus::Started,
    };
    storage.aggregates.upsert_aggregate(&aggregate).await.unwrap();
    let stored = storage
        .aggregates
        .get_aggregate(&BatchId::new("b1"), &UserId::new("u1"))
        .await
        .unwrap();
    assert_eq!(stored, Some(aggregate));

    let enrollment = build_enrollment();
    storage.enrollments.upsert_enrollment(&enrollment).await.unwrap();
    let stored = storage
        .enrollments
        .get_enrollment(&enrollment.id)
        .await
        .unwrap()
        .expect("enrollment stored");
    assert_eq!(stored, enrollment);
}

#[tokio::test]
async fn sqlite_round_trips_enrollment_and_partial_status_update() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_enrollment?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let enrollment = build_enrollment();
    repo.upsert_enrollment(&enrollment).await.unwrap();

    repo.update_processing_status(&enrollment.id, ProcessingStatus::Completed)
        .await
        .unwrap();

    let fetched = repo
        .get_enrollment(&enrollment.id)
        .await
        .unwrap()
        .expect("enrollment stored");
    assert_eq!(fetched.processing_status, ProcessingStatus::Completed);
    assert_eq!(fetched.course_progress, 3);
    assert_eq!(fetched.leaf_node_count, Some(10));
    assert_eq!(fetched.last_read_content_id, Some(ContentId::new("c1")));

    let err = repo
        .update_processing_status(&RecordId::new("missing"), ProcessingStatus::Failed)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}
