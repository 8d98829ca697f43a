use axum::http::StatusCode;
use chrono::{TimeZone, Utc};
use meterread::api;
use meterread::db::init_db;
use meterread::pipeline::DedupError;
use meterread::{
    BillingPeriod, ContentAddressedImageStore, DedupGuard, MeasureKey, MeasurePipeline,
    MeasureType, MeasurementRecord, MockExtractionProvider, Repository,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::util::ServiceExt;
use uuid::Uuid;

async fn setup_repo() -> (Arc<Repository>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");
    (Arc::new(Repository::new(pool)), temp_dir)
}

fn may_water() -> MeasureKey {
    MeasureKey {
        customer_code: "CUST1".to_string(),
        measure_type: MeasureType::Water,
        billing_period: BillingPeriod::new(2024, 5).unwrap(),
    }
}

fn record(value: f64) -> MeasurementRecord {
    let measure_datetime = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
    MeasurementRecord {
        measure_uuid: Uuid::new_v4(),
        customer_code: "CUST1".to_string(),
        measure_type: MeasureType::Water,
        billing_period: BillingPeriod::of(&measure_datetime),
        measure_datetime,
        measure_value: value,
        image_url: "https://img.test/x".to_string(),
        created_at: measure_datetime,
    }
}

/// Two instances share one database but not their in-flight sets.
#[tokio::test]
async fn test_two_instances_only_one_commit_wins() {
    let (repo, _temp) = setup_repo().await;
    let instance_a = DedupGuard::new(repo.clone());
    let instance_b = DedupGuard::new(repo.clone());

    let reservation_a = instance_a.check_and_reserve(may_water()).await.unwrap();
    let reservation_b = instance_b.check_and_reserve(may_water()).await.unwrap();

    let (record_a, record_b) = (record(1.0), record(2.0));
    let (a, b) = tokio::join!(
        reservation_a.commit(&record_a),
        reservation_b.commit(&record_b)
    );

    let outcomes = [a.is_ok(), b.is_ok()];
    assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);
    let loser = if a.is_ok() { b } else { a };
    assert!(matches!(loser, Err(DedupError::DoubleReport(_))));

    assert_eq!(repo.list_measures("CUST1", None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_many_concurrent_uploads_single_record() {
    let (repo, _temp) = setup_repo().await;
    let extractor = Arc::new(
        MockExtractionProvider::returning("9").with_delay(Duration::from_millis(50)),
    );
    let pipeline = Arc::new(MeasurePipeline::new(
        DedupGuard::new(repo.clone()),
        extractor.clone(),
        Arc::new(ContentAddressedImageStore::new("https://img.test")),
    ));
    let app = api::create_router(api::AppState::new(repo.clone(), pipeline));

    let mut handles = Vec::new();
    for day in 1..=8 {
        let app = app.clone();
        handles.push(tokio::spawn(async move {
            let body = json!({
                "image": "aGVsbG8=",
                "customer_code": "CUST1",
                "measure_datetime": format!("2024-05-{:02}T12:00:00Z", day),
                "measure_type": "WATER",
            });
            let req = axum::http::Request::builder()
                .method("POST")
                .uri("/upload")
                .header("content-type", "application/json")
                .body(axum::body::Body::from(body.to_string()))
                .unwrap();
            app.oneshot(req).await.unwrap().status()
        }));
    }

    let mut ok = 0;
    let mut conflict = 0;
    for handle in handles {
        match handle.await.unwrap() {
            StatusCode::OK => ok += 1,
            StatusCode::CONFLICT => conflict += 1,
            other => panic!("unexpected status {}", other),
        }
    }

    assert_eq!(ok, 1);
    assert_eq!(conflict, 7);
    assert_eq!(repo.list_measures("CUST1", None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_cancelled_upload_commits_nothing_and_frees_period() {
    let (repo, _temp) = setup_repo().await;
    let pipeline = Arc::new(MeasurePipeline::new(
        DedupGuard::new(repo.clone()),
        Arc::new(MockExtractionProvider::returning("3").with_delay(Duration::from_secs(5))),
        Arc::new(ContentAddressedImageStore::new("https://img.test")),
    ));

    let body = json!({
        "image": "aGVsbG8=",
        "customer_code": "CUST1",
        "measure_datetime": "2024-05-01T10:00:00Z",
        "measure_type": "WATER",
    });

    let in_flight = pipeline.clone();
    let pending_body = body.clone();
    let handle = tokio::spawn(async move { in_flight.process(&pending_body).await });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(pipeline.guard().in_flight(), 1);

    handle.abort();
    assert!(handle.await.unwrap_err().is_cancelled());

    assert_eq!(pipeline.guard().in_flight(), 0);
    assert!(repo.find_measure(&may_water()).await.unwrap().is_none());
    assert!(pipeline.guard().check_and_reserve(may_water()).await.is_ok());
}
