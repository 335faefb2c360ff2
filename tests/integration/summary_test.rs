//! Integration tests for the summarization lifecycle.

use chrono::{Duration, Utc};

use paperhub_core::error::ErrorKind;
use paperhub_entity::file::ProcessingStatus;
use paperhub_entity::summary::SummaryStyle;
use paperhub_service::folder::CreateFolderRequest;
use paperhub_service::summary::{
    CallbackOutcome, GenerateSummaryRequest, SummaryCallback, SummaryView,
};
use paperhub_worker::{MaintenanceTask, ReconcileJobsTask};

use crate::helpers::{TestApp, personal_user};

fn request(style: &str) -> GenerateSummaryRequest {
    GenerateSummaryRequest {
        style: style.to_string(),
        custom_instructions: None,
        language: None,
    }
}

#[tokio::test]
async fn test_reports_2024_flow_creates_versions() {
    let mut app = TestApp::new();
    let ctx = personal_user();

    let reports = app
        .folders
        .create_folder(
            &ctx,
            CreateFolderRequest {
                name: "Reports".to_string(),
                parent_id: None,
                sort_order: None,
            },
        )
        .await
        .unwrap();
    let year = app
        .folders
        .create_folder(
            &ctx,
            CreateFolderRequest {
                name: "2024".to_string(),
                parent_id: Some(reports.id),
                sort_order: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(year.depth, 1);
    assert_eq!(year.path, "/Reports/2024");

    let file = app.upload_pdf(&ctx, "q4.pdf", Some(year.id)).await;
    assert_eq!(file.status, ProcessingStatus::Uploaded);

    let accepted = app
        .summaries
        .generate(&ctx, file.id, request("bullet_points"))
        .await
        .unwrap();
    assert_eq!(accepted.status, ProcessingStatus::Processing);
    assert_eq!(accepted.style, SummaryStyle::BulletPoints);

    let view = app.summaries.get_by_file_id(&ctx, file.id, None).await.unwrap();
    assert!(matches!(view, SummaryView::Status(ref s) if s.status == "processing"));

    let v1 = app.complete_next("X").await;
    assert_eq!(v1.version, 1);
    assert!(v1.is_current);
    assert_eq!(v1.content, "X");
    let detail = app.files.get_file(&ctx, file.id).await.unwrap();
    assert_eq!(detail.file.status, ProcessingStatus::Completed);
    assert!(detail.file.processed_at.is_some());

    app.summaries
        .generate(&ctx, file.id, request("academic"))
        .await
        .unwrap();
    let v2 = app.complete_next("Y").await;
    assert_eq!(v2.version, 2);
    assert!(v2.is_current);
    assert_eq!(v2.style, SummaryStyle::Academic);

    let history = app.summaries.get_history(&ctx, file.id).await.unwrap();
    let versions: Vec<_> = history.iter().map(|h| (h.version, h.is_current)).collect();
    assert_eq!(versions, [(2, true), (1, false)]);

    match app.summaries.get_by_file_id(&ctx, file.id, None).await.unwrap() {
        SummaryView::Ready(summary) => assert_eq!(summary.version, 2),
        other => panic!("Expected the current summary, got {other:?}"),
    }
    match app.summaries.get_by_file_id(&ctx, file.id, Some(1)).await.unwrap() {
        SummaryView::Ready(summary) => {
            assert_eq!(summary.content, "X");
            assert!(!summary.is_current);
        }
        other => panic!("Expected version 1, got {other:?}"),
    }
    let err = app
        .summaries
        .get_by_file_id(&ctx, file.id, Some(7))
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::NoSummary));
}

#[tokio::test]
async fn test_back_to_back_generate_is_already_processing() {
    let app = TestApp::new();
    let ctx = personal_user();
    let file = app.upload_pdf(&ctx, "paper.pdf", None).await;

    app.summaries
        .generate(&ctx, file.id, request("paragraph"))
        .await
        .unwrap();
    let err = app
        .summaries
        .generate(&ctx, file.id, request("paragraph"))
        .await
        .unwrap_err();

    assert!(err.is(ErrorKind::AlreadyProcessing));
}

#[tokio::test]
async fn test_error_callback_fails_file_and_allows_retry() {
    let mut app = TestApp::new();
    let ctx = personal_user();
    let file = app.upload_pdf(&ctx, "paper.pdf", None).await;
    app.summaries
        .generate(&ctx, file.id, request("detailed"))
        .await
        .unwrap();
    let dispatched = app.requests.recv().await.unwrap();

    let outcome = app
        .summaries
        .process_callback(SummaryCallback::failed(
            file.id,
            dispatched.job_id,
            "PDF has no extractable text",
        ))
        .await
        .unwrap();
    assert_eq!(outcome, CallbackOutcome::Failed);

    match app.summaries.get_by_file_id(&ctx, file.id, None).await.unwrap() {
        SummaryView::Status(status) => {
            assert_eq!(status.status, "failed");
            assert_eq!(status.message, "PDF has no extractable text");
        }
        other => panic!("Expected a failed status, got {other:?}"),
    }

    app.summaries
        .generate(&ctx, file.id, request("detailed"))
        .await
        .unwrap();
    let summary = app.complete_next("Recovered").await;
    assert_eq!(summary.version, 1);
}

#[tokio::test]
async fn test_replayed_success_callback_adds_no_version() {
    let mut app = TestApp::new();
    let ctx = personal_user();
    let file = app.upload_pdf(&ctx, "paper.pdf", None).await;
    app.summaries
        .generate(&ctx, file.id, request("paragraph"))
        .await
        .unwrap();
    let dispatched = app.requests.recv().await.unwrap();

    let callback = SummaryCallback {
        file_id: file.id,
        job_id: Some(dispatched.job_id),
        status: SummaryCallback::COMPLETED.to_string(),
        content: Some("Once".to_string()),
        ..Default::default()
    };
    let first = app.summaries.process_callback(callback.clone()).await.unwrap();
    assert!(matches!(first, CallbackOutcome::Completed(_)));
    let replay = app.summaries.process_callback(callback).await.unwrap();
    assert_eq!(replay, CallbackOutcome::Ignored);

    let history = app.summaries.get_history(&ctx, file.id).await.unwrap();
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn test_uploaded_file_reports_no_summary() {
    let app = TestApp::new();
    let ctx = personal_user();
    let file = app.upload_pdf(&ctx, "paper.pdf", None).await;

    match app.summaries.get_by_file_id(&ctx, file.id, None).await.unwrap() {
        SummaryView::Status(status) => assert_eq!(status.status, "no_summary"),
        other => panic!("Expected no summary, got {other:?}"),
    }
}

#[tokio::test]
async fn test_invalid_style_and_stranger_are_rejected() {
    let app = TestApp::new();
    let ctx = personal_user();
    let file = app.upload_pdf(&ctx, "paper.pdf", None).await;

    let err = app
        .summaries
        .generate(&ctx, file.id, request("haiku"))
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::InvalidStyle));

    let err = app
        .summaries
        .generate(&personal_user(), file.id, request("paragraph"))
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::NotFound));
}

#[tokio::test]
async fn test_reconcile_task_fails_abandoned_jobs() {
    let app = TestApp::new();
    let ctx = personal_user();
    let file = app.upload_pdf(&ctx, "paper.pdf", None).await;
    app.summaries
        .generate(&ctx, file.id, request("paragraph"))
        .await
        .unwrap();

    let task = ReconcileJobsTask::new(app.summaries.clone(), 30);
    task.run(Utc::now()).await.unwrap();
    let detail = app.files.get_file(&ctx, file.id).await.unwrap();
    assert_eq!(detail.file.status, ProcessingStatus::Processing);

    task.run(Utc::now() + Duration::hours(1)).await.unwrap();
    let detail = app.files.get_file(&ctx, file.id).await.unwrap();
    assert_eq!(detail.file.status, ProcessingStatus::Failed);

    // A new attempt may start once the stale one is closed.
    app.summaries
        .generate(&ctx, file.id, request("paragraph"))
        .await
        .unwrap();
}
