//! Integration tests for presigned uploads.

use bytes::Bytes;
use chrono::{Duration, Utc};

use paperhub_core::error::ErrorKind;
use paperhub_core::traits::storage::{Bucket, ObjectStorage};
use paperhub_entity::file::ProcessingStatus;
use paperhub_service::file::IssueUploadRequest;
use paperhub_service::folder::CreateFolderRequest;

use crate::helpers::{TestApp, personal_user};

fn pdf_request(filename: &str) -> IssueUploadRequest {
    IssueUploadRequest {
        filename: filename.to_string(),
        file_size: 1024,
        content_type: "application/pdf".to_string(),
        folder_id: None,
    }
}

#[tokio::test]
async fn test_upload_flow_creates_uploaded_file() {
    let app = TestApp::new();
    let ctx = personal_user();
    let folder = app
        .folders
        .create_folder(
            &ctx,
            CreateFolderRequest {
                name: "Inbox".to_string(),
                parent_id: None,
                sort_order: None,
            },
        )
        .await
        .unwrap();

    let file = app.upload_pdf(&ctx, "Annual Report.pdf", Some(folder.id)).await;

    assert_eq!(file.status, ProcessingStatus::Uploaded);
    assert_eq!(file.original_filename, "Annual Report.pdf");
    assert_eq!(file.folder_id, Some(folder.id));
    assert_eq!(file.user_id, ctx.user_id);
    assert!(file.storage_path.ends_with(".pdf"));
    assert!(app.objects.exists(Bucket::Files, &file.storage_path).await.unwrap());
    assert!(!app.objects.exists(Bucket::Uploads, &file.storage_path).await.unwrap());
}

#[tokio::test]
async fn test_non_pdf_and_oversized_uploads_are_rejected() {
    let app = TestApp::new();
    let ctx = personal_user();

    let mut req = pdf_request("notes.txt");
    req.content_type = "text/plain".to_string();
    let err = app.uploads.issue_upload(&ctx, req).await.unwrap_err();
    assert!(err.is(ErrorKind::Validation));

    let mut req = pdf_request("huge.pdf");
    req.file_size = 26 * 1024 * 1024;
    let err = app.uploads.issue_upload(&ctx, req).await.unwrap_err();
    assert!(err.is(ErrorKind::Validation));
}

#[tokio::test]
async fn test_confirm_without_object_keeps_pending_upload() {
    let app = TestApp::new();
    let ctx = personal_user();
    let issued = app.uploads.issue_upload(&ctx, pdf_request("a.pdf")).await.unwrap();

    let err = app.uploads.confirm_upload(&ctx, issued.upload_id).await.unwrap_err();
    assert!(err.is(ErrorKind::Validation));

    // The client may still PUT and retry.
    app.objects
        .put(Bucket::Uploads, &issued.storage_path, Bytes::from_static(b"%PDF"))
        .await
        .unwrap();
    let file = app.uploads.confirm_upload(&ctx, issued.upload_id).await.unwrap();
    assert_eq!(file.storage_path, issued.storage_path);
}

#[tokio::test]
async fn test_failed_copy_leaves_upload_retryable() {
    let app = TestApp::new();
    let ctx = personal_user();
    let issued = app.uploads.issue_upload(&ctx, pdf_request("a.pdf")).await.unwrap();
    app.objects
        .put(Bucket::Uploads, &issued.storage_path, Bytes::from_static(b"%PDF"))
        .await
        .unwrap();

    app.objects.set_fail_copy(true);
    let err = app.uploads.confirm_upload(&ctx, issued.upload_id).await.unwrap_err();
    assert!(err.is(ErrorKind::StorageUnavailable));
    let listed = app.files.list_files(&ctx, &Default::default()).await.unwrap();
    assert_eq!(listed.total_items, 0);

    app.objects.set_fail_copy(false);
    app.uploads.confirm_upload(&ctx, issued.upload_id).await.unwrap();
}

#[tokio::test]
async fn test_failed_staging_delete_is_not_fatal() {
    let app = TestApp::new();
    let ctx = personal_user();
    let issued = app.uploads.issue_upload(&ctx, pdf_request("a.pdf")).await.unwrap();
    app.objects
        .put(Bucket::Uploads, &issued.storage_path, Bytes::from_static(b"%PDF"))
        .await
        .unwrap();

    app.objects.set_fail_delete(true);
    let file = app.uploads.confirm_upload(&ctx, issued.upload_id).await.unwrap();

    assert_eq!(file.status, ProcessingStatus::Uploaded);
    assert!(app.objects.exists(Bucket::Uploads, &issued.storage_path).await.unwrap());
}

#[tokio::test]
async fn test_confirm_twice_is_not_found() {
    let app = TestApp::new();
    let ctx = personal_user();
    let issued = app.uploads.issue_upload(&ctx, pdf_request("a.pdf")).await.unwrap();
    app.objects
        .put(Bucket::Uploads, &issued.storage_path, Bytes::from_static(b"%PDF"))
        .await
        .unwrap();
    app.uploads.confirm_upload(&ctx, issued.upload_id).await.unwrap();

    let err = app.uploads.confirm_upload(&ctx, issued.upload_id).await.unwrap_err();
    assert!(err.is(ErrorKind::NotFound));
}

#[tokio::test]
async fn test_other_user_cannot_confirm() {
    let app = TestApp::new();
    let owner = personal_user();
    let issued = app.uploads.issue_upload(&owner, pdf_request("a.pdf")).await.unwrap();
    app.objects
        .put(Bucket::Uploads, &issued.storage_path, Bytes::from_static(b"%PDF"))
        .await
        .unwrap();

    let err = app
        .uploads
        .confirm_upload(&personal_user(), issued.upload_id)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::NotFound));
}

#[tokio::test]
async fn test_sweep_removes_abandoned_uploads_only() {
    let app = TestApp::new();
    let ctx = personal_user();
    let issued = app.uploads.issue_upload(&ctx, pdf_request("a.pdf")).await.unwrap();
    app.objects
        .put(Bucket::Uploads, &issued.storage_path, Bytes::from_static(b"%PDF"))
        .await
        .unwrap();

    let report = app.uploads.sweep_expired(Utc::now()).await.unwrap();
    assert_eq!(report.removed, 0);

    let report = app
        .uploads
        .sweep_expired(Utc::now() + Duration::days(2))
        .await
        .unwrap();
    assert_eq!(report.removed, 1);
    assert_eq!(app.objects.object_count(Bucket::Uploads), 0);
    let err = app.uploads.confirm_upload(&ctx, issued.upload_id).await.unwrap_err();
    assert!(err.is(ErrorKind::NotFound));
}
