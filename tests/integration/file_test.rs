//! Integration tests for file operations and export.

use paperhub_core::error::ErrorKind;
use paperhub_core::traits::storage::Bucket;
use paperhub_entity::file::ProcessingStatus;
use paperhub_entity::file::export::PERSONAL_WORKSPACE_LABEL;
use paperhub_service::file::{ExportRequest, ListFilesParams, MoveFileRequest, RenameFileRequest};
use paperhub_service::folder::CreateFolderRequest;
use paperhub_service::summary::GenerateSummaryRequest;

use crate::helpers::{TestApp, personal_user};

fn params() -> ListFilesParams {
    ListFilesParams::default()
}

#[tokio::test]
async fn test_list_filters_search_and_sort() {
    let app = TestApp::new();
    let ctx = personal_user();
    let folder = app
        .folders
        .create_folder(
            &ctx,
            CreateFolderRequest {
                name: "Papers".to_string(),
                parent_id: None,
                sort_order: None,
            },
        )
        .await
        .unwrap();
    app.upload_pdf(&ctx, "beta.pdf", Some(folder.id)).await;
    app.upload_pdf(&ctx, "alpha.pdf", Some(folder.id)).await;
    app.upload_pdf(&ctx, "Gamma Notes.pdf", None).await;

    let all = app.files.list_files(&ctx, &params()).await.unwrap();
    assert_eq!(all.total_items, 3);

    let in_folder = app
        .files
        .list_files(
            &ctx,
            &ListFilesParams {
                folder_id: Some(folder.id),
                sort: Some("filename".to_string()),
                ..params()
            },
        )
        .await
        .unwrap();
    let names: Vec<_> = in_folder.items.iter().map(|f| f.filename.as_str()).collect();
    assert_eq!(names, ["alpha.pdf", "beta.pdf"]);

    let found = app
        .files
        .list_files(
            &ctx,
            &ListFilesParams {
                search: Some("gamma".to_string()),
                ..params()
            },
        )
        .await
        .unwrap();
    assert_eq!(found.total_items, 1);
    assert_eq!(found.items[0].original_filename, "Gamma Notes.pdf");
    assert_eq!(found.items[0].filename, "gamma-notes.pdf");

    let paged = app
        .files
        .list_files(
            &ctx,
            &ListFilesParams {
                page: Some(2),
                limit: Some(2),
                ..params()
            },
        )
        .await
        .unwrap();
    assert_eq!(paged.items.len(), 1);
    assert_eq!(paged.total_pages, 2);
}

#[tokio::test]
async fn test_page_far_past_the_end_is_empty() {
    let app = TestApp::new();
    let ctx = personal_user();
    app.upload_pdf(&ctx, "paper.pdf", None).await;

    for page in [u64::MAX / 2, u64::MAX] {
        let listed = app
            .files
            .list_files(
                &ctx,
                &ListFilesParams {
                    page: Some(page),
                    limit: Some(100),
                    ..params()
                },
            )
            .await
            .unwrap();
        assert!(listed.items.is_empty());
        assert_eq!(listed.total_items, 1);
        assert_eq!(listed.page, page);
    }
}

#[tokio::test]
async fn test_unknown_status_filter_is_rejected() {
    let app = TestApp::new();
    let err = app
        .files
        .list_files(
            &personal_user(),
            &ListFilesParams {
                status: Some("archived".to_string()),
                ..params()
            },
        )
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Validation));
}

#[tokio::test]
async fn test_get_file_includes_folder_and_current_summary() {
    let mut app = TestApp::new();
    let ctx = personal_user();
    let folder = app
        .folders
        .create_folder(
            &ctx,
            CreateFolderRequest {
                name: "Papers".to_string(),
                parent_id: None,
                sort_order: None,
            },
        )
        .await
        .unwrap();
    let file = app.upload_pdf(&ctx, "paper.pdf", Some(folder.id)).await;

    let detail = app.files.get_file(&ctx, file.id).await.unwrap();
    assert_eq!(detail.folder.as_ref().map(|f| f.path.as_str()), Some("/Papers"));
    assert!(detail.current_summary.is_none());

    app.summaries
        .generate(
            &ctx,
            file.id,
            GenerateSummaryRequest {
                style: "paragraph".to_string(),
                custom_instructions: None,
                language: None,
            },
        )
        .await
        .unwrap();
    app.complete_next("Body").await;

    let detail = app.files.get_file(&ctx, file.id).await.unwrap();
    assert_eq!(detail.file.status, ProcessingStatus::Completed);
    assert_eq!(detail.current_summary.map(|s| s.version), Some(1));
}

#[tokio::test]
async fn test_download_url_targets_files_bucket() {
    let app = TestApp::new();
    let ctx = personal_user();
    let file = app.upload_pdf(&ctx, "paper.pdf", None).await;

    let presigned = app.files.download_url(&ctx, file.id).await.unwrap();

    assert_eq!(presigned.method, "GET");
    assert!(presigned.url.contains(Bucket::Files.as_str()));
    assert!(presigned.url.contains(&file.storage_path));
}

#[tokio::test]
async fn test_move_and_rename_file() {
    let app = TestApp::new();
    let ctx = personal_user();
    let folder = app
        .folders
        .create_folder(
            &ctx,
            CreateFolderRequest {
                name: "Papers".to_string(),
                parent_id: None,
                sort_order: None,
            },
        )
        .await
        .unwrap();
    let file = app.upload_pdf(&ctx, "paper.pdf", None).await;

    let moved = app
        .files
        .move_file(
            &ctx,
            file.id,
            MoveFileRequest {
                folder_id: Some(folder.id),
            },
        )
        .await
        .unwrap();
    assert_eq!(moved.folder_id, Some(folder.id));

    let renamed = app
        .files
        .rename_file(
            &ctx,
            file.id,
            RenameFileRequest {
                filename: "Final Draft.pdf".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.original_filename, "Final Draft.pdf");
    assert_eq!(renamed.filename, "final-draft.pdf");

    let back = app
        .files
        .move_file(&ctx, file.id, MoveFileRequest { folder_id: None })
        .await
        .unwrap();
    assert!(back.folder_id.is_none());
}

#[tokio::test]
async fn test_move_into_foreign_folder_is_not_found() {
    let app = TestApp::new();
    let ctx = personal_user();
    let other = personal_user();
    let foreign = app
        .folders
        .create_folder(
            &other,
            CreateFolderRequest {
                name: "Theirs".to_string(),
                parent_id: None,
                sort_order: None,
            },
        )
        .await
        .unwrap();
    let file = app.upload_pdf(&ctx, "paper.pdf", None).await;

    let err = app
        .files
        .move_file(
            &ctx,
            file.id,
            MoveFileRequest {
                folder_id: Some(foreign.id),
            },
        )
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::NotFound));
}

#[tokio::test]
async fn test_delete_file_removes_row_and_object() {
    let app = TestApp::new();
    let ctx = personal_user();
    let file = app.upload_pdf(&ctx, "paper.pdf", None).await;

    app.files.delete_file(&ctx, file.id).await.unwrap();

    assert_eq!(app.objects.object_count(Bucket::Files), 0);
    let err = app.files.get_file(&ctx, file.id).await.unwrap_err();
    assert!(err.is(ErrorKind::NotFound));
    let err = app.files.delete_file(&ctx, file.id).await.unwrap_err();
    assert!(err.is(ErrorKind::NotFound));
}

#[tokio::test]
async fn test_other_users_files_are_invisible() {
    let app = TestApp::new();
    let owner = personal_user();
    let stranger = personal_user();
    let file = app.upload_pdf(&owner, "paper.pdf", None).await;

    for err in [
        app.files.get_file(&stranger, file.id).await.unwrap_err(),
        app.files.download_url(&stranger, file.id).await.unwrap_err(),
        app.files.delete_file(&stranger, file.id).await.unwrap_err(),
    ] {
        assert!(err.is(ErrorKind::NotFound));
    }
    assert_eq!(app.files.list_files(&stranger, &params()).await.unwrap().total_items, 0);
}

#[tokio::test]
async fn test_csv_export_of_single_file() {
    let mut app = TestApp::new();
    let ctx = personal_user();
    let file = app.upload_pdf(&ctx, "Quarterly Report.pdf", None).await;
    app.upload_pdf(&ctx, "other.pdf", None).await;
    app.summaries
        .generate(
            &ctx,
            file.id,
            GenerateSummaryRequest {
                style: "executive".to_string(),
                custom_instructions: None,
                language: None,
            },
        )
        .await
        .unwrap();
    app.complete_next("Revenue grew, \"a lot\"").await;

    let doc = app
        .exports
        .export(
            &ctx,
            &ExportRequest {
                params: params(),
                file_ids: Some(vec![file.id]),
                format: None,
            },
        )
        .await
        .unwrap();

    assert!(doc.filename.starts_with("Quarterly_Report_"));
    assert!(doc.filename.ends_with(".csv"));
    assert!(doc.content_type.starts_with("text/csv"));
    let text = String::from_utf8(doc.body).unwrap();
    assert!(text.starts_with('\u{feff}'));
    let lines: Vec<_> = text.trim_end().split("\r\n").collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[1].contains("\"Revenue grew, \"\"a lot\"\"\""));
}

#[tokio::test]
async fn test_json_export_groups_versions_per_file() {
    let mut app = TestApp::new();
    let ctx = personal_user();
    let file = app.upload_pdf(&ctx, "paper.pdf", None).await;
    app.upload_pdf(&ctx, "unsummarized.pdf", None).await;
    for content in ["first", "second"] {
        app.summaries
            .generate(
                &ctx,
                file.id,
                GenerateSummaryRequest {
                    style: "bullet_points".to_string(),
                    custom_instructions: None,
                    language: None,
                },
            )
            .await
            .unwrap();
        app.complete_next(content).await;
    }

    let doc = app
        .exports
        .export(
            &ctx,
            &ExportRequest {
                params: params(),
                file_ids: Some(Vec::new()),
                format: Some("json".to_string()),
            },
        )
        .await
        .unwrap();

    assert!(doc.filename.starts_with("files_export_"));
    assert_eq!(doc.content_type, "application/json");
    let data: serde_json::Value = serde_json::from_slice(&doc.body).unwrap();
    assert_eq!(data["workspace"], PERSONAL_WORKSPACE_LABEL);
    assert_eq!(data["total_files"], 2);
    let files = data["files"].as_array().unwrap();
    let summarized = files
        .iter()
        .find(|f| f["id"] == file.id.to_string())
        .unwrap();
    assert_eq!(summarized["summaries"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_export_rejects_unknown_format() {
    let app = TestApp::new();
    let err = app
        .exports
        .export(
            &personal_user(),
            &ExportRequest {
                params: params(),
                file_ids: None,
                format: Some("xlsx".to_string()),
            },
        )
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Validation));
}
