//! Integration tests for workspaces and scope isolation.

use paperhub_core::error::ErrorKind;
use paperhub_entity::workspace::WorkspaceRole;
use paperhub_service::file::{ExportRequest, ListFilesParams};
use paperhub_service::folder::{CreateFolderRequest, TreeOptions};
use paperhub_service::summary::GenerateSummaryRequest;
use paperhub_service::workspace::{
    CreateWorkspaceRequest, JoinWorkspaceRequest, RenameWorkspaceRequest,
};

use crate::helpers::{TestApp, personal_user};

async fn workspace_with_member(
    app: &TestApp,
) -> (
    paperhub_service::RequestContext,
    paperhub_service::RequestContext,
    uuid::Uuid,
) {
    let owner = personal_user();
    let member = personal_user();
    let ws = app
        .workspaces
        .create_workspace(
            &owner,
            CreateWorkspaceRequest {
                name: "Research Lab".to_string(),
            },
        )
        .await
        .unwrap();
    let code = ws.invite_code.clone().unwrap();
    app.workspaces
        .join_workspace(
            &member,
            JoinWorkspaceRequest {
                invite_code: code.to_lowercase(),
            },
        )
        .await
        .unwrap();
    (owner.in_workspace(ws.id), member.in_workspace(ws.id), ws.id)
}

#[tokio::test]
async fn test_create_and_join_workspace() {
    let app = TestApp::new();
    let owner = personal_user();
    let member = personal_user();

    let ws = app
        .workspaces
        .create_workspace(
            &owner,
            CreateWorkspaceRequest {
                name: "Research Lab".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(ws.role, WorkspaceRole::Owner);
    let code = ws.invite_code.clone().unwrap();
    assert_eq!(code.len(), 8);
    assert!(code.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));

    let joined = app
        .workspaces
        .join_workspace(
            &member,
            JoinWorkspaceRequest {
                invite_code: format!("  {}  ", code.to_lowercase()),
            },
        )
        .await
        .unwrap();
    assert_eq!(joined.id, ws.id);
    assert_eq!(joined.role, WorkspaceRole::Member);
    assert!(joined.invite_code.is_none());

    let err = app
        .workspaces
        .join_workspace(&member, JoinWorkspaceRequest { invite_code: code })
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::AlreadyMember));

    let err = app
        .workspaces
        .join_workspace(
            &personal_user(),
            JoinWorkspaceRequest {
                invite_code: "NOPE0000".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::InviteCodeInvalid));

    let members = app.workspaces.list_members(&owner, ws.id).await.unwrap();
    assert_eq!(members.len(), 2);
    assert_eq!(app.workspaces.list_workspaces(&member).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_only_owner_changes_settings() {
    let app = TestApp::new();
    let (owner, member, ws_id) = workspace_with_member(&app).await;

    let err = app
        .workspaces
        .rename_workspace(
            &member,
            ws_id,
            RenameWorkspaceRequest {
                name: "Mine".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Forbidden));
    let err = app
        .workspaces
        .regenerate_invite_code(&member, ws_id)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Forbidden));
    let err = app
        .workspaces
        .get_workspace(&personal_user(), ws_id)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::NotFound));

    let before = app.workspaces.get_workspace(&owner, ws_id).await.unwrap();
    let after = app
        .workspaces
        .regenerate_invite_code(&owner, ws_id)
        .await
        .unwrap();
    assert_ne!(before.invite_code, after.invite_code);

    let err = app
        .workspaces
        .join_workspace(
            &personal_user(),
            JoinWorkspaceRequest {
                invite_code: before.invite_code.unwrap(),
            },
        )
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::InviteCodeInvalid));
}

#[tokio::test]
async fn test_members_share_workspace_documents() {
    let mut app = TestApp::new();
    let (owner, member, _) = workspace_with_member(&app).await;

    let folder = app
        .folders
        .create_folder(
            &member,
            CreateFolderRequest {
                name: "Shared".to_string(),
                parent_id: None,
                sort_order: None,
            },
        )
        .await
        .unwrap();
    let file = app.upload_pdf(&member, "shared.pdf", Some(folder.id)).await;
    assert!(file.workspace_id.is_some());

    // The owner did not upload it but may summarize it.
    app.summaries
        .generate(
            &owner,
            file.id,
            GenerateSummaryRequest {
                style: "paragraph".to_string(),
                custom_instructions: None,
                language: Some("id".to_string()),
            },
        )
        .await
        .unwrap();
    let summary = app.complete_next("Ringkasan").await;
    assert_eq!(summary.language, "id");

    let listed = app
        .files
        .list_files(&owner, &ListFilesParams::default())
        .await
        .unwrap();
    assert_eq!(listed.total_items, 1);
    assert!(listed.items[0].has_summary);

    let tree = app.trees.get_tree(&owner, TreeOptions::default()).await.unwrap();
    assert_eq!(tree.total_folders, 1);

    let doc = app
        .exports
        .export(
            &owner,
            &ExportRequest {
                params: ListFilesParams::default(),
                file_ids: None,
                format: Some("json".to_string()),
            },
        )
        .await
        .unwrap();
    let data: serde_json::Value = serde_json::from_slice(&doc.body).unwrap();
    assert_eq!(data["workspace"], "Research Lab");
}

#[tokio::test]
async fn test_workspace_and_personal_scopes_are_isolated() {
    let app = TestApp::new();
    let (owner, member, ws_id) = workspace_with_member(&app).await;
    let owner_personal = paperhub_service::RequestContext::personal(owner.user_id);

    let shared = app.upload_pdf(&member, "shared.pdf", None).await;
    let private = app.upload_pdf(&owner_personal, "private.pdf", None).await;

    let personal_list = app
        .files
        .list_files(&owner_personal, &ListFilesParams::default())
        .await
        .unwrap();
    assert_eq!(personal_list.total_items, 1);
    assert_eq!(personal_list.items[0].id, private.id);

    let ws_list = app
        .files
        .list_files(&owner, &ListFilesParams::default())
        .await
        .unwrap();
    assert_eq!(ws_list.total_items, 1);
    assert_eq!(ws_list.items[0].id, shared.id);

    // Members cannot reach each other's personal files.
    let err = app.files.get_file(&member, private.id).await.unwrap_err();
    assert!(err.is(ErrorKind::NotFound));

    // A non-member asking for the workspace falls back to personal scope.
    let outsider = personal_user().in_workspace(ws_id);
    let outsider_list = app
        .files
        .list_files(&outsider, &ListFilesParams::default())
        .await
        .unwrap();
    assert_eq!(outsider_list.total_items, 0);
    let err = app.files.get_file(&outsider, shared.id).await.unwrap_err();
    assert!(err.is(ErrorKind::NotFound));
    let outsider_upload = app.upload_pdf(&outsider, "mine.pdf", None).await;
    assert!(outsider_upload.workspace_id.is_none());
}
