//! Integration tests for folder operations.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use paperhub_core::error::ErrorKind;
use paperhub_core::result::AppResult;
use paperhub_core::traits::storage::{Bucket, ObjectStorage};
use paperhub_database::repositories::{CascadeDelete, FolderRepository};
use paperhub_database::{MemoryStore, Repositories};
use paperhub_entity::OwnerScope;
use paperhub_entity::folder::{CreateFolder, Folder, FolderStats};
use paperhub_service::folder::{
    CreateFolderRequest, MoveFolderRequest, RenameFolderRequest, TreeOptions,
};
use paperhub_service::{FolderService, WorkspaceAccess};

use crate::helpers::{TestApp, personal_user};

/// Folder repository whose scope listings yield to other tasks and may
/// omit folders, as a reader racing concurrent writers would see them.
struct LaggingFolders {
    inner: Arc<MemoryStore>,
    hidden: Mutex<Vec<Uuid>>,
}

#[async_trait]
impl FolderRepository for LaggingFolders {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Folder>> {
        FolderRepository::find_by_id(self.inner.as_ref(), id).await
    }

    async fn list_by_scope(&self, scope: &OwnerScope) -> AppResult<Vec<Folder>> {
        let mut folders = FolderRepository::list_by_scope(self.inner.as_ref(), scope).await?;
        let hidden = self.hidden.lock().unwrap().clone();
        folders.retain(|f| !hidden.contains(&f.id));
        tokio::task::yield_now().await;
        Ok(folders)
    }

    async fn stats_by_scope(&self, scope: &OwnerScope) -> AppResult<Vec<FolderStats>> {
        self.inner.stats_by_scope(scope).await
    }

    async fn create(&self, data: &CreateFolder) -> AppResult<Folder> {
        FolderRepository::create(self.inner.as_ref(), data).await
    }

    async fn update_subtree(&self, folders: &[Folder]) -> AppResult<()> {
        self.inner.update_subtree(folders).await
    }

    async fn delete_cascade(&self, folder_id: Uuid) -> AppResult<CascadeDelete> {
        self.inner.delete_cascade(folder_id).await
    }
}

/// A folder service over `app`'s store with its own lock table.
fn lagging_service(app: &TestApp, hidden: Vec<Uuid>) -> FolderService {
    let repos = Repositories::memory(app.store.clone());
    let storage: Arc<dyn ObjectStorage> = app.objects.clone();
    FolderService::new(
        Arc::new(LaggingFolders {
            inner: app.store.clone(),
            hidden: Mutex::new(hidden),
        }),
        storage,
        WorkspaceAccess::new(repos.workspaces),
    )
}

fn move_under(parent_id: Uuid) -> MoveFolderRequest {
    MoveFolderRequest {
        parent_id: Some(parent_id),
        sort_order: None,
    }
}

fn folder(name: &str, parent_id: Option<uuid::Uuid>) -> CreateFolderRequest {
    CreateFolderRequest {
        name: name.to_string(),
        parent_id,
        sort_order: None,
    }
}

#[tokio::test]
async fn test_nested_folders_get_paths_and_depths() {
    let app = TestApp::new();
    let ctx = personal_user();

    let reports = app.folders.create_folder(&ctx, folder("Reports", None)).await.unwrap();
    let year = app
        .folders
        .create_folder(&ctx, folder("2024", Some(reports.id)))
        .await
        .unwrap();

    assert_eq!(reports.depth, 0);
    assert_eq!(reports.path, "/Reports");
    assert_eq!(year.depth, 1);
    assert_eq!(year.path, "/Reports/2024");
    assert_eq!(year.parent_id, Some(reports.id));
}

#[tokio::test]
async fn test_tree_orders_siblings_by_sort_order_then_name() {
    let app = TestApp::new();
    let ctx = personal_user();
    for (name, order) in [("Beta", 0), ("Alpha", 0), ("Zeta", -1)] {
        app.folders
            .create_folder(
                &ctx,
                CreateFolderRequest {
                    name: name.to_string(),
                    parent_id: None,
                    sort_order: Some(order),
                },
            )
            .await
            .unwrap();
    }

    let tree = app.trees.get_tree(&ctx, TreeOptions::default()).await.unwrap();
    let names: Vec<_> = tree.roots.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, ["Zeta", "Alpha", "Beta"]);
}

#[tokio::test]
async fn test_folder_name_with_separator_is_rejected() {
    let app = TestApp::new();
    let err = app
        .folders
        .create_folder(&personal_user(), folder("a/b", None))
        .await
        .unwrap_err();

    assert!(err.is(ErrorKind::Validation));
}

#[tokio::test]
async fn test_rename_rewrites_descendant_paths() {
    let app = TestApp::new();
    let ctx = personal_user();
    let reports = app.folders.create_folder(&ctx, folder("Reports", None)).await.unwrap();
    let year = app
        .folders
        .create_folder(&ctx, folder("2024", Some(reports.id)))
        .await
        .unwrap();

    app.folders
        .rename_folder(
            &ctx,
            reports.id,
            RenameFolderRequest {
                name: "Archive".to_string(),
            },
        )
        .await
        .unwrap();

    let year = app.folders.get_folder(&ctx, year.id).await.unwrap();
    assert_eq!(year.folder.path, "/Archive/2024");
}

#[tokio::test]
async fn test_move_into_own_subtree_is_rejected() {
    let app = TestApp::new();
    let ctx = personal_user();
    let a = app.folders.create_folder(&ctx, folder("A", None)).await.unwrap();
    let b = app.folders.create_folder(&ctx, folder("B", Some(a.id))).await.unwrap();

    let err = app
        .folders
        .move_folder(
            &ctx,
            a.id,
            MoveFolderRequest {
                parent_id: Some(b.id),
                sort_order: None,
            },
        )
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Validation));

    let err = app
        .folders
        .move_folder(
            &ctx,
            a.id,
            MoveFolderRequest {
                parent_id: Some(a.id),
                sort_order: None,
            },
        )
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Validation));
}

#[tokio::test]
async fn test_move_to_root_updates_depths() {
    let app = TestApp::new();
    let ctx = personal_user();
    let a = app.folders.create_folder(&ctx, folder("A", None)).await.unwrap();
    let b = app.folders.create_folder(&ctx, folder("B", Some(a.id))).await.unwrap();
    let c = app.folders.create_folder(&ctx, folder("C", Some(b.id))).await.unwrap();

    let moved = app
        .folders
        .move_folder(
            &ctx,
            b.id,
            MoveFolderRequest {
                parent_id: None,
                sort_order: Some(3),
            },
        )
        .await
        .unwrap();

    assert_eq!(moved.depth, 0);
    assert_eq!(moved.path, "/B");
    assert_eq!(moved.sort_order, 3);
    let c = app.folders.get_folder(&ctx, c.id).await.unwrap();
    assert_eq!(c.folder.depth, 1);
    assert_eq!(c.folder.path, "/B/C");
}

#[tokio::test]
async fn test_delete_folder_cascades_to_files_and_objects() {
    let app = TestApp::new();
    let ctx = personal_user();
    let reports = app.folders.create_folder(&ctx, folder("Reports", None)).await.unwrap();
    let year = app
        .folders
        .create_folder(&ctx, folder("2024", Some(reports.id)))
        .await
        .unwrap();
    let file = app.upload_pdf(&ctx, "q1.pdf", Some(year.id)).await;
    let kept = app.upload_pdf(&ctx, "kept.pdf", None).await;
    assert_eq!(app.objects.object_count(Bucket::Files), 2);

    let deletion = app.folders.delete_folder(&ctx, reports.id).await.unwrap();

    assert_eq!(deletion.folders_deleted, 2);
    assert_eq!(deletion.files_deleted, 1);
    assert_eq!(deletion.objects_failed, 0);
    assert_eq!(app.objects.object_count(Bucket::Files), 1);
    assert!(
        app.files
            .get_file(&ctx, file.id)
            .await
            .unwrap_err()
            .is(ErrorKind::NotFound)
    );
    assert!(app.files.get_file(&ctx, kept.id).await.is_ok());
}

#[tokio::test]
async fn test_tree_embeds_counts_and_files() {
    let app = TestApp::new();
    let ctx = personal_user();
    let reports = app.folders.create_folder(&ctx, folder("Reports", None)).await.unwrap();
    let year = app
        .folders
        .create_folder(&ctx, folder("2024", Some(reports.id)))
        .await
        .unwrap();
    app.upload_pdf(&ctx, "q1.pdf", Some(year.id)).await;
    app.upload_pdf(&ctx, "loose.pdf", None).await;

    let tree = app
        .trees
        .get_tree(
            &ctx,
            TreeOptions {
                include_files: true,
                include_counts: true,
            },
        )
        .await
        .unwrap();

    assert_eq!(tree.total_folders, 2);
    assert_eq!(tree.roots.len(), 1);
    let root = &tree.roots[0];
    assert_eq!(root.file_count, Some(0));
    let child = &root.children[0];
    assert_eq!(child.path, "/Reports/2024");
    assert_eq!(child.file_count, Some(1));
    assert_eq!(child.files.as_ref().map(Vec::len), Some(1));
    assert_eq!(tree.root_files.as_ref().map(Vec::len), Some(1));

    let bare = app.trees.get_tree(&ctx, TreeOptions::default()).await.unwrap();
    assert!(bare.roots[0].file_count.is_none());
    assert!(bare.root_files.is_none());
}

#[tokio::test]
async fn test_other_users_folders_are_invisible() {
    let app = TestApp::new();
    let owner = personal_user();
    let stranger = personal_user();
    let reports = app.folders.create_folder(&owner, folder("Reports", None)).await.unwrap();

    let err = app.folders.get_folder(&stranger, reports.id).await.unwrap_err();
    assert!(err.is(ErrorKind::NotFound));
    assert!(app.folders.list_folders(&stranger).await.unwrap().is_empty());
    app.folders.create_folder(&stranger, folder("Reports", None)).await.unwrap();
}

#[tokio::test]
async fn test_crossing_moves_leave_one_root() {
    let app = TestApp::new();
    let ctx = personal_user();
    let a = app.folders.create_folder(&ctx, folder("A", None)).await.unwrap();
    let b = app.folders.create_folder(&ctx, folder("B", None)).await.unwrap();
    let service = lagging_service(&app, Vec::new());

    let (first, second) = tokio::join!(
        service.move_folder(&ctx, a.id, move_under(b.id)),
        service.move_folder(&ctx, b.id, move_under(a.id)),
    );

    let moved = first.unwrap();
    assert_eq!(moved.path, "/B/A");
    assert!(second.unwrap_err().is(ErrorKind::Validation));
    let tree = app.trees.get_tree(&ctx, TreeOptions::default()).await.unwrap();
    assert_eq!(tree.roots.len(), 1);
    assert_eq!(tree.roots[0].id, b.id);
}

#[tokio::test]
async fn test_store_rejects_cycle_from_stale_hierarchy_view() {
    let app = TestApp::new();
    let ctx = personal_user();
    let a = app.folders.create_folder(&ctx, folder("A", None)).await.unwrap();
    let b = app.folders.create_folder(&ctx, folder("B", None)).await.unwrap();
    // Separate lock tables, as two processes would have.
    let left = lagging_service(&app, Vec::new());
    let right = lagging_service(&app, Vec::new());

    let (first, second) = tokio::join!(
        left.move_folder(&ctx, a.id, move_under(b.id)),
        right.move_folder(&ctx, b.id, move_under(a.id)),
    );

    let rejected: Vec<_> = [first, second].into_iter().filter_map(Result::err).collect();
    assert_eq!(rejected.len(), 1);
    assert!(rejected[0].is(ErrorKind::Validation));
    let tree = app.trees.get_tree(&ctx, TreeOptions::default()).await.unwrap();
    assert_eq!(tree.roots.len(), 1);
    assert_eq!(tree.total_folders, 2);
}

#[tokio::test]
async fn test_delete_reaches_folders_missing_from_stale_listing() {
    let app = TestApp::new();
    let ctx = personal_user();
    let reports = app.folders.create_folder(&ctx, folder("Reports", None)).await.unwrap();
    let late = app
        .folders
        .create_folder(&ctx, folder("Late", Some(reports.id)))
        .await
        .unwrap();
    app.upload_pdf(&ctx, "late.pdf", Some(late.id)).await;
    let service = lagging_service(&app, vec![late.id]);

    let deletion = service.delete_folder(&ctx, reports.id).await.unwrap();

    assert_eq!(deletion.folders_deleted, 2);
    assert_eq!(deletion.files_deleted, 1);
    assert_eq!(app.objects.object_count(Bucket::Files), 0);
}
