//! End-to-end flows over the in-memory store and object storage.

mod helpers;

mod file_test;
mod folder_test;
mod summary_test;
mod upload_test;
mod workspace_test;
