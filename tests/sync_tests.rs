//! Integration tests for the repository syncer against real git repositories

mod common;

use assert_matches::assert_matches;
use common::{commit_file, file_url, git, head, snapshot, TestEnvironment};
use orgmirror::{LocalState, RepositorySyncer, SyncAction, SyncError};
use std::fs;
use std::time::Duration;

fn syncer() -> RepositorySyncer {
    RepositorySyncer::without_credentials(Duration::from_secs(60))
}

#[tokio::test]
async fn test_sync_clones_absent_repository() {
    let env = TestEnvironment::new();
    let url = env.create_source("api");
    let local = env.mirror().join("acme").join("api");

    let action = syncer().sync(&local, &url).await.expect("clone succeeds");

    assert_eq!(action, SyncAction::Cloned);
    assert_eq!(
        fs::read_to_string(local.join("README.md")).expect("README cloned"),
        "# Test\n"
    );
    assert_eq!(head(&local), head(&env.upstream("api")));
    assert_eq!(git(&local, &["remote", "get-url", "origin"]), url);
    assert_eq!(syncer().inspect(&local).await, LocalState::WorkingCopy);
}

#[tokio::test]
async fn test_second_sync_without_upstream_changes_is_noop_update() {
    let env = TestEnvironment::new();
    let url = env.create_source("api");
    let local = env.mirror().join("acme").join("api");

    syncer().sync(&local, &url).await.expect("clone succeeds");
    let before_head = head(&local);
    let before_files = snapshot(&local);

    let action = syncer().sync(&local, &url).await.expect("update succeeds");

    assert_eq!(action, SyncAction::Updated);
    assert_eq!(head(&local), before_head);
    assert_eq!(snapshot(&local), before_files);
}

#[tokio::test]
async fn test_sync_fast_forwards_new_upstream_commits() {
    let env = TestEnvironment::new();
    let url = env.create_source("api");
    let upstream = env.upstream("api");
    let local = env.mirror().join("acme").join("api");

    syncer().sync(&local, &url).await.expect("clone succeeds");
    commit_file(&upstream, "CHANGELOG.md", "v2\n", "Second commit");
    let upstream_head = commit_file(&upstream, "NOTES.md", "notes\n", "Third commit");

    let action = syncer().sync(&local, &url).await.expect("update succeeds");

    assert_eq!(action, SyncAction::Updated);
    assert_eq!(head(&local), upstream_head);
    assert_eq!(
        fs::read_to_string(local.join("NOTES.md")).expect("new file present"),
        "notes\n"
    );
}

#[tokio::test]
async fn test_local_commit_is_reported_as_diverged_and_left_alone() {
    let env = TestEnvironment::new();
    let url = env.create_source("api");
    let local = env.mirror().join("acme").join("api");

    syncer().sync(&local, &url).await.expect("clone succeeds");
    let local_head = commit_file(&local, "local.txt", "mine\n", "Local work");
    let before_files = snapshot(&local);

    let result = syncer().sync(&local, &url).await;

    assert_matches!(result, Err(SyncError::Diverged { ahead: 1, behind: 0 }));
    assert_eq!(head(&local), local_head);
    assert_eq!(snapshot(&local), before_files);
}

#[tokio::test]
async fn test_diverged_history_is_never_merged() {
    let env = TestEnvironment::new();
    let url = env.create_source("api");
    let upstream = env.upstream("api");
    let local = env.mirror().join("acme").join("api");

    syncer().sync(&local, &url).await.expect("clone succeeds");
    let local_head = commit_file(&local, "local.txt", "mine\n", "Local work");
    commit_file(&upstream, "remote.txt", "theirs\n", "Remote work");
    let before_files = snapshot(&local);

    let result = syncer().sync(&local, &url).await;

    assert_matches!(result, Err(SyncError::Diverged { ahead: 1, behind: 1 }));
    assert_eq!(head(&local), local_head);
    assert_eq!(snapshot(&local), before_files);
    assert!(!local.join("remote.txt").exists());
}

#[tokio::test]
async fn test_plain_directory_is_corrupt_and_untouched() {
    let env = TestEnvironment::new();
    let url = env.create_source("api");
    let local = env.mirror().join("acme").join("api");
    fs::create_dir_all(&local).expect("create dir");
    fs::write(local.join("notes.txt"), "keep me").expect("write file");

    let result = syncer().sync(&local, &url).await;

    assert_matches!(result, Err(SyncError::CorruptLocalState(reason)) if reason.contains("not a git working copy"));
    assert_eq!(
        fs::read_to_string(local.join("notes.txt")).expect("file kept"),
        "keep me"
    );
    assert!(!local.join("README.md").exists());
}

#[tokio::test]
async fn test_regular_file_at_backup_path_is_corrupt() {
    let env = TestEnvironment::new();
    let url = env.create_source("api");
    let local = env.mirror().join("acme").join("api");
    fs::create_dir_all(local.parent().expect("parent")).expect("create dir");
    fs::write(&local, "not a repository").expect("write file");

    let result = syncer().sync(&local, &url).await;

    assert_matches!(result, Err(SyncError::CorruptLocalState(reason)) if reason.contains("not a directory"));
    assert_eq!(
        fs::read_to_string(&local).expect("file kept"),
        "not a repository"
    );
}

#[tokio::test]
async fn test_working_copy_without_origin_is_corrupt() {
    let env = TestEnvironment::new();
    let url = env.create_source("api");
    let local = env.mirror().join("acme").join("api");

    syncer().sync(&local, &url).await.expect("clone succeeds");
    git(&local, &["remote", "remove", "origin"]);

    let result = syncer().sync(&local, &url).await;

    assert_matches!(result, Err(SyncError::CorruptLocalState(reason)) if reason.starts_with("no origin remote"));
    assert_matches!(syncer().inspect(&local).await, LocalState::Invalid(_));
}

#[tokio::test]
async fn test_interrupted_clone_without_refs_is_corrupt() {
    let env = TestEnvironment::new();
    let url = env.create_source("api");
    let local = env.mirror().join("acme").join("api");

    // What a clone killed before its first ref was written leaves behind
    fs::create_dir_all(&local).expect("create dir");
    git(&local, &["init", "-q", "-b", "main"]);
    git(&local, &["remote", "add", "origin", &url]);

    assert_matches!(
        syncer().inspect(&local).await,
        LocalState::Invalid(reason) if reason.contains("incomplete clone")
    );
    let result = syncer().sync(&local, &url).await;

    assert_matches!(result, Err(SyncError::CorruptLocalState(reason)) if reason.contains("incomplete clone"));
    assert!(!local.join("README.md").exists());
}

#[tokio::test]
async fn test_missing_index_is_corrupt() {
    let env = TestEnvironment::new();
    let url = env.create_source("api");
    let local = env.mirror().join("acme").join("api");

    syncer().sync(&local, &url).await.expect("clone succeeds");
    fs::remove_file(local.join(".git").join("index")).expect("remove index");
    fs::remove_file(local.join("README.md")).expect("remove file");

    let result = syncer().sync(&local, &url).await;

    assert_matches!(result, Err(SyncError::CorruptLocalState(reason)) if reason.contains("index is missing"));
    assert!(!local.join("README.md").exists());
}

#[tokio::test]
async fn test_modified_working_tree_blocks_fast_forward() {
    let env = TestEnvironment::new();
    let url = env.create_source("api");
    let upstream = env.upstream("api");
    let local = env.mirror().join("acme").join("api");

    syncer().sync(&local, &url).await.expect("clone succeeds");
    let local_head = head(&local);
    fs::write(local.join("README.md"), "edited by hand\n").expect("edit file");
    commit_file(&upstream, "README.md", "upstream edit\n", "Upstream edit");

    let result = syncer().sync(&local, &url).await;

    assert_matches!(result, Err(SyncError::UncommittedChanges { files: 1 }));
    assert_eq!(head(&local), local_head);
    assert_eq!(
        fs::read_to_string(local.join("README.md")).expect("file kept"),
        "edited by hand\n"
    );
}

#[tokio::test]
async fn test_files_missing_from_checkout_are_reported() {
    let env = TestEnvironment::new();
    let url = env.create_source("api");
    let local = env.mirror().join("acme").join("api");

    syncer().sync(&local, &url).await.expect("clone succeeds");
    fs::remove_file(local.join("README.md")).expect("remove file");

    let result = syncer().sync(&local, &url).await;

    assert_matches!(result, Err(SyncError::UncommittedChanges { files: 1 }));
    assert_matches!(syncer().inspect(&local).await, LocalState::Invalid(_));
}

#[tokio::test]
async fn test_failed_clone_leaves_no_directory() {
    let env = TestEnvironment::new();
    let missing = env.upstream("does-not-exist");
    let local = env.mirror().join("acme").join("ghost");

    let result = syncer().sync(&local, &file_url(&missing)).await;

    assert_matches!(result, Err(SyncError::Subprocess { command, .. }) if command == "git clone");
    assert!(!local.exists());
    assert_eq!(syncer().inspect(&local).await, LocalState::Absent);
}

#[tokio::test]
async fn test_empty_upstream_can_be_mirrored_repeatedly() {
    let env = TestEnvironment::new();
    let upstream = env.upstream("empty");
    fs::create_dir_all(&upstream).expect("create dir");
    git(&upstream, &["init", "-q", "-b", "main"]);
    let url = file_url(&upstream);
    let local = env.mirror().join("acme").join("empty");

    assert_eq!(
        syncer().sync(&local, &url).await.expect("clone succeeds"),
        SyncAction::Cloned
    );
    assert_eq!(
        syncer().sync(&local, &url).await.expect("update succeeds"),
        SyncAction::Updated
    );
}

#[tokio::test]
async fn test_check_available_reports_git_version() {
    let version = syncer().check_available().await.expect("git on PATH");
    assert!(version.starts_with("git version"));
}
