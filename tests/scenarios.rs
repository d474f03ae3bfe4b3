//! End-to-end scenarios against the in-memory remote
//!
//! Each test wires a full `Stash` around `InMemorySavedArticles` and checks
//! what a user would see after a sequence of actions.

use stash::{
    ArticleId, ArticleSummary, InMemorySavedArticles, KeyValueStore, LocalKeyValueStore,
    MemoryKeyValueStore, RemoteError, RemoteOperation, SaveAction, SavedStatus, Stash,
    StashConfig, StashError, SyncEvent, UserId, UserProfile,
};
use std::sync::Arc;

fn ada() -> UserProfile {
    UserProfile::new("u-1", "Ada", "ada@example.com")
}

async fn stash_with(remote: Arc<InMemorySavedArticles>) -> Stash {
    Stash::with_backends(
        StashConfig::default(),
        Arc::new(MemoryKeyValueStore::new()),
        remote,
    )
    .await
}

fn saved_count(stash: &Stash) -> u64 {
    stash
        .session()
        .current_profile()
        .map(|p| p.saved_articles_count)
        .unwrap_or_default()
}

#[tokio::test]
async fn test_first_save_from_empty_account() {
    let remote = Arc::new(InMemorySavedArticles::new());
    let stash = stash_with(remote.clone()).await;
    stash.sign_in(ada()).await.unwrap();
    assert_eq!(saved_count(&stash), 0);

    let relation = stash.observe(ArticleId::from("a-1"));
    assert_eq!(relation.refresh().await.unwrap(), SavedStatus::NotSaved);

    let outcome = stash.toggles().toggle(&relation).await;

    assert!(outcome.is_success());
    assert_eq!(outcome.action(), Some(SaveAction::Saved));
    assert_eq!(relation.status(), SavedStatus::Saved);
    assert_eq!(saved_count(&stash), 1);
    assert!(remote.is_saved(&UserId::from("u-1"), &ArticleId::from("a-1")));
}

#[tokio::test]
async fn test_toggle_twice_restores_everything() {
    let remote = Arc::new(InMemorySavedArticles::new());
    let stash = stash_with(remote.clone()).await;
    stash.sign_in(ada()).await.unwrap();
    let relation = stash.observe(ArticleId::from("a-1"));
    relation.refresh().await.unwrap();

    assert!(stash.toggles().toggle(&relation).await.is_success());
    let outcome = stash.toggles().toggle(&relation).await;

    assert_eq!(outcome.action(), Some(SaveAction::Removed));
    assert_eq!(relation.status(), SavedStatus::NotSaved);
    assert_eq!(saved_count(&stash), 0);
    assert!(!remote.is_saved(&UserId::from("u-1"), &ArticleId::from("a-1")));
}

#[tokio::test]
async fn test_second_toggle_while_pending_is_ignored() {
    let remote = Arc::new(InMemorySavedArticles::new());
    let stash = Arc::new(stash_with(remote.clone()).await);
    stash.sign_in(ada()).await.unwrap();
    let relation = stash.observe(ArticleId::from("a-1"));
    relation.refresh().await.unwrap();

    remote.pause(RemoteOperation::Save);
    let first = tokio::spawn({
        let stash = stash.clone();
        let relation = relation.clone();
        async move { stash.toggles().toggle(&relation).await }
    });
    remote.wait_for_calls(RemoteOperation::Save, 1).await;
    assert_eq!(relation.status(), SavedStatus::Saved);
    assert!(relation.is_toggling());

    let second = stash.toggles().toggle(&relation).await;
    assert!(second.is_skipped());

    remote.resume();
    let first = first.await.unwrap();
    assert!(first.is_success());
    assert_eq!(remote.call_count(RemoteOperation::Save), 1);
    assert_eq!(remote.call_count(RemoteOperation::Remove), 0);
    assert_eq!(relation.status(), SavedStatus::Saved);
}

#[tokio::test]
async fn test_network_failure_rolls_back() {
    let remote = Arc::new(InMemorySavedArticles::new());
    let stash = stash_with(remote.clone()).await;
    stash.sign_in(ada()).await.unwrap();
    let relation = stash.observe(ArticleId::from("a-1"));
    relation.refresh().await.unwrap();
    let mut events = stash.events().subscribe();

    remote.fail_next(
        RemoteOperation::Save,
        RemoteError::Transport("connection reset".to_string()),
    );
    let outcome = stash.toggles().toggle(&relation).await;

    assert!(!outcome.is_success());
    assert_eq!(outcome.status(), SavedStatus::NotSaved);
    assert_eq!(relation.status(), SavedStatus::NotSaved);
    assert!(!relation.is_toggling());
    assert_eq!(
        outcome.message().as_deref(),
        Some(stash::error::GENERIC_NETWORK_MESSAGE)
    );
    assert_eq!(saved_count(&stash), 0);
    assert_eq!(remote.call_count(RemoteOperation::Count), 1);
    assert!(matches!(
        events.recv().await.unwrap(),
        SyncEvent::ToggleFailed { .. }
    ));
}

#[tokio::test]
async fn test_rejection_message_reaches_the_user() {
    let remote = Arc::new(InMemorySavedArticles::new());
    let stash = stash_with(remote.clone()).await;
    stash.sign_in(ada()).await.unwrap();
    let relation = stash.observe(ArticleId::from("a-1"));
    relation.refresh().await.unwrap();

    remote.fail_next(
        RemoteOperation::Save,
        RemoteError::rejected("You can save at most 500 articles"),
    );
    let outcome = stash.toggles().toggle(&relation).await;

    assert_eq!(
        outcome.message().as_deref(),
        Some("You can save at most 500 articles")
    );
    assert_eq!(relation.status(), SavedStatus::NotSaved);
}

#[tokio::test]
async fn test_list_and_count_stay_consistent_on_removal() {
    let remote = Arc::new(
        InMemorySavedArticles::new().with_article("a-2", ArticleSummary::titled("Ownership")),
    );
    for article in ["a-1", "a-2", "a-3"] {
        remote.seed_saved("u-1", article);
    }
    let stash = stash_with(remote.clone()).await;
    stash.sign_in(ada()).await.unwrap();
    assert_eq!(saved_count(&stash), 3);

    let user = UserId::from("u-1");
    let snapshot = stash.saved_list().refresh(&user).await.unwrap();
    assert_eq!(snapshot.len(), 3);
    assert_eq!(snapshot.count, 3);

    let removal = stash
        .saved_list()
        .remove_one(&user, &ArticleId::from("a-2"))
        .await
        .unwrap();

    assert_eq!(removal.count, 2);
    let snapshot = stash.saved_list().snapshot();
    assert_eq!(snapshot.len(), 2);
    assert!(!snapshot.contains(&ArticleId::from("a-2")));
    assert_eq!(saved_count(&stash), 2);
}

#[tokio::test]
async fn test_failed_removal_changes_nothing() {
    let remote = Arc::new(InMemorySavedArticles::new());
    remote.seed_saved("u-1", "a-1");
    let stash = stash_with(remote.clone()).await;
    stash.sign_in(ada()).await.unwrap();
    let user = UserId::from("u-1");
    stash.saved_list().refresh(&user).await.unwrap();

    remote.fail_next(
        RemoteOperation::Remove,
        RemoteError::Transport("timeout".to_string()),
    );
    let result = stash
        .saved_list()
        .remove_one(&user, &ArticleId::from("a-1"))
        .await;

    assert!(matches!(result, Err(StashError::Transport { .. })));
    assert_eq!(stash.saved_list().snapshot().len(), 1);
    assert_eq!(stash.saved_list().count(), 1);
    assert_eq!(saved_count(&stash), 1);
}

#[tokio::test]
async fn test_signed_out_toggle_never_reaches_remote() {
    let remote = Arc::new(InMemorySavedArticles::new());
    let stash = stash_with(remote.clone()).await;

    let relation = stash.observe(ArticleId::from("a-1"));
    assert_eq!(relation.status(), SavedStatus::NotSaved);
    let outcome = stash.toggles().toggle(&relation).await;

    assert_eq!(
        outcome.message().as_deref(),
        Some("Please sign in to save articles.")
    );
    assert!(remote.calls().is_empty());
}

#[tokio::test]
async fn test_relation_bound_to_previous_user_is_refused_after_sign_out() {
    let remote = Arc::new(InMemorySavedArticles::new());
    let stash = stash_with(remote.clone()).await;
    stash.sign_in(ada()).await.unwrap();
    let relation = stash.observe(ArticleId::from("a-1"));

    stash.sign_out().await.unwrap();
    let outcome = stash.toggles().toggle(&relation).await;

    assert!(!outcome.is_success());
    assert_eq!(remote.call_count(RemoteOperation::Save), 0);
}

#[tokio::test]
async fn test_observers_of_same_pair_share_state() {
    let remote = Arc::new(InMemorySavedArticles::new());
    let stash = stash_with(remote.clone()).await;
    stash.sign_in(ada()).await.unwrap();

    let header = stash.observe(ArticleId::from("a-1"));
    let footer = stash.observe(ArticleId::from("a-1"));
    assert!(Arc::ptr_eq(&header, &footer));

    stash.toggles().toggle(&header).await;
    assert_eq!(footer.status(), SavedStatus::Saved);

    let detached = stash.observe_detached(ArticleId::from("a-1"));
    assert_eq!(detached.status(), SavedStatus::Unknown);
}

#[tokio::test]
async fn test_session_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let remote = Arc::new(InMemorySavedArticles::new());
    remote.seed_saved("u-1", "a-1");

    {
        let store: Arc<dyn KeyValueStore> =
            Arc::new(LocalKeyValueStore::with_path(dir.path().to_path_buf()));
        let stash = Stash::with_backends(StashConfig::default(), store, remote.clone()).await;
        stash.sign_in(ada()).await.unwrap();
    }

    let store: Arc<dyn KeyValueStore> =
        Arc::new(LocalKeyValueStore::with_path(dir.path().to_path_buf()));
    let stash = Stash::with_backends(StashConfig::default(), store, remote).await;

    let profile = stash.session().current_profile().unwrap();
    assert_eq!(profile.id, UserId::from("u-1"));
    assert_eq!(profile.saved_articles_count, 1);
}

#[tokio::test]
async fn test_sign_out_announces_session_change() {
    let remote = Arc::new(InMemorySavedArticles::new());
    let stash = stash_with(remote).await;
    stash.sign_in(ada()).await.unwrap();
    let mut events = stash.events().subscribe();

    stash.sign_out().await.unwrap();

    assert!(!stash.session().is_authenticated());
    assert_eq!(
        events.recv().await.unwrap(),
        SyncEvent::SessionChanged { user_id: None }
    );
}

#[tokio::test]
async fn test_open_stores_profile_under_configured_data_dir() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = StashConfig::default();
    config.storage.data_dir = Some(dir.path().to_path_buf());

    let stash = Stash::open(config).await.unwrap();
    assert!(!stash.session().is_authenticated());

    stash.session().authenticate(ada()).await.unwrap();
    assert!(dir.path().join("user_profile.json").exists());
}
