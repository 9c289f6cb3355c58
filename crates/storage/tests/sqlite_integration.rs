use chrono::Duration;
use quest_core::model::{LevelIndex, Profile, ProgressMark, UserId};
use quest_core::time::fixed_now;
use storage::repository::{ProfileRepository, ProgressRepository, Storage};
use storage::sqlite::SqliteRepository;

fn user(handle: &str) -> UserId {
    UserId::new(handle).unwrap()
}

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

#[tokio::test]
async fn sqlite_progress_is_monotonic_until_reset() {
    let repo = connect("memdb_progress").await;
    let ada = user("ada");

    assert_eq!(repo.read_progress(&ada).await.unwrap(), ProgressMark::ZERO);

    repo.record_level_completion(&ada, LevelIndex::new(1), fixed_now())
        .await
        .unwrap();
    // a late write for an earlier level must not lower the stored mark
    repo.record_level_completion(&ada, LevelIndex::new(0), fixed_now())
        .await
        .unwrap();
    assert_eq!(repo.read_progress(&ada).await.unwrap(), ProgressMark::new(2));

    repo.reset_progress(&ada, fixed_now() + Duration::minutes(1))
        .await
        .unwrap();
    assert_eq!(repo.read_progress(&ada).await.unwrap(), ProgressMark::ZERO);

    repo.record_level_completion(&ada, LevelIndex::new(0), fixed_now())
        .await
        .unwrap();
    assert_eq!(repo.read_progress(&ada).await.unwrap(), ProgressMark::new(1));
}

#[tokio::test]
async fn sqlite_lists_progress_for_all_users() {
    let repo = connect("memdb_list").await;
    let later = fixed_now() + Duration::hours(1);

    repo.record_level_completion(&user("zed"), LevelIndex::new(0), fixed_now())
        .await
        .unwrap();
    repo.record_level_completion(&user("amy"), LevelIndex::new(1), later)
        .await
        .unwrap();

    let records = repo.list_progress().await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].user_id, user("amy"));
    assert_eq!(records[0].mark, ProgressMark::new(2));
    assert_eq!(records[0].updated_at, later);
    assert_eq!(records[1].user_id, user("zed"));
}

#[tokio::test]
async fn sqlite_profiles_upsert() {
    let repo = connect("memdb_profiles").await;
    let ada = user("ada");

    assert!(repo.get_profile(&ada).await.unwrap().is_none());

    repo.save_profile(&ada, &Profile::from_name("Ada").unwrap(), fixed_now())
        .await
        .unwrap();
    repo.save_profile(&ada, &Profile::from_name("Ada L.").unwrap(), fixed_now())
        .await
        .unwrap();

    let profile = repo.get_profile(&ada).await.unwrap().unwrap();
    assert_eq!(profile.display_name(), "Ada L.");
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let repo = connect("memdb_migrate_twice").await;
    repo.migrate().await.expect("second migrate");

    let storage = Storage::sqlite("sqlite:file:memdb_migrate_twice?mode=memory&cache=shared")
        .await
        .expect("storage");
    assert_eq!(
        storage.progress.read_progress(&user("nobody")).await.unwrap(),
        ProgressMark::ZERO
    );
}
