use std::time::Duration;

use mangashelf::{
    achievements::{AchievementTracker, SECRET_NIGHT},
    library::Library,
    storage::{LocalStore, keys, read_json},
};
use serde_json::json;

use crate::helpers::{TestApp, manga, spawn_app};

fn noon() -> u32 {
    12
}

fn four_am() -> u32 {
    4
}

async fn library_with_one_read(app: &TestApp) -> Library {
    let library = Library::new(app.ctx.clone());
    library.mount().await;
    library.add_to_history(&manga(1), "c-1", Some(1.0)).await;
    library
}

#[tokio::test]
async fn first_read_unlocks_locally_for_guests() {
    let app = spawn_app().await;
    let library = library_with_one_read(&app).await;
    let tracker = AchievementTracker::new(app.ctx.clone()).with_hour_source(noon);

    let surfaced = tracker.evaluate(&library).await.unwrap();

    assert_eq!(surfaced.id, "read_1");
    assert_eq!(tracker.toast().unwrap().id, "read_1");
    assert_eq!(tracker.unlocked(), vec!["read_1".to_string()]);
    let stored: Vec<String> = read_json(&app.store, keys::UNLOCKED_ACHIEVEMENTS).unwrap();
    assert_eq!(stored, vec!["read_1".to_string()]);

    // Nothing new the second time round.
    assert!(tracker.evaluate(&library).await.is_none());
}

#[tokio::test]
async fn reading_at_night_surfaces_the_secret() {
    let app = spawn_app().await;
    let library = library_with_one_read(&app).await;
    let tracker = AchievementTracker::new(app.ctx.clone()).with_hour_source(four_am);

    let surfaced = tracker.evaluate(&library).await.unwrap();

    assert_eq!(surfaced.id, SECRET_NIGHT);
    assert_eq!(
        tracker.unlocked(),
        vec!["read_1".to_string(), SECRET_NIGHT.to_string()]
    );
}

#[tokio::test]
async fn reading_time_and_comments_count_towards_achievements() {
    let app = spawn_app().await;
    app.store.set(keys::TOTAL_READING_SECONDS, "3700").unwrap();
    app.store
        .set(
            "comments_c-1",
            &json!([{"id": "1", "user": "أنت", "text": "hi", "time": "now"}]).to_string(),
        )
        .unwrap();
    let library = Library::new(app.ctx.clone());
    library.mount().await;
    let tracker = AchievementTracker::new(app.ctx.clone()).with_hour_source(noon);

    let surfaced = tracker.evaluate(&library).await.unwrap();

    assert_eq!(surfaced.id, "time_1h");
    assert_eq!(
        tracker.unlocked(),
        vec!["time_1m".to_string(), "time_1h".to_string()]
    );
}

#[tokio::test]
async fn backend_decides_for_signed_in_users() {
    let app = spawn_app().await;
    app.sign_in_as_new_user().await;
    app.backend.seed_achievements(
        &["read_1"],
        vec![json!({"id": 55, "name": "Bookworm", "name_ar": "دودة كتب", "reward_points": 50})],
    );
    let library = library_with_one_read(&app).await;
    let tracker = AchievementTracker::new(app.ctx.clone()).with_hour_source(noon);

    let surfaced = tracker.evaluate(&library).await.unwrap();

    assert_eq!(surfaced.id, "read_10");
    assert_eq!(
        tracker.unlocked(),
        vec!["read_1".to_string(), "read_10".to_string()]
    );
    assert_eq!(app.backend.calls_to("GET", "/api/achievements/my/").len(), 1);
    assert_eq!(app.backend.calls_to("POST", "/api/achievements/check/").len(), 1);
    assert!(app.store.get(keys::UNLOCKED_ACHIEVEMENTS).is_none());
}

#[tokio::test]
async fn backend_failure_falls_back_to_local_rules() {
    let app = spawn_app().await;
    app.sign_in_as_new_user().await;
    let library = library_with_one_read(&app).await;
    app.backend.set_failing(true);
    let tracker = AchievementTracker::new(app.ctx.clone()).with_hour_source(noon);

    let surfaced = tracker.evaluate(&library).await.unwrap();

    assert_eq!(surfaced.id, "read_1");
    assert_eq!(tracker.unlocked(), vec!["read_1".to_string()]);
}

#[tokio::test]
async fn unchanged_inputs_do_not_re_evaluate() {
    let app = spawn_app().await;
    app.sign_in_as_new_user().await;
    let library = library_with_one_read(&app).await;
    let tracker = AchievementTracker::new(app.ctx.clone()).with_hour_source(noon);

    tracker.on_change(&library).await;
    tracker.on_change(&library).await;
    assert_eq!(app.backend.calls_to("POST", "/api/achievements/check/").len(), 1);

    library.toggle_bookmark(&manga(3)).await;
    tracker.on_change(&library).await;
    assert_eq!(app.backend.calls_to("POST", "/api/achievements/check/").len(), 2);
}

#[tokio::test]
async fn toast_closes_by_itself() {
    let app = spawn_app().await;
    let library = library_with_one_read(&app).await;
    let tracker = AchievementTracker::new(app.ctx.clone()).with_hour_source(noon);

    tokio::time::pause();
    tracker.evaluate(&library).await;
    assert!(tracker.toast().is_some());

    tokio::time::advance(Duration::from_secs(4)).await;
    assert!(tracker.toast().is_some());

    tokio::time::advance(Duration::from_secs(2)).await;
    assert!(tracker.toast().is_none());
    assert_eq!(tracker.unlocked(), vec!["read_1".to_string()]);
}

#[tokio::test]
async fn toast_can_be_closed_early() {
    let app = spawn_app().await;
    let library = library_with_one_read(&app).await;
    let tracker = AchievementTracker::new(app.ctx.clone()).with_hour_source(noon);

    tracker.evaluate(&library).await;
    tracker.close_toast();

    assert!(tracker.toast().is_none());
}
