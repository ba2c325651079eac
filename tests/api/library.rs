use std::{collections::BTreeMap, sync::Arc, time::Duration};

use mangashelf::{
    library::{Library, Phase},
    model::{HistoryItem, MangaSummary},
    storage::{LocalStore, keys, read_json, write_json},
};
use serde_json::json;

use crate::helpers::{manga, spawn_app};

#[tokio::test]
async fn guest_mount_drops_legacy_entries() {
    let app = spawn_app().await;
    let legacy = MangaSummary {
        id: "12".into(),
        title: "Old".into(),
        image_url: String::new(),
        author: String::new(),
        chapter_count: 0,
    };
    write_json(&app.store, keys::BOOKMARKS, &[legacy, manga(1)]).unwrap();
    write_json(
        &app.store,
        keys::HISTORY,
        &[
            HistoryItem {
                manga_id: manga(2).id,
                manga_title: "Manga".into(),
                chapter_id: "c-1".into(),
                chapter_number: None,
                image_url: String::new(),
                timestamp: 1,
            },
            HistoryItem {
                manga_id: manga(3).id,
                manga_title: "Manga 3".into(),
                chapter_id: "c-2".into(),
                chapter_number: Some(2.0),
                image_url: String::new(),
                timestamp: 2,
            },
        ],
    )
    .unwrap();

    let library = Library::new(app.ctx.clone());
    library.mount().await;

    assert_eq!(library.phase(), Phase::LocalAuthoritative);
    assert_eq!(library.bookmarks(), vec![manga(1)]);
    assert_eq!(library.history().len(), 1);
    assert_eq!(library.history()[0].manga_id, manga(3).id);

    let stored: Vec<MangaSummary> = read_json(&app.store, keys::BOOKMARKS).unwrap();
    assert_eq!(stored, vec![manga(1)]);
    assert!(app.backend.calls().is_empty());
}

#[tokio::test]
async fn remote_lists_replace_local_ones() {
    let app = spawn_app().await;
    let user = app.sign_in_as_new_user().await;
    write_json(&app.store, keys::BOOKMARKS, &[manga(1)]).unwrap();
    app.backend
        .seed_bookmarks(user.id, &[(manga(5).id.as_str(), "Remote Five")]);
    app.backend.seed_history(
        user.id,
        vec![json!({
            "chapter_id": 901,
            "manga_id": manga(5).id,
            "manga_title": "Remote Five",
            "chapter_number": "3",
            "last_read": "2024-03-01T12:00:00Z",
        })],
    );

    let library = Library::new(app.ctx.clone());
    library.mount().await;

    assert_eq!(library.phase(), Phase::RemoteAuthoritative);
    let bookmarks = library.bookmarks();
    assert_eq!(bookmarks.len(), 1);
    assert_eq!(bookmarks[0].id, manga(5).id);
    assert_eq!(bookmarks[0].title, "Remote Five");

    let history = library.history();
    assert_eq!(history[0].chapter_id, "901");
    assert_eq!(history[0].chapter_number, Some(3.0));

    let stored: Vec<HistoryItem> = read_json(&app.store, keys::HISTORY).unwrap();
    assert_eq!(stored, history);
}

#[tokio::test]
async fn unreachable_backend_keeps_local_library() {
    let app = spawn_app().await;
    app.sign_in_as_new_user().await;
    write_json(&app.store, keys::BOOKMARKS, &[manga(1), manga(2)]).unwrap();
    app.backend.set_failing(true);

    let library = Library::new(app.ctx.clone());
    library.mount().await;

    assert_eq!(library.phase(), Phase::LocalFallback);
    assert_eq!(library.bookmarks(), vec![manga(1), manga(2)]);
}

#[tokio::test]
async fn authenticated_toggle_follows_backend() {
    let app = spawn_app().await;
    let user = app.sign_in_as_new_user().await;
    let library = Library::new(app.ctx.clone());
    library.mount().await;

    assert!(library.toggle_bookmark(&manga(4)).await);
    assert!(library.is_bookmarked(&manga(4).id));
    assert_eq!(app.backend.remote_bookmarks(user.id), vec![manga(4).id]);

    assert!(!library.toggle_bookmark(&manga(4)).await);
    assert!(!library.is_bookmarked(&manga(4).id));
    assert!(app.backend.remote_bookmarks(user.id).is_empty());

    let toggles = app.backend.calls_to("POST", "/api/bookmarks/toggle/");
    assert_eq!(toggles.len(), 2);
    assert_eq!(toggles[0].body, json!({"manga_id": manga(4).id}));
}

#[tokio::test]
async fn guest_toggle_stays_local() {
    let app = spawn_app().await;
    let library = Library::new(app.ctx.clone());
    library.mount().await;

    assert!(library.toggle_bookmark(&manga(8)).await);
    assert!(!library.toggle_bookmark(&manga(8)).await);
    assert!(library.toggle_bookmark(&manga(8)).await);

    let stored: Vec<MangaSummary> = read_json(&app.store, keys::BOOKMARKS).unwrap();
    assert_eq!(stored, vec![manga(8)]);
    assert!(app.backend.calls().is_empty());
}

#[tokio::test]
async fn failed_toggle_is_replayed_on_next_load() {
    let app = spawn_app().await;
    let user = app.sign_in_as_new_user().await;
    let library = Library::new(app.ctx.clone());
    library.mount().await;

    app.backend.set_failing(true);
    assert!(library.toggle_bookmark(&manga(6)).await);
    assert!(library.is_bookmarked(&manga(6).id));
    assert_eq!(library.dirty_ids(), vec![manga(6).id]);
    assert!(app.store.get(keys::BOOKMARKS_DIRTY).is_some());

    app.backend.set_failing(false);
    let restarted = app.restart();
    let library = Library::new(restarted.ctx.clone());
    library.mount().await;

    assert_eq!(library.phase(), Phase::RemoteAuthoritative);
    assert!(library.dirty_ids().is_empty());
    assert!(library.is_bookmarked(&manga(6).id));
    assert_eq!(app.backend.remote_bookmarks(user.id), vec![manga(6).id]);
    assert!(restarted.store.get(keys::BOOKMARKS_DIRTY).is_none());
}

#[tokio::test]
async fn dirty_toggle_already_reflected_remotely_is_not_replayed() {
    let app = spawn_app().await;
    let user = app.sign_in_as_new_user().await;
    app.backend.seed_bookmarks(user.id, &[(manga(6).id.as_str(), "Manga 6")]);
    write_json(&app.store, keys::BOOKMARKS, &[manga(6)]).unwrap();
    write_json(
        &app.store,
        keys::BOOKMARKS_DIRTY,
        &BTreeMap::from([(manga(6).id, true)]),
    )
    .unwrap();

    let library = Library::new(app.ctx.clone());
    library.mount().await;

    assert!(app.backend.calls_to("POST", "/api/bookmarks/toggle/").is_empty());
    assert!(library.dirty_ids().is_empty());
    assert!(library.is_bookmarked(&manga(6).id));
}

#[tokio::test]
async fn disposed_library_ignores_late_responses() {
    let app = spawn_app().await;
    let user = app.sign_in_as_new_user().await;
    app.backend
        .seed_bookmarks(user.id, &[(manga(9).id.as_str(), "Remote Nine")]);
    write_json(&app.store, keys::BOOKMARKS, &[manga(1)]).unwrap();
    app.backend.set_delay(Duration::from_millis(500));

    let library = Arc::new(Library::new(app.ctx.clone()));
    let mounting = tokio::spawn({
        let library = library.clone();
        async move { library.mount().await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    library.dispose();
    mounting.await.unwrap();

    assert_eq!(library.phase(), Phase::LoadingRemote);
    assert_eq!(library.bookmarks(), vec![manga(1)]);
    let stored: Vec<MangaSummary> = read_json(&app.store, keys::BOOKMARKS).unwrap();
    assert_eq!(stored, vec![manga(1)]);
}

#[tokio::test]
async fn reading_the_same_chapter_twice_records_once() {
    let app = spawn_app().await;
    app.sign_in_as_new_user().await;
    let library = Library::new(app.ctx.clone());
    library.mount().await;

    library.add_to_history(&manga(2), "c-10", Some(10.0)).await;
    library.add_to_history(&manga(2), "c-10", Some(10.0)).await;

    let posts = app.backend.calls_to("POST", "/api/reading-history/");
    assert_eq!(posts.len(), 1);
    assert_eq!(
        posts[0].body,
        json!({"chapter_id": "c-10", "manga_id": manga(2).id})
    );
    assert_eq!(library.history().len(), 1);

    library.add_to_history(&manga(2), "c-11", Some(11.0)).await;
    let history = library.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].chapter_id, "c-11");
}

#[tokio::test]
async fn toggle_after_a_failed_one_keeps_local_intent() {
    let app = spawn_app().await;
    let user = app.sign_in_as_new_user().await;
    let library = Library::new(app.ctx.clone());
    library.mount().await;

    app.backend.set_failing(true);
    assert!(library.toggle_bookmark(&manga(6)).await);
    app.backend.set_failing(false);

    assert!(!library.toggle_bookmark(&manga(6)).await);

    assert!(!library.is_bookmarked(&manga(6).id));
    assert!(library.dirty_ids().is_empty());
    assert!(app.backend.remote_bookmarks(user.id).is_empty());
    assert!(app.store.get(keys::BOOKMARKS_DIRTY).is_none());
    let stored: Vec<MangaSummary> = read_json(&app.store, keys::BOOKMARKS).unwrap();
    assert!(stored.is_empty());
}

#[tokio::test]
async fn bookmark_membership_follows_toggle_parity_through_outages() {
    let app = spawn_app().await;
    let user = app.sign_in_as_new_user().await;
    let library = Library::new(app.ctx.clone());
    library.mount().await;

    for round in 1..=6 {
        app.backend.set_failing(round % 3 == 0);
        let member = library.toggle_bookmark(&manga(7)).await;
        assert_eq!(member, round % 2 == 1, "round {round}");
        assert_eq!(library.is_bookmarked(&manga(7).id), round % 2 == 1);
    }

    app.backend.set_failing(false);
    let restarted = app.restart();
    let library = Library::new(restarted.ctx.clone());
    library.mount().await;

    assert!(!library.is_bookmarked(&manga(7).id));
    assert!(app.backend.remote_bookmarks(user.id).is_empty());
}

#[tokio::test]
async fn malformed_history_rows_do_not_wipe_the_library() {
    let app = spawn_app().await;
    let user = app.sign_in_as_new_user().await;
    write_json(
        &app.store,
        keys::HISTORY,
        &[HistoryItem {
            manga_id: manga(2).id,
            manga_title: "Local Two".into(),
            chapter_id: "c-9".into(),
            chapter_number: None,
            image_url: String::new(),
            timestamp: 1,
        }],
    )
    .unwrap();
    app.backend.seed_history(
        user.id,
        vec![
            json!({
                "chapter_id": "c-4",
                "manga_id": manga(5).id,
                "manga_title": "Remote Five",
                "last_read": "2024-03-01T12:00:00Z",
            }),
            json!({
                "chapter_id": null,
                "manga_id": manga(6).id,
                "manga_title": "Broken",
            }),
        ],
    );

    let library = Library::new(app.ctx.clone());
    library.mount().await;

    assert_eq!(library.phase(), Phase::RemoteAuthoritative);
    let history = library.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].manga_id, manga(5).id);
    assert_eq!(history[0].chapter_id, "c-4");
    let stored: Vec<HistoryItem> = read_json(&app.store, keys::HISTORY).unwrap();
    assert_eq!(stored, history);
}

#[tokio::test]
async fn unrecognised_list_body_falls_back_to_local_state() {
    let app = spawn_app().await;
    app.sign_in_as_new_user().await;
    write_json(&app.store, keys::BOOKMARKS, &[manga(1)]).unwrap();
    app.backend.set_bookmarks_body(json!({"detail": "maintenance"}));

    let library = Library::new(app.ctx.clone());
    library.mount().await;

    assert_eq!(library.phase(), Phase::LocalFallback);
    assert_eq!(library.bookmarks(), vec![manga(1)]);
    let stored: Vec<MangaSummary> = read_json(&app.store, keys::BOOKMARKS).unwrap();
    assert_eq!(stored, vec![manga(1)]);
}

#[tokio::test]
async fn remote_history_keeps_one_entry_per_manga() {
    let app = spawn_app().await;
    let user = app.sign_in_as_new_user().await;
    let row = |chapter: &str, last_read: &str| {
        json!({
            "chapter_id": chapter,
            "manga_id": manga(5).id,
            "manga_title": "Remote Five",
            "last_read": last_read,
        })
    };
    app.backend.seed_history(
        user.id,
        vec![
            row("c-3", "2024-03-03T12:00:00Z"),
            row("c-2", "2024-03-02T12:00:00Z"),
            row("c-1", "2024-03-01T12:00:00Z"),
        ],
    );

    let library = Library::new(app.ctx.clone());
    library.mount().await;

    let history = library.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].chapter_id, "c-3");
}
