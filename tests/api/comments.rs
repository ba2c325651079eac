use mangashelf::{
    achievements::count_own_comments,
    comments::{CachedComment, CommentFeed},
    error::Error,
    storage::read_json,
};
use serde_json::{Value, json};

use crate::helpers::spawn_app;

fn remote_comment(id: u64, chapter_id: &str, content: &str) -> Value {
    json!({
        "id": id,
        "user_name": "someone",
        "content": content,
        "likes_count": 1,
        "created_at": "2024-04-01T08:00:00Z",
        "updated_at": "2024-04-01T08:00:00Z",
        "is_edited": false,
        "chapter_id": chapter_id,
        "manga_id": null,
        "parent": null,
        "replies": [],
    })
}

#[tokio::test]
async fn thread_is_loaded_page_by_page() {
    let app = spawn_app().await;
    app.backend.seed_comments(vec![
        remote_comment(1, "c-1", "first"),
        remote_comment(2, "c-1", "second"),
        remote_comment(3, "c-1", "third"),
        remote_comment(4, "c-9", "elsewhere"),
    ]);
    let feed = CommentFeed::for_chapter(app.ctx.clone(), "c-1");

    feed.load().await.unwrap();
    assert_eq!(feed.comments().len(), 2);
    assert!(feed.has_more());

    feed.load_more().await.unwrap();
    let ids: Vec<String> = feed.comments().into_iter().map(|c| c.id).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
    assert!(!feed.has_more());

    let pages = app.backend.calls_to("GET", "/api/comments/");
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].query.as_deref(), Some("chapter=c-1"));
    assert_eq!(pages[1].query.as_deref(), Some("chapter=c-1&page=2"));

    // Last page reached, nothing else is requested.
    feed.load_more().await.unwrap();
    assert_eq!(app.backend.calls_to("GET", "/api/comments/").len(), 2);
}

#[tokio::test]
async fn guests_cannot_write() {
    let app = spawn_app().await;
    let feed = CommentFeed::for_manga(app.ctx.clone(), "m-1");

    let error = feed.post("hello").await.unwrap_err();

    assert!(matches!(error, Error::Unauthenticated));
    assert!(app.backend.calls().is_empty());
}

#[tokio::test]
async fn blank_comments_are_rejected() {
    let app = spawn_app().await;
    app.sign_in_as_new_user().await;
    let feed = CommentFeed::for_manga(app.ctx.clone(), "m-1");

    let error = feed.post("   ").await.unwrap_err();

    assert!(matches!(error, Error::Validation(_)));
    assert!(app.backend.calls_to("POST", "/api/comments/").is_empty());
}

#[tokio::test]
async fn own_comments_update_the_thread_and_local_cache() {
    let app = spawn_app().await;
    let user = app.sign_in_as_new_user().await;
    app.backend.seed_comments(vec![remote_comment(1, "c-1", "first")]);
    let feed = CommentFeed::for_chapter(app.ctx.clone(), "c-1");
    feed.load().await.unwrap();

    feed.post("  my take  ").await.unwrap();
    let comments = feed.comments();
    assert_eq!(comments.len(), 2);
    assert_eq!(comments[0].content, "my take");
    assert_eq!(comments[0].user_name, user.username);
    let posted = app.backend.calls_to("POST", "/api/comments/");
    assert_eq!(posted[0].body, json!({"content": "my take", "chapter_id": "c-1"}));

    feed.reply("1", "agreed").await.unwrap();
    let parent = feed.comments().into_iter().find(|c| c.id == "1").unwrap();
    assert_eq!(parent.replies.len(), 1);
    assert_eq!(parent.replies[0].content, "agreed");
    let reply_id = parent.replies[0].id.clone();

    feed.edit(&reply_id, "strongly agreed").await.unwrap();
    let parent = feed.comments().into_iter().find(|c| c.id == "1").unwrap();
    assert_eq!(parent.replies[0].content, "strongly agreed");
    assert!(parent.replies[0].is_edited);

    feed.like("1").await.unwrap();
    let parent = feed.comments().into_iter().find(|c| c.id == "1").unwrap();
    assert_eq!(parent.likes_count, 2);
    assert_eq!(parent.user_has_liked, Some(true));

    let own_id = comments[0].id.clone();
    feed.delete(&own_id).await.unwrap();
    assert!(feed.comments().iter().all(|c| c.id != own_id));

    let cached: Vec<CachedComment> = read_json(&app.store, "comments_c-1").unwrap();
    assert_eq!(cached.len(), 2);
    assert!(cached.iter().all(|c| c.user == "أنت"));
    assert_eq!(count_own_comments(&app.store), 2);
}
