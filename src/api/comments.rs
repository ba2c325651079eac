use reqwest::{Method, header::HeaderMap};
use serde::{Deserialize, Serialize};

use crate::{error::Error, model::Comment};

use super::{ListBody, RemoteClient, send_empty, send_json};

/// What a comment thread hangs off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentTarget {
    Chapter(String),
    Manga(String),
}

impl CommentTarget {
    pub fn id(&self) -> &str {
        match self {
            CommentTarget::Chapter(id) | CommentTarget::Manga(id) => id,
        }
    }

    fn query(&self) -> (&'static str, &str) {
        match self {
            CommentTarget::Chapter(id) => ("chapter", id),
            CommentTarget::Manga(id) => ("manga", id),
        }
    }
}

#[derive(Serialize, Debug, Default)]
pub struct NewComment<'a> {
    pub content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chapter_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manga_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<&'a str>,
}

impl<'a> NewComment<'a> {
    pub fn on(target: &'a CommentTarget, content: &'a str) -> Self {
        let mut comment = NewComment {
            content,
            ..Default::default()
        };
        match target {
            CommentTarget::Chapter(id) => comment.chapter_id = Some(id),
            CommentTarget::Manga(id) => comment.manga_id = Some(id),
        }
        comment
    }
}

#[derive(Serialize)]
struct UpdateComment<'a> {
    content: &'a str,
}

#[derive(Deserialize, Debug)]
pub struct LikeResponse {
    pub liked: bool,
    pub likes_count: u64,
}

/// First page of a thread. The returned body keeps the `next` link.
#[tracing::instrument(name = "[GET] comments", skip(client, auth))]
pub async fn list(
    client: &RemoteClient,
    auth: &HeaderMap,
    target: &CommentTarget,
) -> Result<ListBody<Comment>, Error> {
    send_json(
        client
            .request(Method::GET, "/comments/", auth)
            .query(&[target.query()]),
    )
    .await
}

#[tracing::instrument(name = "[GET] comments page", skip(client, auth))]
pub async fn page(
    client: &RemoteClient,
    auth: &HeaderMap,
    next_url: &str,
) -> Result<ListBody<Comment>, Error> {
    send_json(client.request_url(Method::GET, next_url, auth)).await
}

#[tracing::instrument(name = "[POST] comments", skip(client, auth))]
pub async fn create(
    client: &RemoteClient,
    auth: &HeaderMap,
    comment: &NewComment<'_>,
) -> Result<Comment, Error> {
    send_json(client.request(Method::POST, "/comments/", auth).json(comment)).await
}

#[tracing::instrument(name = "[PATCH] comments", skip(client, auth, content))]
pub async fn update(
    client: &RemoteClient,
    auth: &HeaderMap,
    id: &str,
    content: &str,
) -> Result<Comment, Error> {
    send_json(
        client
            .request(Method::PATCH, &format!("/comments/{id}/"), auth)
            .json(&UpdateComment { content }),
    )
    .await
}

#[tracing::instrument(name = "[DELETE] comments", skip(client, auth))]
pub async fn delete(client: &RemoteClient, auth: &HeaderMap, id: &str) -> Result<(), Error> {
    send_empty(client.request(Method::DELETE, &format!("/comments/{id}/"), auth)).await
}

#[tracing::instrument(name = "[POST] comments like", skip(client, auth))]
pub async fn toggle_like(
    client: &RemoteClient,
    auth: &HeaderMap,
    id: &str,
) -> Result<LikeResponse, Error> {
    send_json(client.request(Method::POST, &format!("/comments/{id}/like/"), auth)).await
}
