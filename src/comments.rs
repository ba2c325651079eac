//! Comment threads on a chapter or a manga.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::{
    achievements::SELF_AUTHOR,
    api::comments::{self as remote, CommentTarget, NewComment},
    context::SharedClientContext,
    error::Error,
    lifetime::Lifetime,
    model::Comment,
    storage::{self, keys},
};

/// Entry of the per-target local comment cache.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CachedComment {
    pub id: String,
    pub user: String,
    pub text: String,
    pub time: String,
    #[serde(default)]
    pub votes: u64,
    #[serde(default)]
    pub replies: Vec<CachedComment>,
}

pub fn insert_reply(comments: &mut [Comment], parent_id: &str, reply: Comment) -> bool {
    let mut reply = Some(reply);
    with_comment(comments, parent_id, &mut |parent| {
        parent.replies.extend(reply.take());
    })
}

pub fn update_content(comments: &mut [Comment], id: &str, content: &str) -> bool {
    with_comment(comments, id, &mut |comment| {
        comment.content = content.to_string();
        comment.is_edited = true;
    })
}

pub fn update_likes(comments: &mut [Comment], id: &str, likes_count: u64, liked: bool) -> bool {
    with_comment(comments, id, &mut |comment| {
        comment.likes_count = likes_count;
        comment.user_has_liked = Some(liked);
    })
}

pub fn remove(comments: &mut Vec<Comment>, id: &str) -> bool {
    let before = comments.len();
    comments.retain(|comment| comment.id != id);
    if comments.len() != before {
        return true;
    }
    comments
        .iter_mut()
        .any(|comment| remove(&mut comment.replies, id))
}

fn with_comment(comments: &mut [Comment], id: &str, apply: &mut dyn FnMut(&mut Comment)) -> bool {
    for comment in comments.iter_mut() {
        if comment.id == id {
            apply(comment);
            return true;
        }
        if with_comment(&mut comment.replies, id, apply) {
            return true;
        }
    }
    false
}

fn non_empty(content: &str) -> Result<&str, Error> {
    let content = content.trim();
    if content.is_empty() {
        let mut errors = validator::ValidationErrors::new();
        errors.add(
            "content",
            validator::ValidationError::new("content_empty")
                .with_message("Comment must not be empty".into()),
        );
        return Err(Error::Validation(errors));
    }
    Ok(content)
}

#[derive(Default)]
struct FeedState {
    comments: Vec<Comment>,
    next: Option<String>,
}

pub struct CommentFeed {
    ctx: SharedClientContext,
    target: CommentTarget,
    lifetime: Lifetime,
    state: Mutex<FeedState>,
}

impl CommentFeed {
    pub fn new(ctx: SharedClientContext, target: CommentTarget) -> Self {
        Self {
            ctx,
            target,
            lifetime: Lifetime::new(),
            state: Mutex::new(FeedState::default()),
        }
    }

    pub fn for_chapter(ctx: SharedClientContext, chapter_id: impl Into<String>) -> Self {
        Self::new(ctx, CommentTarget::Chapter(chapter_id.into()))
    }

    pub fn for_manga(ctx: SharedClientContext, manga_id: impl Into<String>) -> Self {
        Self::new(ctx, CommentTarget::Manga(manga_id.into()))
    }

    fn state(&self) -> MutexGuard<'_, FeedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn comments(&self) -> Vec<Comment> {
        self.state().comments.clone()
    }

    pub fn has_more(&self) -> bool {
        self.state().next.is_some()
    }

    pub fn dispose(&self) {
        self.lifetime.dispose();
    }

    #[tracing::instrument(name = "load comments", skip(self), fields(target = ?self.target))]
    pub async fn load(&self) -> Result<(), Error> {
        let auth = self.ctx.session.auth_headers();
        let Some(page) = self
            .lifetime
            .scoped(remote::list(&self.ctx.remote, &auth, &self.target))
            .await
        else {
            return Ok(());
        };
        let page = page?;

        let mut state = self.state();
        state.next = page.next().map(str::to_string);
        state.comments = page.into_results();
        Ok(())
    }

    /// Appends the next page. Does nothing on the last page.
    #[tracing::instrument(name = "load more comments", skip(self), fields(target = ?self.target))]
    pub async fn load_more(&self) -> Result<(), Error> {
        let Some(next) = self.state().next.clone() else {
            return Ok(());
        };

        let auth = self.ctx.session.auth_headers();
        let Some(page) = self
            .lifetime
            .scoped(remote::page(&self.ctx.remote, &auth, &next))
            .await
        else {
            return Ok(());
        };
        let page = page?;

        let mut state = self.state();
        state.next = page.next().map(str::to_string);
        state.comments.extend(page.into_results());
        Ok(())
    }

    pub async fn post(&self, content: &str) -> Result<(), Error> {
        self.create(content, None).await
    }

    pub async fn reply(&self, parent_id: &str, content: &str) -> Result<(), Error> {
        self.create(content, Some(parent_id)).await
    }

    #[tracing::instrument(name = "post comment", skip(self, content), fields(target = ?self.target))]
    async fn create(&self, content: &str, parent: Option<&str>) -> Result<(), Error> {
        let content = non_empty(content)?;
        let auth = self.authenticated()?;

        let mut body = NewComment::on(&self.target, content);
        body.parent = parent;

        let Some(created) = self
            .lifetime
            .scoped(remote::create(&self.ctx.remote, &auth, &body))
            .await
        else {
            return Ok(());
        };
        let created = created?;

        self.remember_own(&created);

        let mut state = self.state();
        match parent {
            Some(parent_id) => {
                if !insert_reply(&mut state.comments, parent_id, created) {
                    tracing::warn!(parent_id, "Reply parent is not loaded");
                }
            }
            None => state.comments.insert(0, created),
        }
        Ok(())
    }

    #[tracing::instrument(name = "edit comment", skip(self, content))]
    pub async fn edit(&self, id: &str, content: &str) -> Result<(), Error> {
        let content = non_empty(content)?;
        let auth = self.authenticated()?;

        let Some(updated) = self
            .lifetime
            .scoped(remote::update(&self.ctx.remote, &auth, id, content))
            .await
        else {
            return Ok(());
        };
        updated?;

        update_content(&mut self.state().comments, id, content);
        Ok(())
    }

    #[tracing::instrument(name = "delete comment", skip(self))]
    pub async fn delete(&self, id: &str) -> Result<(), Error> {
        let auth = self.authenticated()?;

        let Some(deleted) = self
            .lifetime
            .scoped(remote::delete(&self.ctx.remote, &auth, id))
            .await
        else {
            return Ok(());
        };
        deleted?;

        remove(&mut self.state().comments, id);
        Ok(())
    }

    #[tracing::instrument(name = "like comment", skip(self))]
    pub async fn like(&self, id: &str) -> Result<(), Error> {
        let auth = self.authenticated()?;

        let Some(liked) = self
            .lifetime
            .scoped(remote::toggle_like(&self.ctx.remote, &auth, id))
            .await
        else {
            return Ok(());
        };
        let liked = liked?;

        update_likes(&mut self.state().comments, id, liked.likes_count, liked.liked);
        Ok(())
    }

    fn authenticated(&self) -> Result<reqwest::header::HeaderMap, Error> {
        if !self.ctx.session.is_authenticated() {
            return Err(Error::Unauthenticated);
        }
        Ok(self.ctx.session.auth_headers())
    }

    /// Records the comment in the local cache the achievement counter reads.
    fn remember_own(&self, comment: &Comment) {
        let store = self.ctx.store.as_ref();
        let key = keys::comments(self.target.id());

        let mut cached: Vec<CachedComment> = storage::read_json(store, &key).unwrap_or_default();
        cached.push(CachedComment {
            id: comment.id.clone(),
            user: SELF_AUTHOR.to_string(),
            text: comment.content.clone(),
            time: comment.created_at.clone(),
            votes: 0,
            replies: Vec::new(),
        });

        if let Err(error) = storage::write_json(store, &key, &cached) {
            tracing::error!(err.msg = %error, err.details = ?error, "Failed caching comment");
        }
    }
}
