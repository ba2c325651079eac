//! Achievement tracking.
//!
//! With a session the backend decides what is unlocked and the registry is
//! only used to render it. Guests, and sessions whose backend calls fail,
//! are evaluated locally against the static threshold table.

use std::{
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use chrono::Timelike;
use serde_json::Value;
use tokio::time::Instant;

use crate::{
    api::achievements as remote,
    context::SharedClientContext,
    error::Error,
    library::Library,
    lifetime::Lifetime,
    storage::{self, LocalStore, keys},
};

mod registry;

pub use registry::{
    ACHIEVEMENTS, Achievement, Category, Icon, Rarity, SECRET_NIGHT, find_by_id, find_remote,
};

/// Author marker the comment box writes for the local user.
pub const SELF_AUTHOR: &str = "أنت";

const NIGHT_HOURS: std::ops::Range<u32> = 3..5;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub reading_count: u64,
    pub reading_seconds: u64,
    pub bookmark_count: u64,
    pub comment_count: u64,
}

impl Stats {
    fn counter(&self, category: Category) -> Option<u64> {
        match category {
            Category::Reading => Some(self.reading_count),
            Category::Time => Some(self.reading_seconds),
            Category::Collection => Some(self.bookmark_count),
            Category::Social => Some(self.comment_count),
            Category::Secret => None,
        }
    }
}

/// Adds every achievement `stats` now qualifies for to `unlocked` and
/// returns the last one added.
pub fn evaluate_local(
    stats: &Stats,
    unlocked: &mut Vec<String>,
    hour: u32,
) -> Option<&'static Achievement> {
    let mut newest = None;

    for achievement in ACHIEVEMENTS.iter() {
        if unlocked.iter().any(|id| id == achievement.id) {
            continue;
        }

        let reached = match stats.counter(achievement.category) {
            Some(value) => value >= achievement.threshold,
            None => false,
        };
        let night_owl = achievement.id == SECRET_NIGHT
            && NIGHT_HOURS.contains(&hour)
            && stats.reading_count > 0;

        if reached || night_owl {
            unlocked.push(achievement.id.to_string());
            newest = Some(achievement);
        }
    }

    newest
}

/// Number of comments in the local caches written by the local user.
pub fn count_own_comments(store: &dyn LocalStore) -> u64 {
    store
        .keys()
        .into_iter()
        .filter(|key| key.starts_with(keys::COMMENTS_PREFIX))
        .filter_map(|key| storage::read_json::<Vec<Value>>(store, &key))
        .flatten()
        .filter(|comment| comment.get("user").and_then(Value::as_str) == Some(SELF_AUTHOR))
        .count() as u64
}

pub fn read_reading_seconds(store: &dyn LocalStore) -> u64 {
    store
        .get(keys::TOTAL_READING_SECONDS)
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Inputs {
    history_len: usize,
    bookmark_count: usize,
    authenticated: bool,
}

struct Toast {
    achievement: &'static Achievement,
    shown_at: Instant,
}

#[derive(Default)]
struct TrackerState {
    unlocked: Vec<String>,
    toast: Option<Toast>,
    last_inputs: Option<Inputs>,
}

pub struct AchievementTracker {
    ctx: SharedClientContext,
    lifetime: Lifetime,
    toast_duration: Duration,
    hour: fn() -> u32,
    state: Mutex<TrackerState>,
}

fn local_hour() -> u32 {
    chrono::Local::now().hour()
}

impl AchievementTracker {
    pub fn new(ctx: SharedClientContext) -> Self {
        let toast_duration = ctx.config.achievements.toast_duration();

        Self {
            ctx,
            lifetime: Lifetime::new(),
            toast_duration,
            hour: local_hour,
            state: Mutex::new(TrackerState::default()),
        }
    }

    /// Replaces the local clock used for the night-time achievement.
    pub fn with_hour_source(mut self, hour: fn() -> u32) -> Self {
        self.hour = hour;
        self
    }

    fn state(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn unlocked(&self) -> Vec<String> {
        self.state().unlocked.clone()
    }

    /// The achievement currently announced, if its display window is still
    /// open.
    pub fn toast(&self) -> Option<&'static Achievement> {
        let mut state = self.state();
        let expired = state
            .toast
            .as_ref()
            .is_some_and(|toast| toast.shown_at.elapsed() >= self.toast_duration);
        if expired {
            state.toast = None;
        }
        state.toast.as_ref().map(|toast| toast.achievement)
    }

    pub fn close_toast(&self) {
        self.state().toast = None;
    }

    pub fn dispose(&self) {
        self.lifetime.dispose();
    }

    fn announce(&self, achievement: &'static Achievement) {
        self.state().toast = Some(Toast {
            achievement,
            shown_at: Instant::now(),
        });
    }

    /// Re-evaluates when the history length, the bookmark count or the
    /// authentication state changed since the last pass.
    pub async fn on_change(&self, library: &Library) -> Option<&'static Achievement> {
        let inputs = Inputs {
            history_len: library.history().len(),
            bookmark_count: library.bookmarks().len(),
            authenticated: self.ctx.session.is_authenticated(),
        };
        if self.state().last_inputs == Some(inputs) {
            return None;
        }
        self.state().last_inputs = Some(inputs);

        self.evaluate(library).await
    }

    /// Runs one evaluation pass and returns the achievement it surfaced.
    #[tracing::instrument(name = "evaluate achievements", skip_all)]
    pub async fn evaluate(&self, library: &Library) -> Option<&'static Achievement> {
        if self.ctx.session.is_authenticated() {
            match self.evaluate_remote().await {
                Ok(surfaced) => return surfaced,
                Err(error) => {
                    tracing::error!(err.msg = %error, err.details = ?error, "Error checking achievements from api");
                }
            }
            if self.lifetime.is_disposed() {
                return None;
            }
        }

        self.evaluate_locally(library)
    }

    async fn evaluate_remote(&self) -> Result<Option<&'static Achievement>, Error> {
        let session = &self.ctx.session;
        let client = &self.ctx.remote;

        let outcome = self
            .lifetime
            .scoped(async {
                session.ensure_fresh_token().await;
                let auth = session.auth_headers();
                let owned = remote::my(client, &auth).await?;
                let checked = remote::check(client, &auth).await?;
                Ok::<_, Error>((owned, checked))
            })
            .await;
        let Some(outcome) = outcome else {
            return Ok(None);
        };
        let (owned, checked) = outcome?;

        let surfaced = checked
            .newly_unlocked
            .first()
            .and_then(|fresh| find_remote(&fresh.id, fresh.name_ar.as_deref()));

        let mut state = self.state();
        state.unlocked = owned;
        if let Some(achievement) = surfaced {
            if !state.unlocked.iter().any(|id| id == achievement.id) {
                state.unlocked.push(achievement.id.to_string());
            }
            drop(state);
            tracing::info!(achievement = achievement.id, "Achievement unlocked");
            self.announce(achievement);
        }

        Ok(surfaced)
    }

    fn evaluate_locally(&self, library: &Library) -> Option<&'static Achievement> {
        let store = self.ctx.store.as_ref();

        let mut unlocked: Vec<String> =
            storage::read_json(store, keys::UNLOCKED_ACHIEVEMENTS).unwrap_or_default();
        let before = unlocked.len();

        let stats = Stats {
            reading_count: library.history().len() as u64,
            reading_seconds: read_reading_seconds(store),
            bookmark_count: library.bookmarks().len() as u64,
            comment_count: count_own_comments(store),
        };
        let surfaced = evaluate_local(&stats, &mut unlocked, (self.hour)());

        if unlocked.len() > before {
            if let Err(error) = storage::write_json(store, keys::UNLOCKED_ACHIEVEMENTS, &unlocked) {
                tracing::error!(err.msg = %error, err.details = ?error, "Failed saving achievements");
            }
        }

        self.state().unlocked = unlocked;
        if let Some(achievement) = surfaced {
            tracing::info!(achievement = achievement.id, "Achievement unlocked");
            self.announce(achievement);
        }

        surfaced
    }
}
