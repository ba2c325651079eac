//! Bookmarks and reading history.
//!
//! Local state is loaded first so consumers never see an empty library while
//! the backend answers. With a session the remote lists then replace the
//! local view. A bookmark toggle the backend could not take is kept locally
//! and marked dirty until the next successful remote load replays it.

use std::{
    collections::{BTreeMap, HashSet},
    sync::{Mutex, MutexGuard, PoisonError},
};

use crate::{
    api::{bookmarks, history},
    context::SharedClientContext,
    lifetime::Lifetime,
    model::{HistoryItem, MangaSummary},
    storage::{self, keys},
};

pub const HISTORY_LIMIT: usize = 20;

/// Ids this short come from the old mock catalog and never exist remotely.
const LEGACY_ID_MAX_LEN: usize = 10;
const LEGACY_TITLE: &str = "Manga";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    LoadingLocal,
    LocalAuthoritative,
    LoadingRemote,
    RemoteAuthoritative,
    LocalFallback,
}

#[derive(Debug)]
struct State {
    phase: Phase,
    bookmarks: Vec<MangaSummary>,
    history: Vec<HistoryItem>,
    /// Manga id → bookmark membership the user asked for.
    dirty: BTreeMap<String, bool>,
}

pub struct Library {
    ctx: SharedClientContext,
    lifetime: Lifetime,
    state: Mutex<State>,
}

impl Library {
    pub fn new(ctx: SharedClientContext) -> Self {
        Self {
            ctx,
            lifetime: Lifetime::new(),
            state: Mutex::new(State {
                phase: Phase::Uninitialized,
                bookmarks: Vec::new(),
                history: Vec::new(),
                dirty: BTreeMap::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn phase(&self) -> Phase {
        self.state().phase
    }

    pub fn bookmarks(&self) -> Vec<MangaSummary> {
        self.state().bookmarks.clone()
    }

    pub fn history(&self) -> Vec<HistoryItem> {
        self.state().history.clone()
    }

    pub fn is_bookmarked(&self, manga_id: &str) -> bool {
        self.state().bookmarks.iter().any(|m| m.id == manga_id)
    }

    pub fn dirty_ids(&self) -> Vec<String> {
        self.state().dirty.keys().cloned().collect()
    }

    pub fn lifetime(&self) -> &Lifetime {
        &self.lifetime
    }

    pub fn dispose(&self) {
        self.lifetime.dispose();
    }

    #[tracing::instrument(name = "mount library", skip_all)]
    pub async fn mount(&self) {
        self.load_local();

        let session = &self.ctx.session;
        if !session.is_authenticated() {
            self.state().phase = Phase::LocalAuthoritative;
            return;
        }

        self.state().phase = Phase::LoadingRemote;

        let fetched = self
            .lifetime
            .scoped(async {
                session.ensure_fresh_token().await;
                let auth = session.auth_headers();
                futures::join!(
                    bookmarks::list(&self.ctx.remote, &auth),
                    history::list(&self.ctx.remote, &auth)
                )
            })
            .await;
        let Some((remote_bookmarks, remote_history)) = fetched else {
            tracing::debug!("Library disposed before remote load finished");
            return;
        };

        let mut complete = true;

        match remote_history {
            Ok(items) => {
                let mut state = self.state();
                state.history = latest_per_manga(items);
                self.persist_history(&state.history);
            }
            Err(error) => {
                complete = false;
                tracing::error!(err.msg = %error, err.details = ?error, "Failed loading remote history");
            }
        }

        match remote_bookmarks {
            Ok(items) => self.reconcile(items).await,
            Err(error) => {
                complete = false;
                tracing::error!(err.msg = %error, err.details = ?error, "Failed loading remote bookmarks");
            }
        }

        if self.lifetime.is_disposed() {
            return;
        }
        self.state().phase = if complete {
            Phase::RemoteAuthoritative
        } else {
            Phase::LocalFallback
        };
    }

    fn load_local(&self) {
        self.state().phase = Phase::LoadingLocal;
        let store = self.ctx.store.as_ref();

        let mut bookmarks: Vec<MangaSummary> =
            storage::read_json(store, keys::BOOKMARKS).unwrap_or_default();
        let before = bookmarks.len();
        bookmarks.retain(|m| !is_legacy_id(&m.id));
        if bookmarks.len() != before {
            tracing::info!(dropped = before - bookmarks.len(), "Dropped legacy bookmarks");
            self.persist_bookmarks(&bookmarks);
        }

        let mut history: Vec<HistoryItem> =
            storage::read_json(store, keys::HISTORY).unwrap_or_default();
        let before = history.len();
        history.retain(|h| !is_legacy_id(&h.manga_id) && h.manga_title != LEGACY_TITLE);
        if history.len() != before {
            tracing::info!(dropped = before - history.len(), "Dropped legacy history");
            self.persist_history(&history);
        }

        let dirty: BTreeMap<String, bool> =
            storage::read_json(store, keys::BOOKMARKS_DIRTY).unwrap_or_default();

        let mut state = self.state();
        state.bookmarks = bookmarks;
        state.history = history;
        state.dirty = dirty;
    }

    /// Adopts the remote bookmark list, replaying every dirty toggle whose
    /// intent the backend does not reflect yet.
    async fn reconcile(&self, mut remote: Vec<MangaSummary>) {
        let (dirty, local) = {
            let state = self.state();
            (state.dirty.clone(), state.bookmarks.clone())
        };
        let mut still_dirty = BTreeMap::new();

        for (manga_id, wanted) in dirty {
            let present = remote.iter().any(|m| m.id == manga_id);
            if present == wanted {
                continue;
            }

            let auth = self.ctx.session.auth_headers();
            let Some(result) = self
                .lifetime
                .scoped(bookmarks::toggle(&self.ctx.remote, &auth, &manga_id))
                .await
            else {
                return;
            };

            match result {
                Ok(response) if response.bookmarked => {
                    if let Some(manga) = local.iter().find(|m| m.id == manga_id) {
                        remote.insert(0, manga.clone());
                    }
                }
                Ok(_) => remote.retain(|m| m.id != manga_id),
                Err(error) => {
                    tracing::error!(err.msg = %error, err.details = ?error, manga_id = %manga_id, "Failed replaying bookmark toggle");
                    still_dirty.insert(manga_id, wanted);
                }
            }
        }

        // A toggle that is still dirty keeps its local intent on top of the
        // remote list.
        for (manga_id, wanted) in &still_dirty {
            remote.retain(|m| &m.id != manga_id);
            if *wanted {
                if let Some(manga) = local.iter().find(|m| &m.id == manga_id) {
                    remote.insert(0, manga.clone());
                }
            }
        }

        let mut state = self.state();
        state.bookmarks = remote;
        state.dirty = still_dirty;
        self.persist_bookmarks(&state.bookmarks);
        self.persist_dirty(&state.dirty);
    }

    /// Flips membership of `manga` and returns whether it is bookmarked
    /// afterwards.
    #[tracing::instrument(name = "toggle bookmark", skip_all, fields(manga_id = %manga.id))]
    pub async fn toggle_bookmark(&self, manga: &MangaSummary) -> bool {
        let wanted = {
            let mut state = self.state();
            let wanted = toggle_in(&mut state.bookmarks, manga);
            self.persist_bookmarks(&state.bookmarks);
            wanted
        };

        let session = &self.ctx.session;
        if !session.is_authenticated() {
            return wanted;
        }

        let auth = session.auth_headers();
        let Some(mut result) = self
            .lifetime
            .scoped(bookmarks::toggle(&self.ctx.remote, &auth, &manga.id))
            .await
        else {
            return wanted;
        };

        // The backend flips whatever it holds. When an earlier toggle never
        // reached it, the flip lands on the wrong side and is sent again.
        if matches!(&result, Ok(response) if response.bookmarked != wanted) {
            tracing::info!("Backend out of step with local bookmark, toggling again");
            match self
                .lifetime
                .scoped(bookmarks::toggle(&self.ctx.remote, &auth, &manga.id))
                .await
            {
                Some(retried) => result = retried,
                None => return wanted,
            }
        }

        let mut state = self.state();
        match result {
            Ok(response) if response.bookmarked == wanted => {
                state.dirty.remove(&manga.id);
                self.persist_dirty(&state.dirty);
            }
            Ok(_) => {
                tracing::error!("Backend still disagrees, keeping local change");
                state.dirty.insert(manga.id.clone(), wanted);
                self.persist_dirty(&state.dirty);
            }
            Err(error) => {
                tracing::error!(err.msg = %error, err.details = ?error, "Bookmark toggle failed, keeping local change");
                state.dirty.insert(manga.id.clone(), wanted);
                self.persist_dirty(&state.dirty);
            }
        }

        wanted
    }

    #[tracing::instrument(name = "add to history", skip_all, fields(manga_id = %manga.id, chapter_id = %chapter_id))]
    pub async fn add_to_history(
        &self,
        manga: &MangaSummary,
        chapter_id: &str,
        chapter_number: Option<f64>,
    ) {
        let item = HistoryItem {
            manga_id: manga.id.clone(),
            manga_title: manga.title.clone(),
            chapter_id: chapter_id.to_string(),
            chapter_number,
            image_url: manga.image_url.clone(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        };

        {
            let mut state = self.state();
            if !push_history(&mut state.history, item) {
                return;
            }
            self.persist_history(&state.history);
        }

        let session = &self.ctx.session;
        if !session.is_authenticated() {
            return;
        }

        let auth = session.auth_headers();
        let read = history::RecordRead {
            chapter_id,
            manga_id: Some(&manga.id),
            reading_seconds: None,
        };
        if let Some(Err(error)) = self
            .lifetime
            .scoped(history::record(&self.ctx.remote, &auth, &read))
            .await
        {
            tracing::error!(err.msg = %error, err.details = ?error, "Failed recording read");
        }
    }

    fn persist_bookmarks(&self, bookmarks: &[MangaSummary]) {
        if let Err(error) = storage::write_json(self.ctx.store.as_ref(), keys::BOOKMARKS, bookmarks) {
            tracing::error!(err.msg = %error, err.details = ?error, "Failed saving bookmarks");
        }
    }

    fn persist_history(&self, history: &[HistoryItem]) {
        if let Err(error) = storage::write_json(self.ctx.store.as_ref(), keys::HISTORY, history) {
            tracing::error!(err.msg = %error, err.details = ?error, "Failed saving history");
        }
    }

    fn persist_dirty(&self, dirty: &BTreeMap<String, bool>) {
        let store = self.ctx.store.as_ref();
        let result = if dirty.is_empty() {
            store.remove(keys::BOOKMARKS_DIRTY)
        } else {
            storage::write_json(store, keys::BOOKMARKS_DIRTY, dirty)
        };
        if let Err(error) = result {
            tracing::error!(err.msg = %error, err.details = ?error, "Failed saving dirty bookmarks");
        }
    }
}

fn is_legacy_id(id: &str) -> bool {
    id.chars().count() <= LEGACY_ID_MAX_LEN
}

/// Keeps the most recent entry of each manga, capped at [`HISTORY_LIMIT`].
/// `items` must be most recent first.
fn latest_per_manga(items: Vec<HistoryItem>) -> Vec<HistoryItem> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.manga_id.clone()))
        .take(HISTORY_LIMIT)
        .collect()
}

/// Returns the new membership.
fn toggle_in(bookmarks: &mut Vec<MangaSummary>, manga: &MangaSummary) -> bool {
    let before = bookmarks.len();
    bookmarks.retain(|m| m.id != manga.id);
    if bookmarks.len() != before {
        return false;
    }
    bookmarks.insert(0, manga.clone());
    true
}

/// Prepends `item` unless it is already the head. Returns whether the list
/// changed.
fn push_history(history: &mut Vec<HistoryItem>, item: HistoryItem) -> bool {
    if history
        .first()
        .is_some_and(|head| head.manga_id == item.manga_id && head.chapter_id == item.chapter_id)
    {
        return false;
    }

    history.retain(|h| h.manga_id != item.manga_id);
    history.insert(0, item);
    history.truncate(HISTORY_LIMIT);
    true
}
