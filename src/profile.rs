//! The profile's points and equipped title.
//!
//! The backend stores the equipped title as a bare string, usually an
//! achievement id. The local copy keeps id, display name and rarity so the
//! badge renders without a registry lookup.

use std::borrow::Cow;

use serde::Serialize;
use validator::{ValidationError, ValidationErrors};

use crate::{
    achievements::{Achievement, find_by_id, find_remote},
    api::auth,
    context::SharedClientContext,
    error::Error,
    lifetime::Lifetime,
    storage::{self, LocalStore, keys},
};

const DEFAULT_RARITY: &str = "common";

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct EquippedTitle {
    pub id: String,
    pub title: String,
    pub rarity: String,
}

impl From<&Achievement> for EquippedTitle {
    fn from(achievement: &Achievement) -> Self {
        Self {
            id: achievement.id.to_string(),
            title: achievement.title.to_string(),
            rarity: achievement.rarity.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileView {
    pub points: i64,
    pub equipped: Option<EquippedTitle>,
}

/// The locally cached title. Both the id and the name must be present.
pub fn cached_title(store: &dyn LocalStore) -> Option<EquippedTitle> {
    let id = storage::get_non_empty(store, keys::EQUIPPED_TITLE)?;
    let title = storage::get_non_empty(store, keys::EQUIPPED_TITLE_NAME)?;
    let rarity = storage::get_non_empty(store, keys::EQUIPPED_TITLE_RARITY)
        .unwrap_or_else(|| DEFAULT_RARITY.to_string());

    Some(EquippedTitle { id, title, rarity })
}

fn remember(store: &dyn LocalStore, title: &EquippedTitle) {
    let saved = store
        .set(keys::EQUIPPED_TITLE, &title.id)
        .and_then(|_| store.set(keys::EQUIPPED_TITLE_NAME, &title.title))
        .and_then(|_| store.set(keys::EQUIPPED_TITLE_RARITY, &title.rarity));
    if let Err(error) = saved {
        tracing::error!(err.msg = %error, err.details = ?error, "Failed saving equipped title");
    }
}

/// Resolves the title the backend reports, matched against the registry by
/// id and then by display name. A match is cached locally; anything else is
/// shown verbatim as a common title and not cached.
pub fn restore_remote(store: &dyn LocalStore, remote: &str) -> EquippedTitle {
    match find_remote(remote, Some(remote)) {
        Some(achievement) => {
            let title = EquippedTitle::from(achievement);
            remember(store, &title);
            title
        }
        None => EquippedTitle {
            id: remote.to_string(),
            title: remote.to_string(),
            rarity: DEFAULT_RARITY.to_string(),
        },
    }
}

fn locked_title(achievement_id: &str) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    errors.add(
        "equipped_title",
        ValidationError::new("locked")
            .with_message(Cow::from(format!("{achievement_id} is not unlocked"))),
    );
    errors
}

pub struct Profile {
    ctx: SharedClientContext,
    lifetime: Lifetime,
}

impl Profile {
    pub fn new(ctx: SharedClientContext) -> Self {
        Self {
            ctx,
            lifetime: Lifetime::new(),
        }
    }

    pub fn dispose(&self) {
        self.lifetime.dispose();
    }

    /// Points and title as the backend knows them, with the local cache
    /// standing in for a missing title or a failed call.
    #[tracing::instrument(name = "load profile", skip_all)]
    pub async fn load(&self) -> ProfileView {
        let store = self.ctx.store.as_ref();
        let session = &self.ctx.session;
        let mut view = ProfileView {
            points: session.user().map(|user| user.points).unwrap_or_default(),
            equipped: cached_title(store),
        };
        if !session.is_authenticated() {
            return view;
        }

        let fetched = self
            .lifetime
            .scoped(async {
                session.ensure_fresh_token().await;
                auth::profile(&self.ctx.remote, &session.auth_headers()).await
            })
            .await;

        match fetched {
            Some(Ok(remote)) => {
                if let Some(points) = remote.points {
                    view.points = points;
                }
                if let Some(title) = remote.equipped_title.filter(|t| !t.is_empty()) {
                    view.equipped = Some(restore_remote(store, &title));
                }
            }
            Some(Err(error)) => {
                tracing::error!(err.msg = %error, err.details = ?error, "Error fetching profile");
            }
            None => {}
        }

        view
    }

    /// Equips an unlocked achievement as the profile title. The local copy
    /// is written first; the backend is told on a best-effort basis.
    #[tracing::instrument(name = "equip title", skip(self, unlocked))]
    pub async fn equip_title(
        &self,
        achievement_id: &str,
        unlocked: &[String],
    ) -> Result<EquippedTitle, Error> {
        let achievement = find_by_id(achievement_id)
            .filter(|_| unlocked.iter().any(|id| id == achievement_id))
            .ok_or_else(|| Error::Validation(locked_title(achievement_id)))?;

        let title = EquippedTitle::from(achievement);
        remember(self.ctx.store.as_ref(), &title);

        let session = &self.ctx.session;
        if session.is_authenticated() {
            let synced = self
                .lifetime
                .scoped(auth::update_profile(
                    &self.ctx.remote,
                    &session.auth_headers(),
                    &title.id,
                ))
                .await;
            if let Some(Err(error)) = synced {
                tracing::error!(err.msg = %error, err.details = ?error, "Error syncing equipped title");
            }
        }

        Ok(title)
    }
}
