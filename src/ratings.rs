use std::borrow::Cow;

use validator::{ValidationError, ValidationErrors};

use crate::{
    api::ratings::{self, SubmitRating},
    context::SharedClientContext,
    error::Error,
    lifetime::Lifetime,
    storage::keys,
};

pub const MAX_RATING: f64 = 5.0;

/// Vote count the guest average pretends the manga already has.
const ASSUMED_PRIOR_VOTES: f64 = 100.0;

/// Where a rating is cached locally. The reader's slider rates a chapter
/// within its manga; the chapter footer rates the chapter alone. Both keys
/// are kept as is so existing caches stay readable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RatingScope {
    MangaChapter { manga_id: String, chapter_id: String },
    Chapter { chapter_id: String },
}

impl RatingScope {
    pub fn key(&self) -> String {
        match self {
            RatingScope::MangaChapter {
                manga_id,
                chapter_id,
            } => format!("{}{manga_id}_{chapter_id}", keys::RATING_PREFIX),
            RatingScope::Chapter { chapter_id } => format!("{}{chapter_id}", keys::RATING_PREFIX),
        }
    }

    pub fn chapter_id(&self) -> &str {
        match self {
            RatingScope::MangaChapter { chapter_id, .. } | RatingScope::Chapter { chapter_id } => {
                chapter_id
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Submitted {
    pub rating: f64,
    /// Manga average to display after the vote.
    pub average: f64,
}

pub fn validate_rating(rating: f64) -> Result<(), ValidationErrors> {
    let tenths = rating * 10.0;
    if (0.0..=MAX_RATING).contains(&rating) && (tenths - tenths.round()).abs() < 1e-9 {
        return Ok(());
    }

    let mut errors = ValidationErrors::new();
    errors.add(
        "rating",
        ValidationError::new("rating_range").with_message(Cow::from(
            "Rating must be between 0 and 5 with at most one decimal",
        )),
    );
    Err(errors)
}

/// Incremental mean over the assumed prior votes, rounded to 2 decimals.
pub fn local_average(current: f64, rating: f64) -> f64 {
    let average = (current * ASSUMED_PRIOR_VOTES + rating) / (ASSUMED_PRIOR_VOTES + 1.0);
    (average * 100.0).round() / 100.0
}

pub struct RatingCache {
    ctx: SharedClientContext,
    lifetime: Lifetime,
}

impl RatingCache {
    pub fn new(ctx: SharedClientContext) -> Self {
        Self {
            ctx,
            lifetime: Lifetime::new(),
        }
    }

    pub fn dispose(&self) {
        self.lifetime.dispose();
    }

    pub fn cached(&self, scope: &RatingScope) -> Option<f64> {
        self.ctx
            .store
            .get(&scope.key())
            .and_then(|raw| raw.trim().parse().ok())
    }

    /// The user's rating: the local cache first, overridden by the backend
    /// when it has one.
    #[tracing::instrument(name = "load rating", skip(self))]
    pub async fn load(&self, scope: &RatingScope) -> Option<f64> {
        let local = self.cached(scope);

        let session = &self.ctx.session;
        if !session.is_authenticated() {
            return local;
        }

        let auth = session.auth_headers();
        match self
            .lifetime
            .scoped(ratings::my_rating(&self.ctx.remote, &auth, scope.chapter_id()))
            .await
        {
            Some(Ok(remote)) => remote.rating.filter(|r| *r > 0.0).or(local),
            Some(Err(error)) => {
                tracing::error!(err.msg = %error, err.details = ?error, "Error loading rating");
                local
            }
            None => None,
        }
    }

    #[tracing::instrument(name = "submit rating", skip(self))]
    pub async fn submit(
        &self,
        scope: &RatingScope,
        rating: f64,
        current_manga_rating: f64,
    ) -> Result<Submitted, Error> {
        validate_rating(rating).map_err(Error::Validation)?;

        self.ctx.store.set(&scope.key(), &rating.to_string())?;

        let session = &self.ctx.session;
        if !session.is_authenticated() {
            return Ok(Submitted {
                rating,
                average: local_average(current_manga_rating, rating),
            });
        }

        let auth = session.auth_headers();
        let body = SubmitRating {
            chapter_id: scope.chapter_id(),
            rating,
        };
        let average = match self
            .lifetime
            .scoped(ratings::submit(&self.ctx.remote, &auth, &body))
            .await
        {
            Some(Ok(response)) => response.new_average.unwrap_or(current_manga_rating),
            Some(Err(error)) => {
                tracing::error!(err.msg = %error, err.details = ?error, "Error saving rating");
                current_manga_rating
            }
            None => current_manga_rating,
        };

        Ok(Submitted { rating, average })
    }
}
