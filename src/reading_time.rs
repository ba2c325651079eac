use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use tokio::{task::JoinHandle, time::Instant};

use crate::{
    achievements::read_reading_seconds,
    api::history::{self, RecordRead},
    context::SharedClientContext,
    storage::keys,
};

/// Shorter sessions are not reported to the backend.
pub const MIN_REPORTED_SECONDS: u64 = 30;

const TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadingTime {
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
}

pub fn format_reading_time(total_seconds: u64) -> ReadingTime {
    ReadingTime {
        days: total_seconds / 86_400,
        hours: total_seconds % 86_400 / 3_600,
        minutes: total_seconds % 3_600 / 60,
    }
}

/// Counts the seconds spent on one chapter.
pub struct ReadingTimer {
    ctx: SharedClientContext,
    chapter_id: Option<String>,
    seconds: Arc<AtomicU64>,
    ticker: JoinHandle<()>,
}

impl ReadingTimer {
    pub fn start(ctx: SharedClientContext, chapter_id: Option<String>) -> Self {
        let seconds = Arc::new(AtomicU64::new(0));

        let counter = seconds.clone();
        let ticker = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + TICK, TICK);
            loop {
                interval.tick().await;
                counter.fetch_add(1, Ordering::Relaxed);
            }
        });

        Self {
            ctx,
            chapter_id,
            seconds,
            ticker,
        }
    }

    pub fn session_seconds(&self) -> u64 {
        self.seconds.load(Ordering::Relaxed)
    }

    /// Ends the session, adds it to the local total and reports it when it
    /// was long enough. Returns the session length.
    #[tracing::instrument(name = "stop reading timer", skip(self), fields(chapter_id = ?self.chapter_id))]
    pub async fn stop(self) -> u64 {
        self.ticker.abort();
        let seconds = self.session_seconds();

        let store = self.ctx.store.as_ref();
        let total = read_reading_seconds(store) + seconds;
        if let Err(error) = store.set(keys::TOTAL_READING_SECONDS, &total.to_string()) {
            tracing::error!(err.msg = %error, err.details = ?error, "Failed saving reading time");
        }

        let session = &self.ctx.session;
        let Some(chapter_id) = self.chapter_id.as_deref() else {
            return seconds;
        };
        if seconds < MIN_REPORTED_SECONDS || !session.is_authenticated() {
            return seconds;
        }

        let read = RecordRead {
            chapter_id,
            manga_id: None,
            reading_seconds: Some(seconds),
        };
        match history::record(&self.ctx.remote, &session.auth_headers(), &read).await {
            Ok(response) if response.points_awarded => {
                tracing::info!(total_points = ?response.total_points, "Points awarded");
            }
            Ok(_) => {}
            Err(error) => {
                tracing::error!(err.msg = %error, err.details = ?error, "Failed to update reading time");
            }
        }

        seconds
    }
}

impl Drop for ReadingTimer {
    fn drop(&mut self) {
        self.ticker.abort();
    }
}
