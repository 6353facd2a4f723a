use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::extract::FromRef;
use sqlx::SqlitePool;
use tokio::{
    sync::{Mutex, RwLock},
    task::{AbortHandle, JoinHandle},
    time::{Instant, MissedTickBehavior, interval},
};
use uuid::Uuid;

use crate::{
    clients::{AiGrader, ChatTutor, CodeExecutor},
    config::Config,
    grading::{
        catalog::ExamCatalog,
        session::{ExamSession, SessionRetention},
        timer::SessionHandle,
    },
};

struct SessionEntry {
    handle: SessionHandle,
    countdown: Option<AbortHandle>,
}

/// Live exam sessions, each behind its own lock.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<RwLock<HashMap<Uuid, SessionEntry>>>,
}

impl SessionRegistry {
    pub async fn insert(&self, session: ExamSession) -> (Uuid, SessionHandle) {
        let id = session.id();
        let handle = Arc::new(Mutex::new(session));
        let entry = SessionEntry {
            handle: Arc::clone(&handle),
            countdown: None,
        };
        self.inner.write().await.insert(id, entry);
        (id, handle)
    }

    pub async fn get(&self, id: &Uuid) -> Option<SessionHandle> {
        self.inner
            .read()
            .await
            .get(id)
            .map(|entry| Arc::clone(&entry.handle))
    }

    /// Remembers the countdown task so discarding the session can stop it.
    /// If the session is already gone the countdown is aborted and `false`
    /// is returned.
    pub async fn attach_countdown(&self, id: &Uuid, countdown: AbortHandle) -> bool {
        match self.inner.write().await.get_mut(id) {
            Some(entry) => {
                entry.countdown = Some(countdown);
                true
            }
            None => {
                countdown.abort();
                false
            }
        }
    }

    /// Drops the session and aborts its countdown, if any.
    pub async fn remove(&self, id: &Uuid) -> Option<SessionHandle> {
        let entry = self.inner.write().await.remove(id)?;
        if let Some(countdown) = entry.countdown {
            countdown.abort();
        }
        Some(entry.handle)
    }

    /// Drops sessions that are past their retention window. Sessions locked
    /// by a request are kept until the next sweep.
    pub async fn evict_stale(&self, retention: &SessionRetention) -> usize {
        let now = Instant::now();
        let mut sessions = self.inner.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| {
            let stale = entry
                .handle
                .try_lock()
                .map(|session| session.is_stale(now, retention))
                .unwrap_or(false);
            if stale {
                if let Some(countdown) = &entry.countdown {
                    countdown.abort();
                }
            }
            !stale
        });
        before - sessions.len()
    }

    /// Spawns the periodic eviction task.
    pub fn spawn_sweeper(&self, retention: SessionRetention, every: Duration) -> JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let evicted = registry.evict_stale(&retention).await;
                if evicted > 0 {
                    tracing::info!("Evicted {} stale exam session(s)", evicted);
                }
            }
        })
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Config,
    pub catalog: Arc<ExamCatalog>,
    pub sessions: SessionRegistry,
    pub executor: Arc<dyn CodeExecutor>,
    pub grader: Arc<dyn AiGrader>,
    pub tutor: Arc<dyn ChatTutor>,
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for Arc<ExamCatalog> {
    fn from_ref(state: &AppState) -> Self {
        Arc::clone(&state.catalog)
    }
}
