pub mod aggregate;
pub mod attempt;
pub mod checks;
pub mod config;
pub mod execution;
pub mod gate;
pub mod model;
pub mod normalizer;
pub mod orchestrator;
pub mod routes;
pub mod runner;
pub mod stash;
pub mod telemetry;

use crate::orchestrator::{ActiveAttempt, Orchestrator};
use log::debug;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Orchestrator,
    pub attempts: Arc<AttemptRegistry>,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator, idle_timeout: Duration) -> Self {
        AppState {
            orchestrator,
            attempts: Arc::new(AttemptRegistry::new(idle_timeout)),
        }
    }
}

pub type SharedAttempt = Arc<tokio::sync::Mutex<ActiveAttempt>>;

struct Entry {
    attempt: SharedAttempt,
    touched: Instant,
}

/// Open attempts by id. Each attempt sits behind its own async mutex; holding
/// it is what keeps a second execution from starting. Attempts nobody has
/// looked up for `idle_timeout` are evicted.
pub struct AttemptRegistry {
    next_id: AtomicU64,
    idle_timeout: Duration,
    attempts: Mutex<HashMap<u64, Entry>>,
}

impl AttemptRegistry {
    pub fn new(idle_timeout: Duration) -> Self {
        AttemptRegistry {
            next_id: AtomicU64::new(0),
            idle_timeout,
            attempts: Mutex::new(HashMap::new()),
        }
    }

    pub fn insert(&self, attempt: ActiveAttempt) -> u64 {
        self.evict_idle();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                id,
                Entry {
                    attempt: Arc::new(tokio::sync::Mutex::new(attempt)),
                    touched: Instant::now(),
                },
            );
        id
    }

    pub fn get(&self, id: u64) -> Option<SharedAttempt> {
        let mut attempts = self.attempts.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = attempts.get_mut(&id)?;
        entry.touched = Instant::now();
        Some(entry.attempt.clone())
    }

    /// Drops the attempt; results of calls still in flight are discarded.
    pub fn remove(&self, id: u64) -> bool {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn evict_idle(&self) -> usize {
        self.evict_idle_at(Instant::now())
    }

    /// Removes attempts untouched since `now - idle_timeout`. An attempt
    /// whose lock is held is in use and stays.
    pub fn evict_idle_at(&self, now: Instant) -> usize {
        let mut attempts = self.attempts.lock().unwrap_or_else(PoisonError::into_inner);
        let before = attempts.len();
        attempts.retain(|id, entry| {
            let idle = now.saturating_duration_since(entry.touched) > self.idle_timeout;
            let keep = !idle || entry.attempt.try_lock().is_err();
            if !keep {
                debug!("Evicting idle attempt {id}");
            }
            keep
        });
        before - attempts.len()
    }
}
