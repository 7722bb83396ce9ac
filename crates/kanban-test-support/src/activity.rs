//! `ActivityRepository` doubles.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use kanban_core::activity::{Activity, ActivityRepository};
use kanban_core::error::DomainError;

/// Keeps every activity it is asked to add and echoes it back.
#[derive(Debug, Default)]
pub struct RecordingActivityRepository {
    added: Mutex<Vec<Activity>>,
}

impl RecordingActivityRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all added activities, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn activities(&self) -> Vec<Activity> {
        self.added.lock().unwrap().clone()
    }
}

#[async_trait]
impl ActivityRepository for RecordingActivityRepository {
    async fn add_activity(&self, activity: Activity) -> Result<Activity, DomainError> {
        self.added.lock().unwrap().push(activity.clone());
        Ok(activity)
    }
}

/// Always fails with an infrastructure error.
#[derive(Debug)]
pub struct FailingActivityRepository;

#[async_trait]
impl ActivityRepository for FailingActivityRepository {
    async fn add_activity(&self, _activity: Activity) -> Result<Activity, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }
}

/// Fails the first `failures` calls, then records like
/// [`RecordingActivityRepository`].
#[derive(Debug)]
pub struct FlakyActivityRepository {
    failures: usize,
    calls: AtomicUsize,
    inner: RecordingActivityRepository,
}

impl FlakyActivityRepository {
    #[must_use]
    pub fn new(failures: usize) -> Self {
        Self {
            failures,
            calls: AtomicUsize::new(0),
            inner: RecordingActivityRepository::new(),
        }
    }

    /// Total `add_activity` calls, failed ones included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Activities that were stored successfully.
    pub fn activities(&self) -> Vec<Activity> {
        self.inner.activities()
    }
}

#[async_trait]
impl ActivityRepository for FlakyActivityRepository {
    async fn add_activity(&self, activity: Activity) -> Result<Activity, DomainError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(DomainError::Infrastructure(format!(
                "transient failure {} of {}",
                call + 1,
                self.failures
            )));
        }
        self.inner.add_activity(activity).await
    }
}
