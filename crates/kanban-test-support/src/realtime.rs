//! `RealtimeSink` doubles.

use std::sync::Mutex;

use async_trait::async_trait;
use kanban_core::error::DomainError;
use kanban_core::realtime::{RealtimeGroup, RealtimeMessage, RealtimeSink};

/// Keeps every push with its target group.
#[derive(Debug, Default)]
pub struct RecordingRealtimeSink {
    pushed: Mutex<Vec<(RealtimeGroup, RealtimeMessage)>>,
}

impl RecordingRealtimeSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all pushes, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn pushes(&self) -> Vec<(RealtimeGroup, RealtimeMessage)> {
        self.pushed.lock().unwrap().clone()
    }

    /// Pushes addressed to `group`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn pushes_to(&self, group: RealtimeGroup) -> Vec<RealtimeMessage> {
        self.pushed
            .lock()
            .unwrap()
            .iter()
            .filter(|(g, _)| *g == group)
            .map(|(_, m)| m.clone())
            .collect()
    }
}

#[async_trait]
impl RealtimeSink for RecordingRealtimeSink {
    async fn push(
        &self,
        group: RealtimeGroup,
        message: RealtimeMessage,
    ) -> Result<(), DomainError> {
        self.pushed.lock().unwrap().push((group, message));
        Ok(())
    }
}

#[derive(Debug)]
pub struct FailingRealtimeSink;

#[async_trait]
impl RealtimeSink for FailingRealtimeSink {
    async fn push(
        &self,
        _group: RealtimeGroup,
        _message: RealtimeMessage,
    ) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("hub unavailable".into()))
    }
}
