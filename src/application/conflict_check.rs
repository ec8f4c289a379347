use crate::application::calendar_engine::{CalendarEngine, ConflictVerdict};
use crate::domain::models::{Event, Interval};
use crate::infrastructure::config::EngineConfig;
use crate::infrastructure::error::EngineError;
use crate::infrastructure::event_snapshot::EventSnapshotRepository;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CheckTicket {
    sequence: u64,
}

impl CheckTicket {
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

/// Hands out check tickets; only the most recently issued one may publish.
#[derive(Debug, Default)]
pub struct ConflictCheckCoordinator {
    latest: AtomicU64,
}

impl ConflictCheckCoordinator {
    pub fn issue(&self) -> CheckTicket {
        let sequence = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        CheckTicket { sequence }
    }

    pub fn latest(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, ticket: CheckTicket) -> bool {
        self.latest() == ticket.sequence
    }

    pub fn apply<T>(&self, ticket: CheckTicket, value: T) -> Option<T> {
        self.is_current(ticket).then_some(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Debouncer {
    window: Duration,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.debounce_window())
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Waits out the quiescence window; false when a newer check was issued meanwhile.
    pub async fn settle(&self, coordinator: &ConflictCheckCoordinator, ticket: CheckTicket) -> bool {
        if !self.window.is_zero() {
            sleep(self.window).await;
        }
        coordinator.is_current(ticket)
    }
}

/// Source of truth for events, typically backed by the calendar server.
#[async_trait]
pub trait AuthoritativeEventSource: Send + Sync {
    /// Events overlapping or touching `interval`.
    async fn list_intersecting(&self, interval: &Interval) -> Result<Vec<Event>, EngineError>;
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u8,
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 200,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VerdictTier {
    Provisional,
    Authoritative,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TieredVerdict {
    pub ticket: CheckTicket,
    pub tier: VerdictTier,
    pub verdict: ConflictVerdict,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckCompletion {
    Completed(TieredVerdict),
    Superseded,
}

pub struct TwoTierConflictChecker<L, A>
where
    L: EventSnapshotRepository,
    A: AuthoritativeEventSource,
{
    engine: Arc<CalendarEngine>,
    local: Arc<L>,
    authoritative: Arc<A>,
    coordinator: Arc<ConflictCheckCoordinator>,
    debouncer: Debouncer,
    retry_policy: RetryPolicy,
}

impl<L, A> TwoTierConflictChecker<L, A>
where
    L: EventSnapshotRepository,
    A: AuthoritativeEventSource,
{
    pub fn new(engine: Arc<CalendarEngine>, local: Arc<L>, authoritative: Arc<A>) -> Self {
        let debouncer = Debouncer::from_config(engine.config());
        Self {
            engine,
            local,
            authoritative,
            coordinator: Arc::new(ConflictCheckCoordinator::default()),
            debouncer,
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn with_debouncer(mut self, debouncer: Debouncer) -> Self {
        self.debouncer = debouncer;
        self
    }

    pub fn coordinator(&self) -> Arc<ConflictCheckCoordinator> {
        Arc::clone(&self.coordinator)
    }

    /// Issues a ticket for a new check, superseding every earlier one.
    pub fn request(&self) -> CheckTicket {
        self.coordinator.issue()
    }

    pub fn check_local(&self, candidate: &Event) -> Result<ConflictVerdict, EngineError> {
        candidate.validate()?;
        let events = self.local.list_intersecting(&candidate.interval)?;
        self.engine.evaluate(candidate, &events)
    }

    /// Runs the debounced two-tier check for `ticket`.
    ///
    /// A local conflict is published right away as provisional. The
    /// authoritative verdict is published last and is the only one that can
    /// declare the candidate clean. Nothing is published for a superseded
    /// ticket.
    pub async fn check<F>(
        &self,
        ticket: CheckTicket,
        candidate: &Event,
        mut publish: F,
    ) -> Result<CheckCompletion, EngineError>
    where
        F: FnMut(TieredVerdict) + Send,
    {
        candidate.validate()?;
        if !self.debouncer.settle(&self.coordinator, ticket).await {
            debug!(sequence = ticket.sequence, "conflict check superseded while debouncing");
            return Ok(CheckCompletion::Superseded);
        }

        let local_events = self.local.list_intersecting(&candidate.interval)?;
        let provisional = self.engine.evaluate(candidate, &local_events)?;
        if provisional.has_conflict() {
            let Some(verdict) = self.coordinator.apply(ticket, provisional) else {
                return Ok(CheckCompletion::Superseded);
            };
            publish(TieredVerdict {
                ticket,
                tier: VerdictTier::Provisional,
                verdict,
            });
        }

        let remote_events = match self.list_authoritative_with_retry(&candidate.interval).await {
            Ok(events) => events,
            Err(_) if !self.coordinator.is_current(ticket) => {
                return Ok(CheckCompletion::Superseded);
            }
            Err(error) => return Err(error),
        };
        if !self.coordinator.is_current(ticket) {
            debug!(sequence = ticket.sequence, "discarding stale authoritative result");
            return Ok(CheckCompletion::Superseded);
        }

        let verdict = self.engine.evaluate(candidate, &remote_events)?;
        let Some(verdict) = self.coordinator.apply(ticket, verdict) else {
            return Ok(CheckCompletion::Superseded);
        };
        let outcome = TieredVerdict {
            ticket,
            tier: VerdictTier::Authoritative,
            verdict,
        };
        publish(outcome.clone());
        Ok(CheckCompletion::Completed(outcome))
    }

    async fn list_authoritative_with_retry(&self, interval: &Interval) -> Result<Vec<Event>, EngineError> {
        let max_attempts = self.retry_policy.max_attempts.max(1);
        let mut attempt: u8 = 0;

        loop {
            match self.authoritative.list_intersecting(interval).await {
                Ok(events) => return Ok(events),
                Err(error) if should_retry(&error) && attempt + 1 < max_attempts => {
                    let delay = self
                        .retry_policy
                        .base_delay_ms
                        .saturating_mul(2u64.saturating_pow(attempt as u32));
                    warn!(attempt, delay_ms = delay, %error, "authoritative source failed, retrying");
                    sleep(Duration::from_millis(delay)).await;
                    attempt = attempt.saturating_add(1);
                }
                Err(error) => return Err(error),
            }
        }
    }
}

fn should_retry(error: &EngineError) -> bool {
    matches!(error, EngineError::Upstream { retryable: true, .. })
}
