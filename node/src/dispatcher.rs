//! Dispatcher loop: turns verified requests into terminal outcomes.
//!
//! Each cycle lists verified-but-unprocessed requests in verification order
//! and settles them one at a time:
//!
//! ```text
//! Verified ─┬─ cooldown ──> mark_processed(Deferred) ─> notify "Daily Limit Reached"
//!           └─ proceed ───> invoke action ─> mark_processed(outcome)
//!                                           ─> last_used = now (success only)
//!                                           ─> notify result
//! ```
//!
//! `mark_processed` is the commit point, and nothing is sent to the requester
//! before it succeeds. The external action has a real side effect and is
//! never retried, so when recording fails after the action ran the completion
//! is kept in memory and only the bookkeeping is repeated on the next cycle.
//! A `last_used` write that fails after the commit is kept the same way and
//! still counts towards the cooldown until it lands.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::{self, error::TryRecvError};

use likegate_action::{ActionInvoker, ActionOutcome};
use likegate_notify::Notifier;
use likegate_policy::{Eligibility, EligibilityPolicy};
use likegate_store::GateStore;
use likegate_types::{
    Clock, ProcessOutcome, ProfileUpdate, ReplyTarget, RequestId, RequesterId, Timestamp,
    UserProfile, VerificationRequest,
};

use crate::messages;
use crate::metrics::DispatchMetrics;

/// Default sleep between cycles.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default interval between purges of expired requests.
pub const DEFAULT_PURGE_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[derive(Clone, Copy, Debug)]
pub struct DispatcherConfig {
    pub poll_interval: Duration,
    pub purge_interval: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            purge_interval: DEFAULT_PURGE_INTERVAL,
        }
    }
}

/// Counts for one cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Requests listed as awaiting dispatch.
    pub scanned: u64,
    pub deferred: u64,
    pub succeeded: u64,
    pub no_effect: u64,
    pub failed: u64,
    /// Requests left for a later cycle or already settled by another writer.
    pub skipped: u64,
    /// Completions from earlier cycles recorded in this one.
    pub recovered: u64,
    pub store_errors: u64,
    pub notify_failures: u64,
    pub purged: u64,
}

impl CycleReport {
    fn count(&mut self, outcome: ProcessOutcome) {
        match outcome {
            ProcessOutcome::Deferred => self.deferred += 1,
            ProcessOutcome::Succeeded => self.succeeded += 1,
            ProcessOutcome::NoEffect => self.no_effect += 1,
            ProcessOutcome::Failed => self.failed += 1,
        }
    }

    /// Requests that reached a terminal state in this cycle.
    pub fn settled(&self) -> u64 {
        self.deferred + self.succeeded + self.no_effect + self.failed
    }
}

/// A decision that has been made (and whose side effects have happened) but
/// is not yet recorded in the store.
#[derive(Clone, Debug)]
struct Completion {
    outcome: ProcessOutcome,
    completed_at: Timestamp,
    reply_target: ReplyTarget,
    /// Message still owed to the requester once the record is written.
    message: Option<String>,
}

pub struct Dispatcher {
    store: Arc<dyn GateStore>,
    policy: EligibilityPolicy,
    invoker: ActionInvoker,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    metrics: Option<Arc<DispatchMetrics>>,
    config: DispatcherConfig,
    unrecorded: HashMap<RequestId, Completion>,
    /// Committed successes whose `last_used` write has not landed yet.
    pending_last_used: HashMap<RequesterId, Timestamp>,
    last_purge: Option<Timestamp>,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn GateStore>,
        policy: EligibilityPolicy,
        invoker: ActionInvoker,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            store,
            policy,
            invoker,
            notifier,
            clock,
            metrics: None,
            config,
            unrecorded: HashMap::new(),
            pending_last_used: HashMap::new(),
            last_purge: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<DispatchMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Completions waiting to be recorded.
    pub fn unrecorded_count(&self) -> usize {
        self.unrecorded.len()
    }

    /// `last_used` updates waiting to be written.
    pub fn pending_last_used_count(&self) -> usize {
        self.pending_last_used.len()
    }

    /// Run cycles until `shutdown` fires. A cycle in progress is finished
    /// before the loop exits.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            poll_interval_secs = self.config.poll_interval.as_secs(),
            "dispatcher started"
        );
        loop {
            match shutdown.try_recv() {
                Err(TryRecvError::Empty) => {}
                _ => break,
            }

            let report = self.run_cycle().await;
            if report.scanned > 0 || report.purged > 0 {
                tracing::debug!(?report, "dispatch cycle complete");
            }

            tokio::select! {
                _ = shutdown.recv() => break,
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }
        if !self.unrecorded.is_empty() || !self.pending_last_used.is_empty() {
            tracing::warn!(
                unrecorded = self.unrecorded.len(),
                pending_last_used = self.pending_last_used.len(),
                "dispatcher stopping with unrecorded state"
            );
        }
        tracing::info!("dispatcher stopped");
    }

    /// One pass over every verified, unprocessed request.
    ///
    /// Never fails: store errors are logged, counted and retried on a later
    /// cycle.
    pub async fn run_cycle(&mut self) -> CycleReport {
        let mut report = CycleReport::default();
        self.flush_last_used(&mut report);

        match self.store.list_verified_unprocessed() {
            Ok(pending) => {
                report.scanned = pending.len() as u64;
                let mut seen = HashSet::with_capacity(pending.len());
                for request in &pending {
                    seen.insert(request.id);
                    self.dispatch_one(request, &mut report).await;
                }
                // Anything not listed any more was settled by its own commit.
                self.unrecorded.retain(|id, _| seen.contains(id));
            }
            Err(e) => {
                report.store_errors += 1;
                tracing::warn!(error = %e, "failed to list pending requests, skipping cycle");
            }
        }

        self.maybe_purge(&mut report);

        if let Some(metrics) = &self.metrics {
            metrics.record_cycle(&report);
        }
        report
    }

    async fn dispatch_one(&mut self, request: &VerificationRequest, report: &mut CycleReport) {
        if let Some(completion) = self.unrecorded.remove(&request.id) {
            tracing::info!(
                request_id = %request.id,
                outcome = %completion.outcome,
                "recording held completion"
            );
            if self.record(request, completion, report).await {
                report.recovered += 1;
            }
            return;
        }

        let mut profile = match self.store.get_profile(request.requester_id) {
            Ok(profile) => profile.unwrap_or_else(|| UserProfile::new(request.requester_id)),
            Err(e) => {
                report.store_errors += 1;
                report.skipped += 1;
                tracing::warn!(
                    request_id = %request.id,
                    error = %e,
                    "profile lookup failed, retrying next cycle"
                );
                return;
            }
        };
        if let Some(&at) = self.pending_last_used.get(&request.requester_id) {
            profile.last_used = profile.last_used.max(Some(at));
        }

        let now = self.clock.now();
        let eligibility = self.policy.evaluate(&profile, now);
        if let Eligibility::Deferred { remaining } = eligibility {
            tracing::info!(
                request_id = %request.id,
                requester_id = %request.requester_id,
                remaining_secs = remaining.as_secs(),
                "request deferred by cooldown"
            );
            let completion = Completion {
                outcome: ProcessOutcome::Deferred,
                completed_at: now,
                reply_target: request.reply_target,
                message: Some(messages::deferred(&eligibility)),
            };
            self.record(request, completion, report).await;
            return;
        }

        let action = self.invoker.invoke(&request.target_uid).await;
        let completed_at = self.clock.now();
        let outcome = match &action {
            ActionOutcome::Success { .. } => ProcessOutcome::Succeeded,
            ActionOutcome::NoEffect => ProcessOutcome::NoEffect,
            ActionOutcome::Error { .. } => ProcessOutcome::Failed,
        };
        tracing::info!(
            request_id = %request.id,
            requester_id = %request.requester_id,
            outcome = %outcome,
            "action completed"
        );

        let completion = Completion {
            outcome,
            completed_at,
            reply_target: request.reply_target,
            message: Some(messages::action_result(
                &action,
                &request.target_uid,
                completed_at,
            )),
        };
        self.record(request, completion, report).await;
    }

    /// Write the terminal state, then the follow-ups that depend on it.
    ///
    /// Returns whether this call recorded the completion. On a retriable
    /// store error the completion is held for the next cycle; any other error
    /// drops it, since writing the same record again would fail the same way.
    async fn record(
        &mut self,
        request: &VerificationRequest,
        completion: Completion,
        report: &mut CycleReport,
    ) -> bool {
        match self
            .store
            .mark_processed(&request.id, completion.outcome, completion.completed_at)
        {
            Ok(true) => {}
            Ok(false) => {
                report.skipped += 1;
                tracing::warn!(
                    request_id = %request.id,
                    "request already processed elsewhere, dropping result"
                );
                return false;
            }
            Err(e) if !e.is_retriable() => {
                report.store_errors += 1;
                report.skipped += 1;
                tracing::error!(
                    request_id = %request.id,
                    outcome = %completion.outcome,
                    error = %e,
                    "cannot record outcome, dropping it"
                );
                return false;
            }
            Err(e) => {
                report.store_errors += 1;
                report.skipped += 1;
                tracing::error!(
                    request_id = %request.id,
                    outcome = %completion.outcome,
                    error = %e,
                    "failed to record outcome, holding it for the next cycle"
                );
                self.unrecorded.insert(request.id, completion);
                return false;
            }
        }
        report.count(completion.outcome);

        if completion.outcome == ProcessOutcome::Succeeded {
            self.pending_last_used
                .insert(request.requester_id, completion.completed_at);
            self.write_last_used(request.requester_id, completion.completed_at, report);
        }

        if let Some(message) = &completion.message {
            self.notify(completion.reply_target, message, report).await;
        }
        true
    }

    /// Retry every `last_used` write still outstanding.
    fn flush_last_used(&mut self, report: &mut CycleReport) {
        let pending: Vec<_> = self
            .pending_last_used
            .iter()
            .map(|(&requester, &at)| (requester, at))
            .collect();
        for (requester, at) in pending {
            self.write_last_used(requester, at, report);
        }
    }

    /// Write `last_used`; the entry in `pending_last_used` is cleared only
    /// once the write lands.
    fn write_last_used(
        &mut self,
        requester: RequesterId,
        at: Timestamp,
        report: &mut CycleReport,
    ) {
        match self
            .store
            .upsert_profile(requester, &ProfileUpdate::last_used(at))
        {
            Ok(_) => {
                self.pending_last_used.remove(&requester);
            }
            Err(e) => {
                report.store_errors += 1;
                tracing::error!(
                    requester_id = %requester,
                    error = %e,
                    "failed to update last_used, retrying next cycle"
                );
            }
        }
    }

    async fn notify(&self, target: ReplyTarget, message: &str, report: &mut CycleReport) {
        if let Err(e) = self.notifier.send_result(&target, message).await {
            report.notify_failures += 1;
            tracing::warn!(chat_id = target.chat_id, error = %e, "failed to deliver result");
        }
    }

    fn maybe_purge(&mut self, report: &mut CycleReport) {
        let now = self.clock.now();
        let due = match self.last_purge {
            None => true,
            Some(last) => last.elapsed_since(now) >= self.config.purge_interval.as_secs(),
        };
        if !due {
            return;
        }
        match self.store.purge_expired(now) {
            Ok(removed) => {
                self.last_purge = Some(now);
                report.purged = removed;
                if removed > 0 {
                    tracing::info!(removed, "purged expired requests");
                }
            }
            Err(e) => {
                report.store_errors += 1;
                tracing::warn!(error = %e, "purge failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use likegate_action::DEFAULT_ACTION_TIMEOUT;
    use likegate_nullables::{NullClock, NullLikeApi, NullNotifier, NullStore};
    use likegate_store::RequestStore;
    use likegate_types::{ChallengeCode, RequesterId};

    const T0: u64 = 1_700_000_000;

    #[tokio::test]
    async fn empty_store_is_a_quiet_cycle() {
        let store = Arc::new(NullStore::new());
        let api = Arc::new(NullLikeApi::new());
        let notifier = Arc::new(NullNotifier::new());
        let mut dispatcher = Dispatcher::new(
            store,
            EligibilityPolicy::default(),
            ActionInvoker::new(api.clone(), DEFAULT_ACTION_TIMEOUT),
            notifier.clone(),
            Arc::new(NullClock::new(T0)),
            DispatcherConfig::default(),
        );
        let report = dispatcher.run_cycle().await;
        assert_eq!(report, CycleReport::default());
        assert_eq!(api.calls(), 0);
        assert_eq!(notifier.sent_count(), 0);
    }

    #[tokio::test]
    async fn purge_runs_on_interval() {
        let store = Arc::new(NullStore::new());
        let clock = Arc::new(NullClock::new(T0));
        let stale = VerificationRequest::new(
            RequesterId::new(1),
            "1",
            "ind",
            ChallengeCode::parse("AAAAAAAAAAAA").unwrap(),
            ReplyTarget {
                chat_id: 1,
                message_id: 1,
            },
            Timestamp::new(T0 - 1_000),
            Timestamp::new(T0 - 400),
        );
        let mut dispatcher = Dispatcher::new(
            store.clone(),
            EligibilityPolicy::default(),
            ActionInvoker::new(Arc::new(NullLikeApi::new()), DEFAULT_ACTION_TIMEOUT),
            Arc::new(NullNotifier::new()),
            clock.clone(),
            DispatcherConfig {
                poll_interval: Duration::from_millis(10),
                purge_interval: Duration::from_secs(100),
            },
        );

        assert_eq!(dispatcher.run_cycle().await.purged, 0);
        store.create(&stale).unwrap();
        clock.advance(50);
        assert_eq!(dispatcher.run_cycle().await.purged, 0);
        clock.advance(50);
        assert_eq!(dispatcher.run_cycle().await.purged, 1);
        assert!(store.get(&stale.id).unwrap().is_none());
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let store = Arc::new(NullStore::new());
        let dispatcher = Dispatcher::new(
            store,
            EligibilityPolicy::default(),
            ActionInvoker::new(Arc::new(NullLikeApi::new()), DEFAULT_ACTION_TIMEOUT),
            Arc::new(NullNotifier::new()),
            Arc::new(NullClock::new(T0)),
            DispatcherConfig {
                poll_interval: Duration::from_secs(3600),
                purge_interval: DEFAULT_PURGE_INTERVAL,
            },
        );
        let (tx, rx) = broadcast::channel(1);
        let handle = tokio::spawn(dispatcher.run(rx));
        tokio::time::sleep(Duration::from_millis(20)).await;
        tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("dispatcher should stop promptly")
            .unwrap();
    }
}
