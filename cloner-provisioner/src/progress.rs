//! Provisioning progress: phases, the per-identifier hub the engine publishes
//! to, and the milestone streams relayed to browser clients.
//!
//! Two stream flavours exist. [`scripted_milestones`] replays a fixed timed
//! sequence that is not connected to any real run. [`live_milestones`]
//! relays what the engine actually publishes for one identifier and ends on
//! the first terminal phase, so failures reach the client.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::stream::{self, Stream, StreamExt};
use tokio::sync::watch;
use tokio::time::{timeout_at, Instant};

use crate::workspace::WorkspaceId;

/// Substring of the final milestone of a successful run.
pub const COMPLETION_SENTINEL: &str = "completed";

/// Substring of the milestone emitted for a failed run.
pub const FAILURE_SENTINEL: &str = "failed";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressPhase {
    Preparing,
    Initializing,
    Cloning,
    SettingUp,
    Completed,
    Failed(String),
}

impl ProgressPhase {
    pub fn milestone(&self) -> String {
        match self {
            ProgressPhase::Preparing => "Preparing workspace...".to_string(),
            ProgressPhase::Initializing => "Initializing Git...".to_string(),
            ProgressPhase::Cloning => "Cloning repository...".to_string(),
            ProgressPhase::SettingUp => "Setting up workspace...".to_string(),
            ProgressPhase::Completed => "Clone completed successfully!".to_string(),
            ProgressPhase::Failed(reason) => format!("Clone failed: {}", reason),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ProgressPhase::Completed | ProgressPhase::Failed(_))
    }
}

/// The fixed sequence replayed by [`scripted_milestones`].
pub static SCRIPTED_PHASES: [ProgressPhase; 5] = [
    ProgressPhase::Preparing,
    ProgressPhase::Initializing,
    ProgressPhase::Cloning,
    ProgressPhase::SettingUp,
    ProgressPhase::Completed,
];

type PhaseSender = watch::Sender<Option<ProgressPhase>>;

/// Latest phase per workspace identifier.
///
/// An identifier holds a `watch` channel while a run is publishing to it or
/// a client is subscribed. Once the latest phase is idle (none or terminal)
/// and no receiver remains, [`ProgressHub::release`] drops the channel.
#[derive(Clone, Default)]
pub struct ProgressHub {
    channels: Arc<Mutex<HashMap<WorkspaceId, PhaseSender>>>,
}

impl ProgressHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn channels(&self) -> MutexGuard<'_, HashMap<WorkspaceId, PhaseSender>> {
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn publish(&self, id: &WorkspaceId, phase: ProgressPhase) {
        self.channels()
            .entry(id.clone())
            .or_insert_with(|| watch::channel(None).0)
            .send_replace(Some(phase));
    }

    pub fn subscribe(&self, id: &WorkspaceId) -> watch::Receiver<Option<ProgressPhase>> {
        self.channels()
            .entry(id.clone())
            .or_insert_with(|| watch::channel(None).0)
            .subscribe()
    }

    pub fn current(&self, id: &WorkspaceId) -> Option<ProgressPhase> {
        self.channels()
            .get(id)
            .and_then(|sender| sender.borrow().clone())
    }

    /// Drop the channel for `id` if nobody listens and no run is mid-flight.
    pub fn release(&self, id: &WorkspaceId) {
        let mut channels = self.channels();
        let idle = channels.get(id).is_some_and(|sender| {
            sender.receiver_count() == 0
                && sender
                    .borrow()
                    .as_ref()
                    .map_or(true, ProgressPhase::is_terminal)
        });
        if idle {
            channels.remove(id);
        }
    }

    /// Number of identifiers currently holding a channel.
    pub fn channel_count(&self) -> usize {
        self.channels().len()
    }
}

/// Replay the scripted milestones: the first immediately, each following one
/// `interval` later, then end.
pub fn scripted_milestones(interval: Duration) -> impl Stream<Item = String> + Send + 'static {
    stream::iter(SCRIPTED_PHASES.iter().enumerate()).then(move |(index, phase)| async move {
        if index > 0 {
            tokio::time::sleep(interval).await;
        }
        phase.milestone()
    })
}

struct LiveRelay {
    hub: ProgressHub,
    id: WorkspaceId,
    rx: Option<watch::Receiver<Option<ProgressPhase>>>,
    pending: Option<ProgressPhase>,
    deadline: Instant,
}

impl LiveRelay {
    async fn next_phase(&mut self) -> ProgressPhase {
        if let Some(phase) = self.pending.take() {
            return phase;
        }

        let Some(rx) = self.rx.as_mut() else {
            return ProgressPhase::Failed("progress channel closed".to_string());
        };

        loop {
            match timeout_at(self.deadline, rx.changed()).await {
                Ok(Ok(())) => {
                    if let Some(phase) = rx.borrow_and_update().clone() {
                        return phase;
                    }
                }
                Ok(Err(_)) => {
                    return ProgressPhase::Failed("progress channel closed".to_string());
                }
                Err(_) => {
                    return ProgressPhase::Failed(
                        "timed out waiting for provisioning".to_string(),
                    );
                }
            }
        }
    }
}

impl Drop for LiveRelay {
    fn drop(&mut self) {
        // The receiver must be gone before the hub counts what is left.
        drop(self.rx.take());
        self.hub.release(&self.id);
    }
}

/// Relay the phases the engine publishes for `id` until a terminal one.
///
/// A run already in progress is reported from its current phase. A terminal
/// phase present at subscription time belongs to an earlier run and is
/// skipped. Without a terminal phase within `wait_limit` the stream reports a
/// timeout failure and ends. Dropping the stream releases its channel.
pub fn live_milestones(
    hub: &ProgressHub,
    id: &WorkspaceId,
    wait_limit: Duration,
) -> impl Stream<Item = String> + Send + 'static {
    let mut rx = hub.subscribe(id);
    let pending = rx
        .borrow_and_update()
        .clone()
        .filter(|phase| !phase.is_terminal());

    let relay = LiveRelay {
        hub: hub.clone(),
        id: id.clone(),
        rx: Some(rx),
        pending,
        deadline: Instant::now() + wait_limit,
    };

    stream::unfold(Some(relay), |relay| async move {
        let mut relay = match relay {
            Some(relay) => relay,
            None => return None,
        };
        let phase = relay.next_phase().await;
        let next = if phase.is_terminal() { None } else { Some(relay) };
        Some((phase.milestone(), next))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::pin;

    fn id(raw: &str) -> WorkspaceId {
        WorkspaceId::parse(raw).unwrap()
    }

    #[test]
    fn test_milestone_sentinels() {
        assert!(ProgressPhase::Completed.milestone().contains(COMPLETION_SENTINEL));
        assert!(ProgressPhase::Failed("exit 128".into())
            .milestone()
            .contains(FAILURE_SENTINEL));
        assert!(!ProgressPhase::Cloning.milestone().contains(COMPLETION_SENTINEL));
        assert!(ProgressPhase::Completed.is_terminal());
        assert!(!ProgressPhase::SettingUp.is_terminal());
    }

    #[tokio::test(start_paused = true)]
    async fn test_scripted_sequence_is_paced() {
        let interval = Duration::from_secs(1);
        let mut milestones = pin!(scripted_milestones(interval));
        let start = Instant::now();

        let mut received = Vec::new();
        while let Some(milestone) = milestones.next().await {
            received.push((milestone, start.elapsed()));
        }

        assert_eq!(received.len(), 5);
        assert_eq!(received[0].0, "Preparing workspace...");
        assert_eq!(received[4].0, "Clone completed successfully!");
        for (index, (_, at)) in received.iter().enumerate() {
            assert_eq!(*at, interval * index as u32);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_relays_until_terminal() {
        let hub = ProgressHub::new();
        let alice = id("alice");
        let mut milestones = pin!(live_milestones(&hub, &alice, Duration::from_secs(60)));

        hub.publish(&alice, ProgressPhase::Preparing);
        assert_eq!(milestones.next().await.unwrap(), "Preparing workspace...");

        hub.publish(&alice, ProgressPhase::Failed("exit 128".into()));
        assert_eq!(milestones.next().await.unwrap(), "Clone failed: exit 128");
        assert!(milestones.next().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_starts_from_phase_in_progress() {
        let hub = ProgressHub::new();
        let alice = id("alice");
        hub.publish(&alice, ProgressPhase::Cloning);

        let mut milestones = pin!(live_milestones(&hub, &alice, Duration::from_secs(60)));
        assert_eq!(milestones.next().await.unwrap(), "Cloning repository...");
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_skips_terminal_phase_of_earlier_run() {
        let hub = ProgressHub::new();
        let alice = id("alice");
        hub.publish(&alice, ProgressPhase::Failed("previous attempt".into()));

        let mut milestones = pin!(live_milestones(&hub, &alice, Duration::from_secs(60)));
        hub.publish(&alice, ProgressPhase::Completed);

        assert_eq!(
            milestones.next().await.unwrap(),
            "Clone completed successfully!"
        );
        assert!(milestones.next().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_times_out_without_terminal_phase() {
        let hub = ProgressHub::new();
        let alice = id("alice");
        let mut milestones = pin!(live_milestones(&hub, &alice, Duration::from_secs(5)));

        let milestone = milestones.next().await.unwrap();
        assert!(milestone.contains(FAILURE_SENTINEL));
        assert!(milestone.contains("timed out"));
        assert!(milestones.next().await.is_none());
    }

    #[test]
    fn test_hub_keeps_identifiers_apart() {
        let hub = ProgressHub::new();
        hub.publish(&id("alice"), ProgressPhase::Cloning);

        assert_eq!(hub.current(&id("alice")), Some(ProgressPhase::Cloning));
        assert_eq!(hub.current(&id("bob")), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_streams_release_their_channels() {
        let hub = ProgressHub::new();

        for n in 0..100 {
            let user = id(&format!("user{}", n));
            let mut milestones = pin!(live_milestones(&hub, &user, Duration::from_secs(1)));
            // Times out, then ends.
            assert!(milestones.next().await.unwrap().contains("timed out"));
        }
        for n in 100..200 {
            let user = id(&format!("user{}", n));
            drop(live_milestones(&hub, &user, Duration::from_secs(60)));
        }

        assert_eq!(hub.channel_count(), 0);
    }

    #[test]
    fn test_release_keeps_channels_in_use() {
        let hub = ProgressHub::new();
        let alice = id("alice");
        let bob = id("bob");

        hub.publish(&alice, ProgressPhase::Cloning);
        hub.release(&alice);
        assert_eq!(hub.current(&alice), Some(ProgressPhase::Cloning));

        let rx = hub.subscribe(&bob);
        hub.publish(&bob, ProgressPhase::Completed);
        hub.release(&bob);
        assert_eq!(hub.channel_count(), 2);

        drop(rx);
        hub.release(&bob);
        hub.publish(&alice, ProgressPhase::Completed);
        hub.release(&alice);
        assert_eq!(hub.channel_count(), 0);
    }
}
