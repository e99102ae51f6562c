use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::instrument;

use crate::topology_description::TopologyDescription;
use crate::uri::Uri;
use crate::{
    run_topology_scanner_actor, Heartbeat, HeartbeatResult, TopologyScannerActor,
    TopologyScannerError, TopologyScannerMessage,
};

pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);

/**
This is a handle to the actor that owns the topology.

Only one TopologyScannerActor should exist per cluster. Cloning this handle is
very cheap and will not instantiate a new actor in the background. It is
recommended to clone this handle to each component that needs the current
topology. When the last handle goes out of scope and is dropped, the backing
actor and all of its monitor tasks stop as well.

The actor is the sole writer of the topology; consumers read immutable
snapshots through [`TopologyScanner::topology`] or await changes through
[`TopologyScanner::watch`].
*/
#[derive(Clone, Debug)]
pub struct TopologyScanner {
    sender: mpsc::Sender<TopologyScannerMessage>,
    watcher: watch::Receiver<TopologyDescription>,
}

impl TopologyScanner {
    pub fn new(uri: &Uri, heartbeat: impl Heartbeat) -> Self {
        Self::with_heartbeat_interval(uri, heartbeat, DEFAULT_HEARTBEAT_INTERVAL)
    }

    pub fn with_heartbeat_interval(
        uri: &Uri,
        heartbeat: impl Heartbeat,
        heartbeat_interval: Duration,
    ) -> Self {
        let topology = TopologyDescription::from_uri(uri);
        let (sender, receiver) = mpsc::channel(8);
        let (publisher, watcher) = watch::channel(topology.clone());
        let actor = TopologyScannerActor::new(
            receiver,
            // Monitors must not keep the actor alive, so they get a weak
            // sender and the handles keep the only strong ones.
            sender.downgrade(),
            Box::new(heartbeat),
            heartbeat_interval,
            topology,
            publisher,
        );
        tokio::spawn(run_topology_scanner_actor(actor));

        Self { sender, watcher }
    }

    /// The latest published topology snapshot.
    pub fn topology(&self) -> TopologyDescription {
        self.watcher.borrow().clone()
    }

    /// A receiver that yields every newly published topology snapshot, for
    /// callers that want to await changes instead of polling.
    pub fn watch(&self) -> watch::Receiver<TopologyDescription> {
        self.watcher.clone()
    }

    /// Feeds one out-of-band heartbeat observation to the actor, for
    /// collaborators that learn about a server's state without a monitor
    /// probe.
    #[instrument(level = "debug", name = "Actor Handle - Apply Heartbeat", skip(self))]
    pub async fn apply(&self, result: HeartbeatResult) -> Result<(), TopologyScannerError> {
        self.sender
            .send(TopologyScannerMessage::ApplyHeartbeat { result })
            .await
            .map_err(|_| TopologyScannerError::Closed)
    }

    /// Stops all monitors. Idempotent; heartbeat results arriving after the
    /// close are discarded.
    #[instrument(level = "debug", name = "Actor Handle - Close", skip(self))]
    pub async fn close(&self) -> Result<(), TopologyScannerError> {
        self.sender
            .send(TopologyScannerMessage::Close)
            .await
            .map_err(|_| TopologyScannerError::Closed)
    }
}
