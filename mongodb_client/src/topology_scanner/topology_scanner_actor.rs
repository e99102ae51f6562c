use std::collections::HashMap;
use std::time::{Duration, Instant};

use rand::Rng;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{instrument, Span};
use uuid::Uuid;

use crate::server_description::ServerDescription;
use crate::topology_description::{TopologyDescription, TopologyType};
use crate::{Heartbeat, HeartbeatResult, TopologyScannerMessage};

pub struct TopologyScannerActor {
    receiver: mpsc::Receiver<TopologyScannerMessage>,
    /// Monitors hold this weak sender so they never keep the actor alive;
    /// the actor ends once every [`TopologyScanner`](crate::TopologyScanner)
    /// handle is gone.
    monitor_sender: mpsc::WeakSender<TopologyScannerMessage>,
    heartbeat: Box<dyn Heartbeat>,
    heartbeat_interval: Duration,
    topology: TopologyDescription,
    publisher: watch::Sender<TopologyDescription>,
    monitors: HashMap<String, JoinHandle<()>>,
    closed: bool,
}

impl TopologyScannerActor {
    pub fn new(
        receiver: mpsc::Receiver<TopologyScannerMessage>,
        monitor_sender: mpsc::WeakSender<TopologyScannerMessage>,
        heartbeat: Box<dyn Heartbeat>,
        heartbeat_interval: Duration,
        topology: TopologyDescription,
        publisher: watch::Sender<TopologyDescription>,
    ) -> Self {
        Self {
            receiver,
            monitor_sender,
            heartbeat,
            heartbeat_interval,
            topology,
            publisher,
            monitors: HashMap::default(),
            closed: false,
        }
    }

    /// Message handler for the TopologyScannerActor
    #[instrument(
        level = "debug",
        name = "Topology Scanner Actor - Handle Message",
        skip(self),
        fields(correlation_id)
    )]
    async fn handle_message(&mut self, msg: TopologyScannerMessage) {
        // Apply a correlation id to all child spans of this message handler
        Span::current().record("correlation_id", Uuid::new_v4().to_string());
        match msg {
            TopologyScannerMessage::ApplyHeartbeat { result } => {
                self.apply_heartbeat(result);
            }
            TopologyScannerMessage::Close => self.close(),
        }
    }

    /// Folds one heartbeat observation into the topology and publishes the
    /// new snapshot. The actor is the sole writer of the topology, so results
    /// are applied in exactly the order they arrive on the channel.
    #[instrument(level = "debug", skip(self, result), fields(address = %result.address))]
    fn apply_heartbeat(&mut self, result: HeartbeatResult) {
        if self.closed {
            tracing::debug!("Discarding heartbeat result received after close.");
            return;
        }

        let prior_min_rtt = self
            .topology
            .servers
            .get(&result.address)
            .and_then(|server| server.min_round_trip_time);
        let description = match &result.reply {
            Ok(reply) => ServerDescription::from_hello_reply(
                result.address.as_str(),
                reply,
                result.round_trip_time,
                prior_min_rtt,
            ),
            Err(cause) => ServerDescription::from_error(
                result.address.as_str(),
                cause.clone(),
                Some(result.round_trip_time),
            ),
        };
        tracing::debug!(server_type = ?description.server_type, "Applying heartbeat result.");

        self.topology = self.topology.apply(description);
        self.sync_monitors();
        self.publisher.send_replace(self.topology.clone());
    }

    /// Starts a monitor for every server without one and stops monitors
    /// whose server is no longer part of the topology.
    pub(crate) fn sync_monitors(&mut self) {
        if self.closed || self.topology.topology_type == TopologyType::LoadBalanced {
            return;
        }

        self.monitors.retain(|address, task| {
            if self.topology.servers.contains_key(address) {
                true
            } else {
                tracing::debug!(%address, "Stopping monitor for removed server.");
                task.abort();
                false
            }
        });

        for address in self.topology.servers.keys() {
            if !self.monitors.contains_key(address) {
                tracing::debug!(%address, "Starting monitor.");
                let task = spawn_monitor(
                    address.clone(),
                    dyn_clone::clone_box(&*self.heartbeat),
                    self.monitor_sender.clone(),
                    self.heartbeat_interval,
                );
                self.monitors.insert(address.clone(), task);
            }
        }
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        tracing::debug!("Closing topology scanner.");
        self.closed = true;
        for (_, task) in self.monitors.drain() {
            task.abort();
        }
    }
}

impl Drop for TopologyScannerActor {
    fn drop(&mut self) {
        for task in self.monitors.values() {
            task.abort();
        }
    }
}

/// Probes one server on a fixed cadence and reports every observation.
fn spawn_monitor(
    address: String,
    heartbeat: Box<dyn Heartbeat>,
    sender: mpsc::WeakSender<TopologyScannerMessage>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        // Stagger the first probe so monitors started together do not all
        // fire in lockstep.
        let stagger = rand::thread_rng().gen_range(0..=interval.as_millis() as u64 / 10);
        tokio::time::sleep(Duration::from_millis(stagger)).await;
        loop {
            let started = Instant::now();
            let reply = heartbeat.hello(&address).await;
            let result = HeartbeatResult {
                address: address.clone(),
                round_trip_time: started.elapsed(),
                reply,
            };

            // Upgrade only for the send; holding a strong sender across the
            // sleep would keep the actor alive after its last handle drops.
            let Some(sender) = sender.upgrade() else { break };
            if sender
                .send(TopologyScannerMessage::ApplyHeartbeat { result })
                .await
                .is_err()
            {
                break;
            }
            drop(sender);

            tokio::time::sleep(interval).await;
        }
    })
}

#[instrument(level = "debug", name = "Running Topology Scanner Actor", skip(actor))]
pub async fn run_topology_scanner_actor(mut actor: TopologyScannerActor) {
    actor.sync_monitors();
    loop {
        let msg = match actor.receiver.recv().await {
            Some(msg) => msg,
            None => break,
        };
        actor.handle_message(msg).await;
    }
}
