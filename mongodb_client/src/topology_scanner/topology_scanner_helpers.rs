use std::time::Duration;

use async_trait::async_trait;
use dyn_clone::DynClone;

use crate::server_description::HelloReply;

/// Performs one `hello` handshake round trip against a server address.
///
/// Implementations own connection handling and wire encoding; the scanner
/// only ever sees the decoded reply or a failure cause, and never opens a
/// socket itself.
#[async_trait]
pub trait Heartbeat: DynClone + Send + Sync + 'static {
    async fn hello(&self, address: &str) -> Result<HelloReply, String>;
}

dyn_clone::clone_trait_object!(Heartbeat);

/// One monitor observation, success or failure, with its measured round trip.
#[derive(Clone, Debug)]
pub struct HeartbeatResult {
    pub address: String,
    pub round_trip_time: Duration,
    pub reply: Result<HelloReply, String>,
}

#[derive(Debug)]
pub enum TopologyScannerMessage {
    /// Folds one heartbeat observation into the topology.
    ApplyHeartbeat { result: HeartbeatResult },
    /// Stops all monitors; later heartbeat results are discarded.
    Close,
}
