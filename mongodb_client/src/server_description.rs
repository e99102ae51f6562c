use std::collections::HashMap;
use std::time::{Duration, SystemTime};

use serde::Deserialize;

use crate::bson::{Document, ObjectId};
use crate::host_port::HostPort;

/// Classification of a single server from its last heartbeat.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ServerType {
    Standalone,
    Mongos,
    PossiblePrimary,
    RSPrimary,
    RSSecondary,
    RSArbiter,
    RSOther,
    RSGhost,
    LoadBalancer,
    Unknown,
}

impl ServerType {
    /// True for types that carry replica-set membership metadata.
    pub fn is_replica_set_member(self) -> bool {
        matches!(
            self,
            ServerType::RSPrimary
                | ServerType::RSSecondary
                | ServerType::RSArbiter
                | ServerType::RSOther
        )
    }
}

/// The decoded `hello` handshake reply, as handed over by a monitor.
///
/// Decoding the wire reply into these key/value fields is an external
/// collaborator's concern; this struct is the view this crate consumes.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HelloReply {
    pub is_writable_primary: bool,
    pub secondary: bool,
    pub arbiter_only: bool,
    pub hidden: bool,
    #[serde(rename = "isreplicaset")]
    pub is_replica_set: bool,
    pub msg: Option<String>,
    pub set_name: Option<String>,
    pub set_version: Option<i64>,
    pub election_id: Option<ObjectId>,
    pub primary: Option<String>,
    pub me: Option<String>,
    pub hosts: Vec<String>,
    pub passives: Vec<String>,
    pub arbiters: Vec<String>,
    pub tags: HashMap<String, String>,
    pub min_wire_version: i32,
    pub max_wire_version: i32,
    pub logical_session_timeout_minutes: Option<i64>,
    pub last_write: Option<LastWrite>,
    pub topology_version: Option<Document>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LastWrite {
    /// Milliseconds since the epoch of the last observed write.
    pub last_write_date: Option<i64>,
    pub op_time: Option<Document>,
}

impl HelloReply {
    /// Classifies the server from its self-reported role.
    pub fn server_type(&self) -> ServerType {
        if self.is_replica_set {
            ServerType::RSGhost
        } else if self.msg.as_deref() == Some("isdbgrid") {
            ServerType::Mongos
        } else if self.set_name.is_some() {
            if self.is_writable_primary {
                ServerType::RSPrimary
            } else if self.secondary {
                ServerType::RSSecondary
            } else if self.arbiter_only {
                ServerType::RSArbiter
            } else {
                ServerType::RSOther
            }
        } else {
            ServerType::Standalone
        }
    }
}

/// Immutable snapshot of one server's observed state at a point in time.
///
/// A fresh description replaces the previous one for its address on every
/// heartbeat, success or failure; it is never mutated in place.
/// `server_type` is `Unknown` iff no successful heartbeat has completed yet
/// or the last one errored, in which case `error` is set and every other
/// observation field is meaningless.
#[derive(Clone, Debug, PartialEq)]
pub struct ServerDescription {
    pub address: String,
    pub server_type: ServerType,
    pub error: Option<String>,
    pub round_trip_time: Option<Duration>,
    pub min_round_trip_time: Option<Duration>,
    pub last_write_date: Option<i64>,
    pub op_time: Option<Document>,
    pub min_wire_version: i32,
    pub max_wire_version: i32,
    pub me: Option<String>,
    pub hosts: Vec<String>,
    pub arbiters: Vec<String>,
    pub passives: Vec<String>,
    pub tags: HashMap<String, String>,
    pub set_name: Option<String>,
    pub election_id: Option<ObjectId>,
    pub set_version: Option<i64>,
    pub primary: Option<String>,
    pub last_update_time: Option<SystemTime>,
    pub logical_session_timeout_minutes: Option<i64>,
    pub topology_version: Option<Document>,
}

impl ServerDescription {
    /// The seed state before any heartbeat has completed.
    pub fn unknown(host: &HostPort) -> Self {
        Self::unknown_address(host.to_string())
    }

    pub(crate) fn unknown_address(address: impl Into<String>) -> Self {
        Self {
            address: address.into().to_ascii_lowercase(),
            server_type: ServerType::Unknown,
            error: None,
            round_trip_time: None,
            min_round_trip_time: None,
            last_write_date: None,
            op_time: None,
            min_wire_version: 0,
            max_wire_version: 0,
            me: None,
            hosts: Vec::new(),
            arbiters: Vec::new(),
            passives: Vec::new(),
            tags: HashMap::new(),
            set_name: None,
            election_id: None,
            set_version: None,
            primary: None,
            last_update_time: None,
            logical_session_timeout_minutes: None,
            topology_version: None,
        }
    }

    /// The permanent description of a load-balanced deployment's single
    /// entry, which is never individually probed.
    pub fn load_balancer(host: &HostPort) -> Self {
        let mut description = Self::unknown_address(host.to_string());
        description.server_type = ServerType::LoadBalancer;
        description
    }

    /// Builds a snapshot from a successful heartbeat.
    ///
    /// `prior_min_rtt` carries the previous snapshot's minimum so the rolling
    /// minimum survives replacement.
    pub fn from_hello_reply(
        address: impl Into<String>,
        reply: &HelloReply,
        round_trip_time: Duration,
        prior_min_rtt: Option<Duration>,
    ) -> Self {
        let min_round_trip_time =
            Some(prior_min_rtt.map_or(round_trip_time, |min| min.min(round_trip_time)));
        let (last_write_date, op_time) = match &reply.last_write {
            Some(last_write) => (last_write.last_write_date, last_write.op_time.clone()),
            None => (None, None),
        };
        Self {
            address: address.into().to_ascii_lowercase(),
            server_type: reply.server_type(),
            error: None,
            round_trip_time: Some(round_trip_time),
            min_round_trip_time,
            last_write_date,
            op_time,
            min_wire_version: reply.min_wire_version,
            max_wire_version: reply.max_wire_version,
            me: reply.me.as_deref().map(str::to_ascii_lowercase),
            hosts: normalize_addresses(&reply.hosts),
            arbiters: normalize_addresses(&reply.arbiters),
            passives: normalize_addresses(&reply.passives),
            tags: reply.tags.clone(),
            set_name: reply.set_name.clone(),
            election_id: reply.election_id,
            set_version: reply.set_version,
            primary: reply.primary.as_deref().map(str::to_ascii_lowercase),
            last_update_time: Some(SystemTime::now()),
            logical_session_timeout_minutes: reply.logical_session_timeout_minutes,
            topology_version: reply.topology_version.clone(),
        }
    }

    /// Builds a snapshot for a failed heartbeat. Only `address`, `error` and
    /// the round-trip time are meaningful.
    pub fn from_error(
        address: impl Into<String>,
        cause: impl Into<String>,
        round_trip_time: Option<Duration>,
    ) -> Self {
        let mut description = Self::unknown_address(address);
        description.error = Some(cause.into());
        description.round_trip_time = round_trip_time;
        description.last_update_time = Some(SystemTime::now());
        description
    }

    /// Union of `hosts`, `arbiters` and `passives` as seen by this server.
    pub fn known_addresses(&self) -> impl Iterator<Item = &str> {
        self.hosts
            .iter()
            .chain(&self.arbiters)
            .chain(&self.passives)
            .map(String::as_str)
    }
}

fn normalize_addresses(addresses: &[String]) -> Vec<String> {
    addresses.iter().map(|a| a.to_ascii_lowercase()).collect()
}
