use std::collections::{BTreeMap, HashSet};

use crate::bson::ObjectId;
use crate::server_description::{ServerDescription, ServerType};
use crate::uri::Uri;

/// Wire versions this driver can speak. Every reachable server's own range
/// must overlap this one for the deployment to be usable.
pub const MIN_SUPPORTED_WIRE_VERSION: i32 = 6;
pub const MAX_SUPPORTED_WIRE_VERSION: i32 = 21;

/// Classification of the deployment as a whole.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TopologyType {
    Single,
    ReplicaSetNoPrimary,
    ReplicaSetWithPrimary,
    Sharded,
    LoadBalanced,
    Unknown,
}

/// Aggregate, versioned view of every known server.
///
/// The `servers` key set is exactly the set of addresses being monitored: it
/// grows when a membership list introduces a new address and shrinks when an
/// authoritative membership list no longer carries one.
#[derive(Clone, Debug, PartialEq)]
pub struct TopologyDescription {
    pub topology_type: TopologyType,
    /// Expected replica-set name, fixed by the URI or adopted from the first
    /// member that reports one.
    pub set_name: Option<String>,
    /// Highest `(setVersion, electionId)` pair seen from any server claiming
    /// to be primary; stale claims below this pair are rejected.
    pub max_election_id: Option<ObjectId>,
    pub max_set_version: Option<i64>,
    pub servers: BTreeMap<String, ServerDescription>,
    /// True until the first heartbeat result has been folded in.
    pub is_stale: bool,
    pub is_compatible: bool,
    pub compatibility_error: Option<String>,
    /// Minimum over servers reporting a non-null value; `None` means the
    /// feature is unsupported cluster-wide.
    pub logical_session_timeout_minutes: Option<i64>,
}

impl TopologyDescription {
    pub fn from_uri(uri: &Uri) -> Self {
        let options = uri.options();

        if options.load_balanced() {
            // A load-balanced deployment is never individually probed; its
            // single entry is permanent.
            let mut servers = BTreeMap::new();
            if let Some(host) = uri.hosts().first() {
                let description = ServerDescription::load_balancer(host);
                servers.insert(description.address.clone(), description);
            }
            return Self {
                topology_type: TopologyType::LoadBalanced,
                set_name: None,
                max_election_id: None,
                max_set_version: None,
                servers,
                is_stale: false,
                is_compatible: true,
                compatibility_error: None,
                logical_session_timeout_minutes: None,
            };
        }

        let topology_type = if options.direct_connection() {
            TopologyType::Single
        } else if options.replica_set().is_some() {
            TopologyType::ReplicaSetNoPrimary
        } else {
            TopologyType::Unknown
        };

        let mut servers = BTreeMap::new();
        for host in uri.hosts() {
            let description = ServerDescription::unknown(host);
            servers.insert(description.address.clone(), description);
        }

        Self {
            topology_type,
            set_name: options.replica_set().map(str::to_string),
            max_election_id: None,
            max_set_version: None,
            servers,
            is_stale: true,
            is_compatible: true,
            compatibility_error: None,
            logical_session_timeout_minutes: None,
        }
    }

    /// The server currently believed to be primary, if any.
    pub fn primary(&self) -> Option<&ServerDescription> {
        self.servers
            .values()
            .find(|s| s.server_type == ServerType::RSPrimary)
    }

    /// Folds one heartbeat snapshot into the aggregate and returns the
    /// updated view.
    ///
    /// Pure function of the current aggregate and the incoming snapshot: no
    /// I/O, and it never fails. Unrecoverable conditions such as an
    /// incompatible wire version or a misconfigured standalone are
    /// represented as state so a degraded cluster stays observable.
    #[must_use]
    pub fn apply(&self, incoming: ServerDescription) -> Self {
        if self.topology_type == TopologyType::LoadBalanced {
            return self.clone();
        }
        if !self.servers.contains_key(&incoming.address) {
            // A stale monitor reporting after its server was removed.
            return self.clone();
        }

        let mut next = self.clone();
        next.is_stale = false;
        let address = incoming.address.clone();
        let incoming_type = incoming.server_type;
        next.servers.insert(address.clone(), incoming);

        use ServerType as S;
        use TopologyType as T;
        match (next.topology_type, incoming_type) {
            // A directly-connected topology is always exactly one server.
            (T::Single, _) | (T::LoadBalanced, _) => {}

            (T::Unknown, S::Unknown | S::RSGhost | S::PossiblePrimary | S::LoadBalancer) => {}
            (T::Unknown, S::Standalone) => next.update_unknown_with_standalone(&address),
            (T::Unknown, S::Mongos) => next.topology_type = T::Sharded,
            (T::Unknown, S::RSPrimary) => next.update_rs_from_primary(&address),
            (T::Unknown, S::RSSecondary | S::RSArbiter | S::RSOther) => {
                next.topology_type = T::ReplicaSetNoPrimary;
                next.update_rs_without_primary(&address);
            }

            (T::Sharded, S::Unknown | S::Mongos) => {}
            (T::Sharded, _) => {
                next.servers.remove(&address);
            }

            (
                T::ReplicaSetNoPrimary,
                S::Unknown | S::RSGhost | S::PossiblePrimary | S::LoadBalancer,
            ) => {}
            (T::ReplicaSetNoPrimary, S::Standalone | S::Mongos) => {
                next.servers.remove(&address);
            }
            (T::ReplicaSetNoPrimary, S::RSPrimary) => next.update_rs_from_primary(&address),
            (T::ReplicaSetNoPrimary, S::RSSecondary | S::RSArbiter | S::RSOther) => {
                next.update_rs_without_primary(&address);
            }

            (
                T::ReplicaSetWithPrimary,
                S::Unknown | S::RSGhost | S::PossiblePrimary | S::LoadBalancer,
            ) => next.check_if_has_primary(),
            (T::ReplicaSetWithPrimary, S::Standalone | S::Mongos) => {
                next.servers.remove(&address);
                next.check_if_has_primary();
            }
            (T::ReplicaSetWithPrimary, S::RSPrimary) => next.update_rs_from_primary(&address),
            (T::ReplicaSetWithPrimary, S::RSSecondary | S::RSArbiter | S::RSOther) => {
                next.update_rs_with_primary_from_member(&address);
            }
        }

        next.recompute_compatibility();
        next.recompute_session_timeout();
        next
    }

    fn update_unknown_with_standalone(&mut self, address: &str) {
        if self.servers.len() > 1 {
            // A standalone cannot be part of a multi-host seed list.
            self.servers.remove(address);
        } else {
            self.topology_type = TopologyType::Single;
        }
    }

    fn update_rs_without_primary(&mut self, address: &str) {
        let Some(server) = self.servers.get(address).cloned() else {
            return;
        };
        if !self.accept_set_name(&server) {
            self.servers.remove(address);
            return;
        }
        // Learn the member's view of the set before deciding its own fate:
        // even a misconfigured alias reports real membership.
        self.add_missing_members(&server);
        if let Some(primary) = &server.primary {
            if let Some(candidate) = self.servers.get_mut(primary) {
                if candidate.server_type == ServerType::Unknown && candidate.error.is_none() {
                    // Selection eagerness only; never affects the topology type.
                    candidate.server_type = ServerType::PossiblePrimary;
                }
            }
        }
        if server.me.as_deref().map_or(false, |me| me != address) {
            // Reached at an address the server does not consider its own.
            self.servers.remove(address);
        }
    }

    fn update_rs_with_primary_from_member(&mut self, address: &str) {
        let Some(server) = self.servers.get(address).cloned() else {
            return;
        };
        if !self.accept_set_name(&server)
            || server.me.as_deref().map_or(false, |me| me != address)
        {
            self.servers.remove(address);
        }
        self.check_if_has_primary();
    }

    fn update_rs_from_primary(&mut self, address: &str) {
        let Some(server) = self.servers.get(address).cloned() else {
            return;
        };

        if !self.accept_set_name(&server) {
            self.servers.remove(address);
            self.check_if_has_primary();
            return;
        }

        if self.is_stale_primary_claim(&server) {
            // An isolated, stale primary must not override a newer election.
            self.servers
                .insert(address.to_string(), ServerDescription::unknown_address(address));
            self.check_if_has_primary();
            return;
        }
        if server.set_version.is_some() {
            self.max_set_version = server.set_version;
        }
        if server.election_id.is_some() {
            self.max_election_id = server.election_id;
        }

        // At most one primary is believed at a time.
        for (other_address, other) in self.servers.iter_mut() {
            if other_address != address && other.server_type == ServerType::RSPrimary {
                *other = ServerDescription::unknown_address(other_address.clone());
            }
        }

        // Reconcile membership with the primary's authoritative view.
        let members: HashSet<String> = server.known_addresses().map(str::to_string).collect();
        for member in &members {
            if !self.servers.contains_key(member) {
                self.servers
                    .insert(member.clone(), ServerDescription::unknown_address(member.clone()));
            }
        }
        self.servers.retain(|known, _| members.contains(known));

        self.topology_type = TopologyType::ReplicaSetWithPrimary;
        self.check_if_has_primary();
    }

    /// True when the server's reported set name is usable; adopts it when no
    /// expected name has been fixed yet.
    fn accept_set_name(&mut self, server: &ServerDescription) -> bool {
        match (&self.set_name, &server.set_name) {
            (None, Some(reported)) => {
                self.set_name = Some(reported.clone());
                true
            }
            (Some(expected), Some(reported)) => expected == reported,
            (_, None) => false,
        }
    }

    /// Compares the incoming claim's `(setVersion, electionId)` against the
    /// highest pair seen: `setVersion` first, `electionId` as tiebreak. A
    /// null `setVersion` never displaces a known one.
    fn is_stale_primary_claim(&self, server: &ServerDescription) -> bool {
        match (server.set_version, self.max_set_version) {
            (None, Some(_)) => true,
            (_, None) => false,
            (Some(incoming), Some(max)) => {
                if incoming != max {
                    incoming < max
                } else {
                    match (server.election_id, self.max_election_id) {
                        (None, Some(_)) => true,
                        (_, None) => false,
                        (Some(incoming), Some(max)) => incoming < max,
                    }
                }
            }
        }
    }

    fn add_missing_members(&mut self, server: &ServerDescription) {
        for member in server.known_addresses() {
            if !self.servers.contains_key(member) {
                self.servers
                    .insert(member.to_string(), ServerDescription::unknown_address(member));
            }
        }
    }

    fn check_if_has_primary(&mut self) {
        self.topology_type = if self.primary().is_some() {
            TopologyType::ReplicaSetWithPrimary
        } else {
            TopologyType::ReplicaSetNoPrimary
        };
    }

    /// A standing condition, re-checked on every update rather than a
    /// one-time gate.
    fn recompute_compatibility(&mut self) {
        self.is_compatible = true;
        self.compatibility_error = None;
        for server in self.servers.values() {
            // Only a server with a completed successful heartbeat carries a
            // real wire-version range; `PossiblePrimary` is a remark on a
            // never-probed entry.
            if matches!(
                server.server_type,
                ServerType::Unknown | ServerType::PossiblePrimary
            ) || server.error.is_some()
            {
                continue;
            }
            if server.min_wire_version > MAX_SUPPORTED_WIRE_VERSION {
                self.is_compatible = false;
                self.compatibility_error = Some(format!(
                    "Server at {} requires wire version {}, but this driver only supports up to {}; upgrade the driver",
                    server.address, server.min_wire_version, MAX_SUPPORTED_WIRE_VERSION
                ));
                return;
            }
            if server.max_wire_version < MIN_SUPPORTED_WIRE_VERSION {
                self.is_compatible = false;
                self.compatibility_error = Some(format!(
                    "Server at {} only supports wire versions up to {}, but this driver requires at least {}; upgrade the server",
                    server.address, server.max_wire_version, MIN_SUPPORTED_WIRE_VERSION
                ));
                return;
            }
        }
    }

    fn recompute_session_timeout(&mut self) {
        self.logical_session_timeout_minutes = self
            .servers
            .values()
            .filter(|s| s.error.is_none())
            .filter_map(|s| s.logical_session_timeout_minutes)
            .min();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::bson::ObjectId;
    use crate::server_description::HelloReply;
    use crate::uri::Uri;

    async fn parse(input: &str) -> Uri {
        Uri::parse(input).await.unwrap()
    }

    fn oid(hex: &str) -> ObjectId {
        ObjectId::parse_str(hex).unwrap()
    }

    fn member_reply(set_name: &str) -> HelloReply {
        HelloReply {
            set_name: Some(set_name.to_string()),
            min_wire_version: 6,
            max_wire_version: 17,
            ..Default::default()
        }
    }

    fn primary_reply(
        set_name: &str,
        set_version: i64,
        election_id: ObjectId,
        hosts: &[&str],
    ) -> HelloReply {
        HelloReply {
            is_writable_primary: true,
            set_version: Some(set_version),
            election_id: Some(election_id),
            hosts: hosts.iter().map(|h| h.to_string()).collect(),
            ..member_reply(set_name)
        }
    }

    fn secondary_reply(set_name: &str, hosts: &[&str], primary: Option<&str>) -> HelloReply {
        HelloReply {
            secondary: true,
            hosts: hosts.iter().map(|h| h.to_string()).collect(),
            primary: primary.map(|p| p.to_string()),
            ..member_reply(set_name)
        }
    }

    fn standalone_reply() -> HelloReply {
        HelloReply {
            min_wire_version: 6,
            max_wire_version: 17,
            ..Default::default()
        }
    }

    fn mongos_reply() -> HelloReply {
        HelloReply {
            msg: Some("isdbgrid".to_string()),
            min_wire_version: 6,
            max_wire_version: 17,
            ..Default::default()
        }
    }

    fn snapshot(address: &str, reply: &HelloReply) -> ServerDescription {
        ServerDescription::from_hello_reply(address, reply, Duration::from_millis(5), None)
    }

    #[tokio::test]
    async fn construction_for_load_balanced() {
        let uri = parse("mongodb://lb.example.com:27017/?loadBalanced=true").await;
        let topology = TopologyDescription::from_uri(&uri);
        assert_eq!(topology.topology_type, TopologyType::LoadBalanced);
        assert!(topology.is_compatible);
        assert!(!topology.is_stale);
        assert_eq!(topology.servers.len(), 1);
        assert_eq!(
            topology.servers["lb.example.com:27017"].server_type,
            ServerType::LoadBalancer
        );
    }

    #[tokio::test]
    async fn construction_for_direct_connection() {
        let uri = parse("mongodb://db.example.com/?directConnection=true").await;
        let topology = TopologyDescription::from_uri(&uri);
        assert_eq!(topology.topology_type, TopologyType::Single);
    }

    #[tokio::test]
    async fn construction_for_replica_set() {
        let uri = parse("mongodb://s1:27017,s2:27017/?replicaSet=rs0").await;
        let topology = TopologyDescription::from_uri(&uri);
        assert_eq!(topology.topology_type, TopologyType::ReplicaSetNoPrimary);
        assert_eq!(topology.set_name.as_deref(), Some("rs0"));
        assert_eq!(topology.servers.len(), 2);
        assert!(topology
            .servers
            .values()
            .all(|s| s.server_type == ServerType::Unknown));
    }

    // The plain construction path has no early return; the aggregate must
    // come back populated rather than relying on fall-through control flow.
    #[tokio::test]
    async fn construction_for_plain_seed_list_returns_the_aggregate() {
        let uri = parse("mongodb://s1:27017,s2:27017").await;
        let topology = TopologyDescription::from_uri(&uri);
        assert_eq!(topology.topology_type, TopologyType::Unknown);
        assert_eq!(topology.servers.len(), 2);
        assert!(topology.is_stale);
        assert!(topology.is_compatible);
    }

    #[tokio::test]
    async fn unknown_addresses_are_ignored() {
        let uri = parse("mongodb://s1:27017/?replicaSet=rs0").await;
        let topology = TopologyDescription::from_uri(&uri);
        let stray = snapshot("stranger:27017", &member_reply("rs0"));
        let updated = topology.apply(stray);
        assert_eq!(updated, topology);
    }

    #[tokio::test]
    async fn apply_is_idempotent() {
        let uri = parse("mongodb://s1:27017,s2:27017/?replicaSet=rs0").await;
        let topology = TopologyDescription::from_uri(&uri);
        let primary = snapshot(
            "s1:27017",
            &primary_reply("rs0", 1, oid("0000000000000000000000aa"), &["s1:27017", "s2:27017"]),
        );
        let once = topology.apply(primary.clone());
        let twice = once.apply(primary);
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn single_topology_never_changes_type() {
        let uri = parse("mongodb://s1:27017/?directConnection=true").await;
        let topology = TopologyDescription::from_uri(&uri);
        let updated = topology.apply(snapshot("s1:27017", &mongos_reply()));
        assert_eq!(updated.topology_type, TopologyType::Single);
        let updated = updated.apply(snapshot(
            "s1:27017",
            &primary_reply("rs0", 1, oid("0000000000000000000000aa"), &["s1:27017"]),
        ));
        assert_eq!(updated.topology_type, TopologyType::Single);
        assert_eq!(updated.servers.len(), 1);
    }

    #[tokio::test]
    async fn single_seed_standalone_becomes_single() {
        let uri = parse("mongodb://s1:27017").await;
        let topology = TopologyDescription::from_uri(&uri);
        let updated = topology.apply(snapshot("s1:27017", &standalone_reply()));
        assert_eq!(updated.topology_type, TopologyType::Single);
    }

    #[tokio::test]
    async fn standalone_among_multiple_seeds_is_dropped() {
        let uri = parse("mongodb://s1:27017,s2:27017").await;
        let topology = TopologyDescription::from_uri(&uri);
        let updated = topology.apply(snapshot("s1:27017", &standalone_reply()));
        assert_eq!(updated.topology_type, TopologyType::Unknown);
        assert!(!updated.servers.contains_key("s1:27017"));
        assert!(updated.servers.contains_key("s2:27017"));
    }

    #[tokio::test]
    async fn sharded_sticks_once_seen() {
        let uri = parse("mongodb://s1:27017,s2:27017").await;
        let topology = TopologyDescription::from_uri(&uri);
        let updated = topology.apply(snapshot("s1:27017", &mongos_reply()));
        assert_eq!(updated.topology_type, TopologyType::Sharded);

        // A later replica-set primary cannot re-classify the deployment.
        let updated = updated.apply(snapshot(
            "s2:27017",
            &primary_reply("rs0", 1, oid("0000000000000000000000aa"), &["s2:27017"]),
        ));
        assert_eq!(updated.topology_type, TopologyType::Sharded);
        assert!(!updated.servers.contains_key("s2:27017"));
    }

    #[tokio::test]
    async fn secondary_moves_unknown_to_replica_set_no_primary() {
        let uri = parse("mongodb://s1:27017,s2:27017").await;
        let topology = TopologyDescription::from_uri(&uri);
        let updated = topology.apply(snapshot(
            "s1:27017",
            &secondary_reply("rs0", &["s1:27017", "s2:27017"], Some("s2:27017")),
        ));
        assert_eq!(updated.topology_type, TopologyType::ReplicaSetNoPrimary);
        assert_eq!(updated.set_name.as_deref(), Some("rs0"));
        // The reported primary is marked for eager checking only.
        assert_eq!(
            updated.servers["s2:27017"].server_type,
            ServerType::PossiblePrimary
        );
    }

    #[tokio::test]
    async fn possible_primary_marking_does_not_affect_compatibility() {
        let uri = parse("mongodb://s1:27017,s2:27017").await;
        let topology = TopologyDescription::from_uri(&uri);
        let updated = topology.apply(snapshot(
            "s1:27017",
            &secondary_reply("rs0", &["s1:27017", "s2:27017"], Some("s2:27017")),
        ));
        assert_eq!(
            updated.servers["s2:27017"].server_type,
            ServerType::PossiblePrimary
        );
        // The marked entry was never probed; its placeholder wire-version
        // range must not count against the deployment.
        assert!(updated.is_compatible);
        assert_eq!(updated.compatibility_error, None);
    }

    #[tokio::test]
    async fn conflicting_set_name_removes_the_server() {
        let uri = parse("mongodb://s1:27017,s2:27017/?replicaSet=rs0").await;
        let topology = TopologyDescription::from_uri(&uri);
        let updated = topology.apply(snapshot(
            "s1:27017",
            &secondary_reply("rs-other", &["s1:27017"], None),
        ));
        assert_eq!(updated.topology_type, TopologyType::ReplicaSetNoPrimary);
        assert_eq!(updated.set_name.as_deref(), Some("rs0"));
        assert!(!updated.servers.contains_key("s1:27017"));
    }

    #[tokio::test]
    async fn primary_acceptance_reconciles_membership() {
        let uri = parse("mongodb://s1:27017,s2:27017/?replicaSet=rs0").await;
        let topology = TopologyDescription::from_uri(&uri);
        assert_eq!(topology.topology_type, TopologyType::ReplicaSetNoPrimary);

        let election = oid("0000000000000000000000aa");
        let updated = topology.apply(snapshot(
            "s1:27017",
            &primary_reply("rs0", 1, election, &["s1:27017", "s2:27017", "s3:27017"]),
        ));
        assert_eq!(updated.topology_type, TopologyType::ReplicaSetWithPrimary);
        assert_eq!(updated.servers.len(), 3);
        assert_eq!(
            updated.servers["s3:27017"].server_type,
            ServerType::Unknown
        );
        assert_eq!(updated.max_set_version, Some(1));
        assert_eq!(updated.max_election_id, Some(election));
        assert_eq!(updated.primary().map(|p| p.address.as_str()), Some("s1:27017"));
    }

    #[tokio::test]
    async fn stale_primary_claim_is_demoted() {
        let uri = parse("mongodb://s1:27017,s2:27017/?replicaSet=rs0").await;
        let topology = TopologyDescription::from_uri(&uri);

        let newer = oid("0000000000000000000000a1");
        let older = oid("0000000000000000000000a0");
        let updated = topology.apply(snapshot(
            "s1:27017",
            &primary_reply("rs0", 1, newer, &["s1:27017", "s2:27017"]),
        ));
        let updated = updated.apply(snapshot(
            "s2:27017",
            &primary_reply("rs0", 1, older, &["s1:27017", "s2:27017"]),
        ));

        assert_eq!(updated.topology_type, TopologyType::ReplicaSetWithPrimary);
        assert_eq!(updated.primary().map(|p| p.address.as_str()), Some("s1:27017"));
        assert_eq!(updated.servers["s2:27017"].server_type, ServerType::Unknown);
        assert_eq!(updated.max_set_version, Some(1));
        assert_eq!(updated.max_election_id, Some(newer));
    }

    #[tokio::test]
    async fn newer_election_displaces_the_old_primary() {
        let uri = parse("mongodb://s1:27017,s2:27017/?replicaSet=rs0").await;
        let topology = TopologyDescription::from_uri(&uri);

        let updated = topology.apply(snapshot(
            "s1:27017",
            &primary_reply("rs0", 1, oid("0000000000000000000000a0"), &["s1:27017", "s2:27017"]),
        ));
        let updated = updated.apply(snapshot(
            "s2:27017",
            &primary_reply("rs0", 1, oid("0000000000000000000000a1"), &["s1:27017", "s2:27017"]),
        ));

        assert_eq!(updated.primary().map(|p| p.address.as_str()), Some("s2:27017"));
        assert_eq!(updated.servers["s1:27017"].server_type, ServerType::Unknown);
    }

    #[tokio::test]
    async fn null_set_version_never_displaces_a_known_one() {
        let uri = parse("mongodb://s1:27017,s2:27017/?replicaSet=rs0").await;
        let topology = TopologyDescription::from_uri(&uri);

        let updated = topology.apply(snapshot(
            "s1:27017",
            &primary_reply("rs0", 2, oid("0000000000000000000000a0"), &["s1:27017", "s2:27017"]),
        ));
        let mut clueless = primary_reply(
            "rs0",
            0,
            oid("0000000000000000000000ff"),
            &["s1:27017", "s2:27017"],
        );
        clueless.set_version = None;
        let updated = updated.apply(snapshot("s2:27017", &clueless));

        assert_eq!(updated.primary().map(|p| p.address.as_str()), Some("s1:27017"));
        assert_eq!(updated.max_set_version, Some(2));
    }

    #[tokio::test]
    async fn host_dropped_from_primary_membership_is_removed() {
        let uri = parse("mongodb://s1:27017,s2:27017,s3:27017/?replicaSet=rs0").await;
        let topology = TopologyDescription::from_uri(&uri);
        let updated = topology.apply(snapshot(
            "s1:27017",
            &primary_reply("rs0", 1, oid("0000000000000000000000a0"), &["s1:27017", "s2:27017"]),
        ));
        assert_eq!(updated.servers.len(), 2);
        assert!(!updated.servers.contains_key("s3:27017"));
    }

    #[tokio::test]
    async fn losing_the_primary_downgrades_the_topology() {
        let uri = parse("mongodb://s1:27017,s2:27017/?replicaSet=rs0").await;
        let topology = TopologyDescription::from_uri(&uri);
        let updated = topology.apply(snapshot(
            "s1:27017",
            &primary_reply("rs0", 1, oid("0000000000000000000000a0"), &["s1:27017", "s2:27017"]),
        ));
        assert_eq!(updated.topology_type, TopologyType::ReplicaSetWithPrimary);

        let updated = updated.apply(ServerDescription::from_error(
            "s1:27017",
            "connection reset",
            Some(Duration::from_millis(2)),
        ));
        assert_eq!(updated.topology_type, TopologyType::ReplicaSetNoPrimary);
        assert!(updated.servers.contains_key("s1:27017"));
    }

    #[tokio::test]
    async fn member_with_mismatched_me_is_removed_but_its_hosts_are_learned() {
        let uri = parse("mongodb://alias:27017/?replicaSet=rs0").await;
        let topology = TopologyDescription::from_uri(&uri);
        let mut reply = secondary_reply("rs0", &["s1:27017", "s2:27017"], None);
        reply.me = Some("s1:27017".to_string());
        let updated = topology.apply(snapshot("alias:27017", &reply));
        assert!(!updated.servers.contains_key("alias:27017"));
        // The alias's membership report still seeds the real addresses.
        assert_eq!(
            updated.servers["s1:27017"].server_type,
            ServerType::Unknown
        );
        assert_eq!(
            updated.servers["s2:27017"].server_type,
            ServerType::Unknown
        );
    }

    #[tokio::test]
    async fn wire_version_mismatch_is_a_standing_condition() {
        let uri = parse("mongodb://s1:27017").await;
        let topology = TopologyDescription::from_uri(&uri);

        let mut ancient = standalone_reply();
        ancient.min_wire_version = 0;
        ancient.max_wire_version = 4;
        let updated = topology.apply(snapshot("s1:27017", &ancient));
        assert!(!updated.is_compatible);
        let message = updated.compatibility_error.clone().unwrap();
        assert!(message.contains("s1:27017"), "message: {message}");
        assert!(message.contains("upgrade the server"), "message: {message}");

        // A compatible reply from the same server clears the condition.
        let updated = updated.apply(snapshot("s1:27017", &standalone_reply()));
        assert!(updated.is_compatible);
        assert_eq!(updated.compatibility_error, None);

        let mut futuristic = standalone_reply();
        futuristic.min_wire_version = MAX_SUPPORTED_WIRE_VERSION + 1;
        futuristic.max_wire_version = MAX_SUPPORTED_WIRE_VERSION + 5;
        let updated = updated.apply(snapshot("s1:27017", &futuristic));
        assert!(!updated.is_compatible);
        assert!(updated
            .compatibility_error
            .unwrap()
            .contains("upgrade the driver"));
    }

    #[tokio::test]
    async fn session_timeout_is_the_minimum_across_reporting_servers() {
        let uri = parse("mongodb://s1:27017,s2:27017,s3:27017/?replicaSet=rs0").await;
        let topology = TopologyDescription::from_uri(&uri);

        let mut primary = primary_reply(
            "rs0",
            1,
            oid("0000000000000000000000a0"),
            &["s1:27017", "s2:27017", "s3:27017"],
        );
        primary.logical_session_timeout_minutes = Some(30);
        let updated = topology.apply(snapshot("s1:27017", &primary));
        assert_eq!(updated.logical_session_timeout_minutes, Some(30));

        let mut secondary = secondary_reply("rs0", &["s1:27017", "s2:27017", "s3:27017"], None);
        secondary.logical_session_timeout_minutes = Some(20);
        let updated = updated.apply(snapshot("s2:27017", &secondary));
        assert_eq!(updated.logical_session_timeout_minutes, Some(20));

        // A server reporting nothing does not lower the minimum.
        let secondary = secondary_reply("rs0", &["s1:27017", "s2:27017", "s3:27017"], None);
        let updated = updated.apply(snapshot("s3:27017", &secondary));
        assert_eq!(updated.logical_session_timeout_minutes, Some(20));
    }

    #[tokio::test]
    async fn load_balanced_topology_ignores_heartbeats() {
        let uri = parse("mongodb://lb.example.com:27017/?loadBalanced=true").await;
        let topology = TopologyDescription::from_uri(&uri);
        let updated = topology.apply(snapshot("lb.example.com:27017", &mongos_reply()));
        assert_eq!(updated, topology);
        assert_eq!(
            updated.servers["lb.example.com:27017"].server_type,
            ServerType::LoadBalancer
        );
    }

    #[tokio::test]
    async fn ghost_reports_leave_classification_alone() {
        let uri = parse("mongodb://s1:27017,s2:27017/?replicaSet=rs0").await;
        let topology = TopologyDescription::from_uri(&uri);
        let ghost = HelloReply {
            is_replica_set: true,
            min_wire_version: 6,
            max_wire_version: 17,
            ..Default::default()
        };
        let updated = topology.apply(snapshot("s1:27017", &ghost));
        assert_eq!(updated.topology_type, TopologyType::ReplicaSetNoPrimary);
        assert_eq!(updated.servers["s1:27017"].server_type, ServerType::RSGhost);
    }
}
