/*!
mongodb_client is the cluster-discovery core of a MongoDB driver. It turns a
connection string into a validated set of candidate servers (resolving DNS
SRV/TXT records for the `mongodb+srv` scheme) and maintains a live view of the
cluster topology by folding per-server heartbeat results into an immutable
[`TopologyDescription`].

This library requires tokio and async, and uses the actor pattern to keep a
single [`TopologyScanner`] per cluster: one monitor task per known server
feeds heartbeat results through an ordered channel into the actor, which is
the sole writer of the topology. Consumers always read immutable snapshots.

The wire protocol itself is out of scope: the scanner consumes decoded
[`HelloReply`] values (or failure causes) from an external [`Heartbeat`]
collaborator and never opens a socket.

# Example
```rust
# tokio_test::block_on(async {
use mongodb_client::{TopologyDescription, TopologyType, Uri};

let uri = Uri::parse("mongodb://db1.example.com:27017,db2.example.com/?replicaSet=rs0")
    .await
    .unwrap();
let topology = TopologyDescription::from_uri(&uri);
assert_eq!(topology.topology_type, TopologyType::ReplicaSetNoPrimary);
assert_eq!(topology.servers.len(), 2);
# })
```
*/

pub mod bson;
mod host_port;
mod server_description;
mod topology_description;
mod topology_scanner;
pub mod uri;

pub use host_port::*;
pub use server_description::*;
pub use topology_description::*;
pub use topology_scanner::*;
pub use uri::{DnsResolver, HickoryDnsResolver, OptionValue, SrvTarget, Uri, UriError, UriOptions};

pub fn error_chain_fmt(
    e: &impl std::error::Error,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    writeln!(f, "{}\n", e)?;
    let mut current = e.source();
    while let Some(cause) = current {
        writeln!(f, "Caused by:\n\t{}", cause)?;
        current = cause.source();
    }
    Ok(())
}
