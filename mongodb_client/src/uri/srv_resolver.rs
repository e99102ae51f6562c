use async_trait::async_trait;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::error::ResolveErrorKind;
use hickory_resolver::TokioAsyncResolver;

/// A single SRV record target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SrvTarget {
    pub target: String,
    pub port: u16,
}

/// The DNS operations the connection-string resolver depends on.
///
/// The parser never performs network I/O directly; tests substitute a fake
/// so no lookup ever leaves the process.
#[async_trait]
pub trait DnsResolver: Send + Sync {
    async fn srv_lookup(&self, name: &str) -> anyhow::Result<Vec<SrvTarget>>;

    /// Returns the TXT records for `name`. Absence of records is an empty
    /// list, not an error.
    async fn txt_lookup(&self, name: &str) -> anyhow::Result<Vec<String>>;
}

/// [`DnsResolver`] backed by hickory with the system default configuration.
pub struct HickoryDnsResolver {
    resolver: TokioAsyncResolver,
}

impl HickoryDnsResolver {
    pub fn new() -> Self {
        Self {
            resolver: TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default()),
        }
    }
}

impl Default for HickoryDnsResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DnsResolver for HickoryDnsResolver {
    async fn srv_lookup(&self, name: &str) -> anyhow::Result<Vec<SrvTarget>> {
        let lookup = self.resolver.srv_lookup(name).await?;
        Ok(lookup
            .iter()
            .map(|srv| SrvTarget {
                target: srv.target().to_utf8().trim_end_matches('.').to_string(),
                port: srv.port(),
            })
            .collect())
    }

    async fn txt_lookup(&self, name: &str) -> anyhow::Result<Vec<String>> {
        let lookup = match self.resolver.txt_lookup(name).await {
            Ok(lookup) => lookup,
            Err(e) if matches!(e.kind(), ResolveErrorKind::NoRecordsFound { .. }) => {
                return Ok(Vec::new())
            }
            Err(e) => return Err(e.into()),
        };
        Ok(lookup.iter().map(|txt| txt.to_string()).collect())
    }
}
