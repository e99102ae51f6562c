use crate::error_chain_fmt;

/// Errors produced while parsing and resolving a connection string.
///
/// All of these are configuration errors: fatal at construction time and
/// never retried. Runtime monitoring conditions are folded into topology
/// state instead and never surface here.
#[derive(thiserror::Error)]
pub enum UriError {
    #[error("Unsupported scheme: {0}")]
    UnsupportedScheme(String),
    #[error("Invalid host/port: {0}")]
    InvalidHostPort(String),
    #[error("No hosts were parsed")]
    NoHosts,
    #[error("Decoded auth database contains invalid characters: {0}")]
    InvalidAuthDatabase(String),
    #[error("Invalid option key/value pair: {pair}")]
    InvalidOptionPair { pair: String },
    #[error("Invalid value for option `{key}`: {value}")]
    InvalidOptionValue { key: String, value: String },
    #[error("SRV scheme requires one host but {0} were parsed")]
    SrvRequiresSingleHost(usize),
    #[error("SRV scheme prohibits a port but `{0}` was parsed")]
    SrvProhibitsPort(u16),
    #[error("SRV lookup requires a host with at least three parts: {0}")]
    SrvHostTooShort(String),
    #[error("SRV lookup for `{name}` failed")]
    SrvLookupFailed {
        name: String,
        source: anyhow::Error,
    },
    #[error("SRV lookup for `{0}` returned no results")]
    SrvLookupEmpty(String),
    #[error("SRV result does not share parent domain `{domain}`: {target}")]
    SrvDomainMismatch { domain: String, target: String },
    #[error("TXT lookup for `{name}` failed")]
    TxtLookupFailed {
        name: String,
        source: anyhow::Error,
    },
    #[error("Expected at most one TXT record but {0} were returned")]
    TxtAmbiguous(usize),
    #[error("Option `{0}` is not supported in TXT records")]
    TxtOptionNotAllowed(String),
    #[error("directConnection URI option conflicts with multiple hosts")]
    DirectConnectionConflict,
    #[error("loadBalanced URI option conflicts with {0}")]
    LoadBalancedConflict(&'static str),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl std::fmt::Debug for UriError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
