use std::fmt;

use crate::uri::UriError;

/// A validated `(host, port)` pair.
///
/// The host is lowercased on construction so equality and hashing are
/// case-insensitive. A missing port means the deployment's default port.
// TODO: Parse IPv6 literals and Unix domain socket paths.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct HostPort {
    host: String,
    port: Option<u16>,
}

impl HostPort {
    pub fn new(host: impl Into<String>, port: Option<u16>) -> Result<Self, UriError> {
        let host = host.into().to_ascii_lowercase();
        if host.is_empty() {
            return Err(UriError::InvalidHostPort("host is empty".to_string()));
        }
        if port == Some(0) {
            return Err(UriError::InvalidHostPort(
                "port must be between [1..65535]: 0".to_string(),
            ));
        }
        Ok(Self { host, port })
    }

    /// Parses `host[:port]`. The port, when present, must be all decimal
    /// digits and within `[1..65535]`.
    pub fn from_host_port_string(host_port: &str) -> Result<Self, UriError> {
        match host_port.split_once(':') {
            Some((host, port)) => {
                if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(UriError::InvalidHostPort(format!(
                        "port must be numeric: {port}"
                    )));
                }
                let port: u16 = port.parse().map_err(|_| {
                    UriError::InvalidHostPort(format!("port must be between [1..65535]: {port}"))
                })?;
                Self::new(host, Some(port))
            }
            None => Self::new(host_port, None),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }
}

impl fmt::Display for HostPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}:{}", self.host, port),
            None => f.write_str(&self.host),
        }
    }
}
