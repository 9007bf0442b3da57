//! Worker endpoints
//!
//! An endpoint is a static (host, port) pair taken from configuration. Host
//! lists and clients files accept bare hosts, which get the default worker
//! port appended.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Network address of a worker
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parse `host:port`, or a bare `host` with `default_port`
    ///
    /// IPv6 hosts must be bracketed: `[::1]:5000` or `[::1]`.
    pub fn parse_with_default(s: &str, default_port: u16) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::InvalidEndpoint("empty endpoint".to_string()));
        }

        if let Some(rest) = s.strip_prefix('[') {
            let (host, after) = rest
                .split_once(']')
                .ok_or_else(|| Error::InvalidEndpoint(format!("unclosed '[' in endpoint '{}'", s)))?;
            if host.is_empty() {
                return Err(Error::InvalidEndpoint(format!("missing host in endpoint '{}'", s)));
            }
            let port = match after {
                "" => default_port,
                _ => match after.strip_prefix(':') {
                    Some(port) => parse_port(port, s)?,
                    None => {
                        return Err(Error::InvalidEndpoint(format!(
                            "unexpected '{}' after ']' in endpoint '{}'",
                            after, s
                        )))
                    }
                },
            };
            return Ok(Self::new(host, port));
        }

        if s.matches(':').count() > 1 {
            return Err(Error::InvalidEndpoint(format!(
                "IPv6 endpoint '{}' must be written as [addr]:port",
                s
            )));
        }
        match s.split_once(':') {
            Some((host, port)) => {
                let port = parse_port(port, s)?;
                if host.is_empty() {
                    return Err(Error::InvalidEndpoint(format!("missing host in endpoint '{}'", s)));
                }
                Ok(Self::new(host, port))
            }
            None => Ok(Self::new(s, default_port)),
        }
    }

    /// `host:port` string usable with `TcpStream::connect`
    pub fn address(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

fn parse_port(port: &str, endpoint: &str) -> Result<u16> {
    port.parse()
        .map_err(|_| Error::InvalidEndpoint(format!("invalid port in endpoint '{}'", endpoint)))
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address())
    }
}

impl FromStr for Endpoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let has_port = match s.strip_prefix('[') {
            Some(rest) => rest.contains("]:"),
            None => s.contains(':'),
        };
        if !has_port {
            return Err(Error::InvalidEndpoint(format!("endpoint '{}' must be host:port", s)));
        }
        Self::parse_with_default(s, 0)
    }
}

impl TryFrom<String> for Endpoint {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Endpoint> for String {
    fn from(e: Endpoint) -> Self {
        e.address()
    }
}

/// Parse a comma-separated host list (e.g. "10.0.1.10:5000,10.0.1.11")
pub fn parse_host_list(list: &str, default_port: u16) -> Result<Vec<Endpoint>> {
    list.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| Endpoint::parse_with_default(s, default_port))
        .collect()
}

/// Parse clients file contents: one endpoint per line, `#` comments and blank lines skipped
pub fn parse_clients(content: &str, default_port: u16) -> Result<Vec<Endpoint>> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| Endpoint::parse_with_default(line, default_port))
        .collect()
}

/// Read a clients file from disk
pub fn read_clients_file(path: &Path, default_port: u16) -> Result<Vec<Endpoint>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::InvalidEndpoint(format!("failed to read {}: {}", path.display(), e)))?;
    parse_clients(&content, default_port)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_default_port() {
        assert_eq!(
            Endpoint::parse_with_default("10.0.1.10", 5000).unwrap(),
            Endpoint::new("10.0.1.10", 5000)
        );
        assert_eq!(
            Endpoint::parse_with_default(" localhost:5001 ", 5000).unwrap(),
            Endpoint::new("localhost", 5001)
        );
        assert!(Endpoint::parse_with_default("host:notaport", 5000).is_err());
        assert!(Endpoint::parse_with_default(":5000", 5000).is_err());
    }

    #[test]
    fn test_from_str_requires_port() {
        assert!("localhost".parse::<Endpoint>().is_err());
        assert_eq!("localhost:7".parse::<Endpoint>().unwrap().port, 7);
    }

    #[test]
    fn test_ipv6_endpoints() {
        assert_eq!(
            Endpoint::parse_with_default("[::1]:6000", 5000).unwrap(),
            Endpoint::new("::1", 6000)
        );
        assert_eq!(
            Endpoint::parse_with_default("[fe80::2]", 5000).unwrap(),
            Endpoint::new("fe80::2", 5000)
        );
        assert!(Endpoint::parse_with_default("::1", 5000).is_err());
        assert!(Endpoint::parse_with_default("fe80::2:5000", 5000).is_err());
        assert!(Endpoint::parse_with_default("[::1", 5000).is_err());
        assert!(Endpoint::parse_with_default("[]:5000", 5000).is_err());
        assert!(Endpoint::parse_with_default("[::1]5000", 5000).is_err());

        let ep = Endpoint::new("::1", 7000);
        assert_eq!(ep.address(), "[::1]:7000");
        assert_eq!("[::1]:7000".parse::<Endpoint>().unwrap(), ep);
        assert!("[::1]".parse::<Endpoint>().is_err());
    }

    #[test]
    fn test_parse_host_list() {
        let eps = parse_host_list("a:1, b ,c:3", 9).unwrap();
        assert_eq!(
            eps,
            vec![Endpoint::new("a", 1), Endpoint::new("b", 9), Endpoint::new("c", 3)]
        );
    }

    #[test]
    fn test_parse_clients_skips_comments() {
        let content = "# workers\n10.0.0.1:5000\n\n  10.0.0.2\n# end\n";
        let eps = parse_clients(content, 5001).unwrap();
        assert_eq!(
            eps,
            vec![Endpoint::new("10.0.0.1", 5000), Endpoint::new("10.0.0.2", 5001)]
        );
    }

    #[test]
    fn test_read_clients_file() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "127.0.0.1:6000").unwrap();
        writeln!(file, "127.0.0.1").unwrap();
        let eps = read_clients_file(file.path(), 6001).unwrap();
        assert_eq!(eps.len(), 2);
        assert_eq!(eps[1].port, 6001);
    }
}
