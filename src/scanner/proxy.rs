//! SOCKS5 proxy selection from the process environment.
//!
//! `ALL_PROXY` (or `all_proxy`) names a `socks5://` or `socks5h://` proxy,
//! optionally with `user:password@` credentials. `NO_PROXY` (or `no_proxy`)
//! lists hosts that bypass it.

use crate::error::{ConfigError, ConfigResult};
use ipnetwork::IpNetwork;
use std::io;
use std::net::IpAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use url::Url;

const SOCKS_VERSION: u8 = 0x05;
const METHOD_NO_AUTH: u8 = 0x00;
const METHOD_USER_PASS: u8 = 0x02;
const METHOD_UNACCEPTABLE: u8 = 0xff;
const CMD_CONNECT: u8 = 0x01;
const ATYP_IPV4: u8 = 0x01;
const ATYP_DOMAIN: u8 = 0x03;
const ATYP_IPV6: u8 = 0x04;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Credentials {
    username: String,
    password: String,
}

/// A SOCKS5 proxy and the hosts that bypass it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Proxy address as `host:port`.
    addr: String,
    credentials: Option<Credentials>,
    no_proxy: Vec<String>,
}

impl ProxyConfig {
    /// Read the proxy from `ALL_PROXY` / `NO_PROXY`.
    ///
    /// Returns `Ok(None)` when no proxy is configured.
    pub fn from_env() -> ConfigResult<Option<Self>> {
        let all_proxy = env_var(&["ALL_PROXY", "all_proxy"]);
        let no_proxy = env_var(&["NO_PROXY", "no_proxy"]);
        Self::from_vars(all_proxy.as_deref(), no_proxy.as_deref())
    }

    /// Build a proxy configuration from raw variable values.
    pub fn from_vars(
        all_proxy: Option<&str>,
        no_proxy: Option<&str>,
    ) -> ConfigResult<Option<Self>> {
        let Some(raw) = all_proxy.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(None);
        };

        let url =
            Url::parse(raw).map_err(|e| ConfigError::InvalidProxy(format!("{raw}: {e}")))?;
        if !matches!(url.scheme(), "socks5" | "socks5h") {
            return Err(ConfigError::InvalidProxy(format!(
                "unsupported proxy scheme '{}'",
                url.scheme()
            )));
        }

        let host = url
            .host_str()
            .ok_or_else(|| ConfigError::InvalidProxy(format!("{raw}: missing host")))?;
        let port = url.port().unwrap_or(1080);

        let credentials = if url.username().is_empty() {
            None
        } else {
            Some(Credentials {
                username: url.username().to_string(),
                password: url.password().unwrap_or_default().to_string(),
            })
        };

        let no_proxy = no_proxy
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_ascii_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Some(Self {
            addr: format!("{host}:{port}"),
            credentials,
            no_proxy,
        }))
    }

    /// Proxy address as `host:port`.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Check whether `host` should be dialed directly.
    pub fn bypasses(&self, host: &str) -> bool {
        let host = host
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_ascii_lowercase();
        let ip = host.parse::<IpAddr>().ok();

        self.no_proxy.iter().any(|entry| {
            if entry == "*" {
                return true;
            }
            if let Some(ip) = ip {
                if let Ok(network) = entry.parse::<IpNetwork>() {
                    return network.contains(ip);
                }
            }
            let suffix = entry.trim_start_matches('.');
            host == suffix || host.ends_with(&format!(".{suffix}"))
        })
    }

    /// Open a tunnel to `host:port` through the proxy.
    ///
    /// The destination name is passed to the proxy unresolved.
    pub async fn connect(&self, host: &str, port: u16) -> io::Result<TcpStream> {
        let mut stream = TcpStream::connect(&self.addr).await?;
        self.handshake(&mut stream).await?;
        self.request_connect(&mut stream, host, port).await?;
        Ok(stream)
    }

    async fn handshake(&self, stream: &mut TcpStream) -> io::Result<()> {
        let greeting: &[u8] = if self.credentials.is_some() {
            &[SOCKS_VERSION, 2, METHOD_NO_AUTH, METHOD_USER_PASS]
        } else {
            &[SOCKS_VERSION, 1, METHOD_NO_AUTH]
        };
        stream.write_all(greeting).await?;

        let mut response = [0u8; 2];
        stream.read_exact(&mut response).await?;
        if response[0] != SOCKS_VERSION {
            return Err(proxy_error("proxy did not answer with SOCKS5"));
        }

        match (response[1], &self.credentials) {
            (METHOD_NO_AUTH, _) => Ok(()),
            (METHOD_USER_PASS, Some(creds)) => authenticate(stream, creds).await,
            (METHOD_UNACCEPTABLE, _) => Err(proxy_error("no acceptable authentication method")),
            (method, _) => Err(proxy_error(&format!("unexpected method {method:#04x}"))),
        }
    }

    async fn request_connect(
        &self,
        stream: &mut TcpStream,
        host: &str,
        port: u16,
    ) -> io::Result<()> {
        let mut request = vec![SOCKS_VERSION, CMD_CONNECT, 0x00];
        match host.parse::<IpAddr>() {
            Ok(IpAddr::V4(addr)) => {
                request.push(ATYP_IPV4);
                request.extend_from_slice(&addr.octets());
            }
            Ok(IpAddr::V6(addr)) => {
                request.push(ATYP_IPV6);
                request.extend_from_slice(&addr.octets());
            }
            Err(_) => {
                let name = host.as_bytes();
                let len = u8::try_from(name.len())
                    .map_err(|_| proxy_error("host name too long"))?;
                request.push(ATYP_DOMAIN);
                request.push(len);
                request.extend_from_slice(name);
            }
        }
        request.extend_from_slice(&port.to_be_bytes());
        stream.write_all(&request).await?;

        let mut response = [0u8; 4];
        stream.read_exact(&mut response).await?;
        if response[0] != SOCKS_VERSION {
            return Err(proxy_error("malformed connect reply"));
        }

        // Drain BND.ADDR and BND.PORT
        let remaining = match response[3] {
            ATYP_IPV4 => 4 + 2,
            ATYP_IPV6 => 16 + 2,
            ATYP_DOMAIN => {
                let mut len = [0u8; 1];
                stream.read_exact(&mut len).await?;
                len[0] as usize + 2
            }
            atyp => return Err(proxy_error(&format!("unknown address type {atyp:#04x}"))),
        };
        let mut bound = vec![0u8; remaining];
        stream.read_exact(&mut bound).await?;

        match response[1] {
            0x00 => Ok(()),
            0x05 => Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "connection refused by proxy target",
            )),
            code => Err(proxy_error(&format!("connect failed with reply {code:#04x}"))),
        }
    }
}

async fn authenticate(stream: &mut TcpStream, creds: &Credentials) -> io::Result<()> {
    let user = creds.username.as_bytes();
    let pass = creds.password.as_bytes();
    let (Ok(user_len), Ok(pass_len)) = (u8::try_from(user.len()), u8::try_from(pass.len())) else {
        return Err(proxy_error("credentials too long"));
    };

    let request = [&[0x01, user_len][..], user, &[pass_len][..], pass].concat();
    stream.write_all(&request).await?;

    let mut response = [0u8; 2];
    stream.read_exact(&mut response).await?;
    if response[1] != 0x00 {
        return Err(proxy_error("authentication rejected"));
    }
    Ok(())
}

fn proxy_error(msg: &str) -> io::Error {
    io::Error::new(io::ErrorKind::Other, format!("socks5: {msg}"))
}

fn env_var(names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| std::env::var(name).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn test_no_proxy_configured() {
        assert_eq!(ProxyConfig::from_vars(None, None).unwrap(), None);
        assert_eq!(ProxyConfig::from_vars(Some("  "), None).unwrap(), None);
    }

    #[test]
    fn test_parse_proxy_url() {
        let proxy = ProxyConfig::from_vars(Some("socks5://user:pw@127.0.0.1:9050"), None)
            .unwrap()
            .unwrap();
        assert_eq!(proxy.addr(), "127.0.0.1:9050");
        assert_eq!(
            proxy.credentials,
            Some(Credentials {
                username: "user".to_string(),
                password: "pw".to_string()
            })
        );

        let proxy = ProxyConfig::from_vars(Some("socks5h://proxy.local"), None)
            .unwrap()
            .unwrap();
        assert_eq!(proxy.addr(), "proxy.local:1080");
        assert_eq!(proxy.credentials, None);
    }

    #[test]
    fn test_reject_unsupported_scheme() {
        let err = ProxyConfig::from_vars(Some("http://proxy:3128"), None).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidProxy(_)));
    }

    #[test]
    fn test_no_proxy_matching() {
        let proxy = ProxyConfig::from_vars(
            Some("socks5://127.0.0.1:1080"),
            Some("localhost, .internal.example,10.0.0.0/8,192.0.2.9"),
        )
        .unwrap()
        .unwrap();

        assert!(proxy.bypasses("localhost"));
        assert!(proxy.bypasses("db.internal.example"));
        assert!(proxy.bypasses("internal.example"));
        assert!(proxy.bypasses("10.20.30.40"));
        assert!(proxy.bypasses("192.0.2.9"));
        assert!(!proxy.bypasses("example.com"));
        assert!(!proxy.bypasses("notinternal.example"));
        assert!(!proxy.bypasses("192.0.2.10"));

        let all = ProxyConfig::from_vars(Some("socks5://127.0.0.1:1080"), Some("*"))
            .unwrap()
            .unwrap();
        assert!(all.bypasses("anything"));
    }

    #[tokio::test]
    async fn test_connect_through_socks5() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let proxy_addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut conn, _) = listener.accept().await.unwrap();

            let mut greeting = [0u8; 3];
            conn.read_exact(&mut greeting).await.unwrap();
            assert_eq!(greeting, [SOCKS_VERSION, 1, METHOD_NO_AUTH]);
            conn.write_all(&[SOCKS_VERSION, METHOD_NO_AUTH]).await.unwrap();

            let mut head = [0u8; 5];
            conn.read_exact(&mut head).await.unwrap();
            assert_eq!(&head[..4], &[SOCKS_VERSION, CMD_CONNECT, 0x00, ATYP_DOMAIN]);
            let mut rest = vec![0u8; head[4] as usize + 2];
            conn.read_exact(&mut rest).await.unwrap();
            assert_eq!(&rest[..head[4] as usize], b"example.com");
            assert_eq!(&rest[head[4] as usize..], &443u16.to_be_bytes());

            conn.write_all(&[SOCKS_VERSION, 0x00, 0x00, ATYP_IPV4, 0, 0, 0, 0, 0, 0])
                .await
                .unwrap();
            conn.write_all(b"tunnel").await.unwrap();
        });

        let proxy_url = format!("socks5://{proxy_addr}");
        let proxy = ProxyConfig::from_vars(Some(proxy_url.as_str()), None)
            .unwrap()
            .unwrap();
        let mut stream = proxy.connect("example.com", 443).await.unwrap();

        let mut buf = [0u8; 6];
        stream.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"tunnel");
        server.await.unwrap();
    }
}
