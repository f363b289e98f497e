//! Gateway configuration, read from the environment exactly once at startup
//! and passed into the router state.

use std::env::var;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_LISTEN: &str = "0.0.0.0:9090";
const DEFAULT_URL_EXPIRES_SECS: u64 = 3600;

#[derive(Clone, Debug)]
pub struct GatewayConfig {
    /// Bucket identifier handed to the store client.
    pub bucket: String,
    /// Lifetime of presigned download links.
    pub url_expires: Duration,
    /// Address the HTTP server binds to.
    pub listen: SocketAddr,
    /// PEM certificate and key paths. When both are set the server is served
    /// over TLS.
    pub tls: Option<(PathBuf, PathBuf)>,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, String> {
        let Ok(bucket) = var("S3GATE_BUCKET") else {
            return Err("S3GATE_BUCKET environment variable not present".into());
        };

        let url_expires = match var("S3GATE_URL_EXPIRES_SECS") {
            Ok(raw) => match raw.parse::<u64>() {
                Ok(secs) => Duration::from_secs(secs),
                Err(e) => {
                    return Err(format!("S3GATE_URL_EXPIRES_SECS is not a number: {e}"));
                }
            },
            Err(_) => Duration::from_secs(DEFAULT_URL_EXPIRES_SECS),
        };

        let listen = var("S3GATE_LISTEN").unwrap_or_else(|_| DEFAULT_LISTEN.into());
        let listen = match listen.parse::<SocketAddr>() {
            Ok(addr) => addr,
            Err(e) => {
                return Err(format!("S3GATE_LISTEN is not a valid socket address: {e}"));
            }
        };

        let tls = match (var("S3GATE_TLS_CERT"), var("S3GATE_TLS_KEY")) {
            (Ok(cert), Ok(key)) => Some((PathBuf::from(cert), PathBuf::from(key))),
            (Err(_), Err(_)) => None,
            _ => {
                return Err("S3GATE_TLS_CERT and S3GATE_TLS_KEY must be set together".into());
            }
        };

        Ok(Self {
            bucket,
            url_expires,
            listen,
            tls,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_only_bucket_is_set() {
        // Safety: this is the only test that touches these variables.
        unsafe {
            std::env::remove_var("S3GATE_URL_EXPIRES_SECS");
            std::env::remove_var("S3GATE_LISTEN");
            std::env::remove_var("S3GATE_TLS_CERT");
            std::env::remove_var("S3GATE_TLS_KEY");
            std::env::set_var("S3GATE_BUCKET", "test-bucket");
        }

        let config = GatewayConfig::from_env().unwrap();
        assert_eq!(config.bucket, "test-bucket");
        assert_eq!(config.url_expires, Duration::from_secs(3600));
        assert_eq!(config.listen, "0.0.0.0:9090".parse().unwrap());
        assert!(config.tls.is_none());
    }
}
