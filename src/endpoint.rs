//! Camera RPC endpoint and the source it is resolved from.

use url::Url;

use crate::error::{CamError, Result};

/// Value of the `camera` option that requests SSDP discovery.
pub const SSDP_SENTINEL: &str = "SSDP";

/// Base URL of the camera's web API, e.g. `http://10.0.0.1:10000/sony`.
///
/// Resolved once at startup and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint(Url);

impl Endpoint {
    pub fn parse(s: &str) -> Result<Self> {
        let url = Url::parse(s.trim())
            .map_err(|e| CamError::Config(format!("invalid camera URL {s:?}: {e}")))?;
        match url.scheme() {
            "http" | "https" => Ok(Endpoint(url)),
            other => Err(CamError::Config(format!(
                "camera URL {s:?} has unsupported scheme {other:?}"
            ))),
        }
    }

    /// URL of one API service: `<endpoint>/<service>`.
    pub fn service_url(&self, service: &str) -> String {
        format!(
            "{}/{}",
            self.0.as_str().trim_end_matches('/'),
            service.trim_start_matches('/')
        )
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0.as_str())
    }
}

/// Where the endpoint comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraSource {
    Url(Endpoint),
    Ssdp,
}

impl CameraSource {
    pub fn parse(s: &str) -> Result<Self> {
        if s.trim().eq_ignore_ascii_case(SSDP_SENTINEL) {
            Ok(CameraSource::Ssdp)
        } else {
            Endpoint::parse(s).map(CameraSource::Url)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_url_joins_with_one_slash() {
        let ep = Endpoint::parse("http://10.0.0.1:10000/sony").unwrap();
        assert_eq!(ep.service_url("camera"), "http://10.0.0.1:10000/sony/camera");
        let ep = Endpoint::parse("http://10.0.0.1:10000/sony/").unwrap();
        assert_eq!(ep.service_url("accessControl"), "http://10.0.0.1:10000/sony/accessControl");
    }

    #[test]
    fn sentinel_is_case_insensitive() {
        assert_eq!(CameraSource::parse("ssdp").unwrap(), CameraSource::Ssdp);
        assert_eq!(CameraSource::parse(" SSDP ").unwrap(), CameraSource::Ssdp);
    }

    #[test]
    fn rejects_non_http() {
        assert!(CameraSource::parse("ftp://10.0.0.1/sony").is_err());
        assert!(CameraSource::parse("10.0.0.1").is_err());
    }
}
