//! Client configuration file parser.
//!
//! Plain `key = value` lines; `#` starts a comment.  Every key is optional and
//! command-line flags take precedence over anything read here.

use std::fs;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use crate::endpoint::CameraSource;
use crate::error::{CamError, Result};

// Default timeouts (seconds)
const SSDP_TIMEOUT: u64 = 5;
const HTTP_TIMEOUT: u64 = 30;

/// Camera address used when neither the config nor the CLI names one.
pub const DEFAULT_CAMERA: &str = "http://10.0.0.1:10000/sony";

/// Full client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    // ── Camera ────────────────────────────────────────────────────────────────
    /// Camera RPC base URL, or `SSDP` to discover it.
    pub camera: String,
    /// Local IPv4 address of the interface used for the SSDP search.
    pub interface_ip: Option<String>,
    // ── Timeouts ──────────────────────────────────────────────────────────────
    pub ssdp_timeout: u64,
    pub http_timeout: u64,
    // ── Shooting settings (need the extended method set) ──────────────────────
    pub still_aspect:  Option<String>,
    pub still_size:    Option<String>,
    pub exposure_mode: Option<String>,
    /// Set the camera clock from this host (extended method).
    pub set_clock:     bool,
    // ── Capture ───────────────────────────────────────────────────────────────
    pub out_dir:    PathBuf,
    /// Stop after this many capture attempts; 0 runs until interrupted.
    pub max_frames: u64,
    /// Dump camera diagnostics before capturing.
    pub show_info:  bool,
    // ── Process ───────────────────────────────────────────────────────────────
    pub log_syslog: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            camera:        DEFAULT_CAMERA.to_string(),
            interface_ip:  None,
            ssdp_timeout:  SSDP_TIMEOUT,
            http_timeout:  HTTP_TIMEOUT,
            still_aspect:  None,
            still_size:    None,
            exposure_mode: None,
            set_clock:     false,
            out_dir:       PathBuf::from("."),
            max_frames:    0,
            show_info:     true,
            log_syslog:    false,
        }
    }
}

impl ClientConfig {
    /// True when a configured setting can only be applied after the
    /// extended method set has been unlocked.
    pub fn needs_extended_methods(&self) -> bool {
        self.still_size.is_some() || self.exposure_mode.is_some() || self.set_clock
    }

    /// The SSDP interface address, if one is configured.
    pub fn interface_addr(&self) -> Result<Option<Ipv4Addr>> {
        self.interface_ip
            .as_deref()
            .map(|ip| {
                ip.parse().map_err(|_| {
                    CamError::Config(format!("interface_ip {ip:?} is not an IPv4 address"))
                })
            })
            .transpose()
    }
}

/// Read and parse `path` as a `qx_client.conf` file.
pub fn load_config(path: &Path) -> Result<ClientConfig> {
    let content = fs::read_to_string(path)
        .map_err(|e| CamError::Config(format!("cannot read {}: {e}", path.display())))?;
    Ok(parse_config(&content))
}

/// Parse configuration text.  Unknown keys and empty values are ignored.
pub fn parse_config(content: &str) -> ClientConfig {
    let mut cfg = ClientConfig::default();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, val)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let val = val.trim().to_string();
        if val.is_empty() {
            continue;
        }

        match key.as_str() {
            "camera"        => cfg.camera        = val,
            "interface_ip"  => cfg.interface_ip  = Some(val),
            "ssdp_timeout"  => cfg.ssdp_timeout  = val.parse().unwrap_or(SSDP_TIMEOUT),
            "http_timeout"  => cfg.http_timeout  = val.parse().unwrap_or(HTTP_TIMEOUT),
            "still_aspect"  => cfg.still_aspect  = Some(val),
            "still_size"    => cfg.still_size    = Some(val),
            "exposure_mode" => cfg.exposure_mode = Some(val),
            "set_clock"     => cfg.set_clock     = parse_bool(&val),
            "out_dir"       => cfg.out_dir       = PathBuf::from(&val),
            "max_frames"    => cfg.max_frames    = val.parse().unwrap_or(0),
            "show_info"     => cfg.show_info     = parse_bool(&val),
            "log_syslog"    => cfg.log_syslog    = parse_bool(&val),
            _ => {} // ignore unknown keys
        }
    }

    cfg
}

fn parse_bool(val: &str) -> bool {
    matches!(val, "true" | "1" | "yes")
}

/// Validate the fields that cannot be defaulted.
pub fn validate_config(cfg: &ClientConfig) -> Result<()> {
    CameraSource::parse(&cfg.camera)?;
    cfg.interface_addr()?;
    if cfg.ssdp_timeout == 0 {
        return Err(CamError::Config("ssdp_timeout must be at least 1 second".into()));
    }
    if cfg.http_timeout == 0 {
        return Err(CamError::Config("http_timeout must be at least 1 second".into()));
    }
    if cfg.still_size.is_some() != cfg.still_aspect.is_some() {
        return Err(CamError::Config(
            "still_size and still_aspect must be set together".into()
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_empty() {
        let cfg = parse_config("");
        assert_eq!(cfg.camera, DEFAULT_CAMERA);
        assert_eq!(cfg.ssdp_timeout, 5);
        assert!(cfg.show_info);
        assert!(!cfg.needs_extended_methods());
        validate_config(&cfg).unwrap();
    }

    #[test]
    fn parses_keys_and_skips_comments() {
        let cfg = parse_config(
            "# camera setup\n\
             camera = SSDP\n\
             Interface_IP = 192.168.122.1\n\
             exposure_mode = Program Auto\n\
             max_frames = 12\n\
             show_info = no\n\
             bogus = 1\n\
             out_dir =\n",
        );
        assert_eq!(cfg.camera, "SSDP");
        assert_eq!(cfg.interface_addr().unwrap(), Some(Ipv4Addr::new(192, 168, 122, 1)));
        assert_eq!(cfg.exposure_mode.as_deref(), Some("Program Auto"));
        assert_eq!(cfg.max_frames, 12);
        assert!(!cfg.show_info);
        assert_eq!(cfg.out_dir, PathBuf::from("."));
        assert!(cfg.needs_extended_methods());
    }

    #[test]
    fn bad_numbers_fall_back() {
        let cfg = parse_config("http_timeout = soon\nmax_frames = -3");
        assert_eq!(cfg.http_timeout, 30);
        assert_eq!(cfg.max_frames, 0);
    }

    #[test]
    fn rejects_bad_camera() {
        let cfg = parse_config("camera = not a url");
        assert!(matches!(validate_config(&cfg), Err(CamError::Config(_))));
    }

    #[test]
    fn rejects_bad_interface_ip() {
        let cfg = parse_config("interface_ip = eth0");
        assert!(matches!(validate_config(&cfg), Err(CamError::Config(_))));
    }

    #[test]
    fn still_size_needs_aspect() {
        let cfg = parse_config("still_size = 18M");
        assert!(validate_config(&cfg).is_err());
        let cfg = parse_config("still_size = 18M\nstill_aspect = 4:3");
        validate_config(&cfg).unwrap();
    }
}
