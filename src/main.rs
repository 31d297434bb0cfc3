//! Remote capture client for Sony cameras driven over their WiFi web API.
//!
//! Usage:
//!   qx-client                                  # camera at http://10.0.0.1:10000/sony
//!   qx-client --camera SSDP --interface-ip 10.0.0.2
//!   qx-client -c /etc/qx_client.conf --out-dir /data/photos

mod auth;
mod camera;
mod capture;
mod config;
mod discovery;
mod endpoint;
mod error;
mod rpc;
mod session;
mod transport;

use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use log::{error, info, warn};

use crate::config::ClientConfig;
use crate::discovery::SsdpSearcher;
use crate::endpoint::CameraSource;
use crate::rpc::RpcClient;
use crate::session::Session;
use crate::transport::{HttpTransport, Transport};

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Debug, Parser)]
#[command(name = "qx-client", about = "Continuous still capture from a Sony WiFi camera")]
struct Cli {
    /// Path to an optional configuration file.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Camera API URL, or SSDP to discover it.
    #[arg(long)]
    camera: Option<String>,

    /// Local IPv4 address of the interface to run the SSDP search on.
    #[arg(long = "interface-ip")]
    interface_ip: Option<String>,

    /// Directory the photos are written to.
    #[arg(long = "out-dir")]
    out_dir: Option<PathBuf>,

    /// Stop after this many capture attempts (0 = until interrupted).
    #[arg(long = "max-frames")]
    max_frames: Option<u64>,

    /// Skip the camera diagnostics dump.
    #[arg(long = "no-info")]
    no_info: bool,

    /// Set the camera clock from this host before capturing.
    #[arg(long = "set-clock")]
    set_clock: bool,

    /// Log to stderr even if the config enables syslog.
    #[arg(long)]
    stderr: bool,
}

impl Cli {
    /// Overlay command-line values on the file configuration.
    fn apply(&self, mut cfg: ClientConfig) -> ClientConfig {
        if let Some(c) = &self.camera       { cfg.camera       = c.clone(); }
        if let Some(ip) = &self.interface_ip { cfg.interface_ip = Some(ip.clone()); }
        if let Some(d) = &self.out_dir      { cfg.out_dir      = d.clone(); }
        if let Some(n) = self.max_frames    { cfg.max_frames   = n; }
        if self.no_info   { cfg.show_info = false; }
        if self.set_clock { cfg.set_clock = true; }
        cfg
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let cfg = match &cli.config {
        Some(path) => match config::load_config(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("qx-client: config error: {e}");
                process::exit(1);
            }
        },
        None => ClientConfig::default(),
    };
    let cfg = cli.apply(cfg);
    if let Err(e) = config::validate_config(&cfg) {
        eprintln!("qx-client: config validation: {e}");
        process::exit(1);
    }

    let use_syslog = cfg.log_syslog && !cli.stderr;
    if let Err(e) = setup_logging(use_syslog) {
        eprintln!("qx-client: logging: {e}");
        process::exit(1);
    }

    if let Err(e) = run(&cfg).await {
        error!("{e:#}");
        process::exit(1);
    }
}

/// Resolve the camera, negotiate, report, configure, then capture until
/// interrupted.
async fn run(cfg: &ClientConfig) -> anyhow::Result<()> {
    let transport: Arc<dyn Transport> =
        Arc::new(HttpTransport::new(Duration::from_secs(cfg.http_timeout))?);

    let source = CameraSource::parse(&cfg.camera)?;
    let searcher = SsdpSearcher::new(cfg.interface_addr()?, Duration::from_secs(cfg.ssdp_timeout));
    let endpoint = discovery::resolve(&source, &searcher, transport.as_ref())
        .await
        .context("camera discovery")?;
    info!("camera endpoint: {endpoint}");

    let mut session = Session::new(RpcClient::new(endpoint, transport));
    prepare(&mut session, cfg).await?;

    info!("capturing to {}", cfg.out_dir.display());
    tokio::select! {
        saved = capture::run(&session, &cfg.out_dir, cfg.max_frames) => {
            info!("{} frames saved", saved?);
        }
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted; exiting");
        }
    }
    Ok(())
}

/// Negotiate, check capabilities, report and apply the configured settings.
///
/// A rejected handshake only aborts when a configured setting needs the
/// extended method set.
async fn prepare(session: &mut Session, cfg: &ClientConfig) -> anyhow::Result<()> {
    if let Err(e) = session.enable_extended_methods().await {
        if cfg.needs_extended_methods() {
            return Err(anyhow::Error::from(e).context("enabling extended methods"));
        }
        warn!("{e}; continuing with the base method set");
    }

    let apis = camera::get_available_api_list(session)
        .await
        .context("getAvailableApiList")?;
    if apis.iter().any(|api| api == "startRecMode") {
        camera::start_rec_mode(session).await.context("startRecMode")?;
    }

    if cfg.show_info {
        camera::show_info(session).await.context("camera info")?;
    }

    if cfg.set_clock {
        camera::set_current_time(session, chrono::Utc::now()).await?;
        info!("camera clock set");
    }
    if let (Some(aspect), Some(size)) = (&cfg.still_aspect, &cfg.still_size) {
        camera::set_still_size(session, aspect, size).await?;
        let now = camera::get_still_size(session).await?;
        info!("still size: {} {}", now.aspect, now.size);
    }
    if let Some(mode) = &cfg.exposure_mode {
        camera::set_exposure_mode(session, mode).await?;
        info!("exposure mode: {}", camera::get_exposure_mode(session).await?);
    }
    Ok(())
}

// ── Logging setup ─────────────────────────────────────────────────────────────

fn setup_logging(use_syslog: bool) -> anyhow::Result<()> {
    if use_syslog {
        let formatter = syslog::Formatter3164 {
            facility: syslog::Facility::LOG_USER,
            hostname: None,
            process:  "qx-client".into(),
            pid:      process::id(),
        };
        let logger = syslog::unix(formatter)
            .map_err(|e| anyhow::anyhow!("syslog connect failed: {e}"))?;
        log::set_boxed_logger(Box::new(syslog::BasicLogger::new(logger)))
            .map(|()| log::set_max_level(log::LevelFilter::Info))
            .map_err(|e| anyhow::anyhow!("set_logger: {e}"))?;
    } else {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Info)
            .parse_default_env()
            .init();
    }
    Ok(())
}
