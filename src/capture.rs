//! Continuous still capture.
//!
//! Each frame triggers `actTakePicture`, downloads the one-shot URL it returns
//! and writes the bytes to `photo<frame_time>.jpg`.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use crate::camera;
use crate::error::Result;
use crate::session::Session;

/// Filename timestamp with 1/100 s resolution: `YYYYMMDDHHMMSS<hh>Z` (UTC).
///
/// `t` is rounded to the nearest hundredth by adding 0.005 before truncating.
/// The seconds and hundredths are derived separately from the rounded value,
/// so float error right at a boundary can pair `00` hundredths with the
/// previous second.  Existing photo archives sort on this exact format.
///
/// Seconds outside chrono's representable range are clamped to the epoch.
pub fn frame_time(t: f64) -> String {
    let t = t + 0.005;
    let hundredths = (t * 100.0) as i64 % 100;
    let utc = DateTime::<Utc>::from_timestamp(t.floor() as i64, 0).unwrap_or_else(|| {
        warn!("frame time {t} is out of range; using the epoch");
        DateTime::<Utc>::default()
    });
    format!("{}{hundredths:02}Z", utc.format("%Y%m%d%H%M%S"))
}

/// Seconds since the Unix epoch as a float.
pub fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

pub fn frame_path(out_dir: &Path, t: f64) -> PathBuf {
    out_dir.join(format!("photo{}.jpg", frame_time(t)))
}

/// Take one picture and save it.
///
/// Returns `Ok(None)` when the camera produced no picture; no download is
/// attempted in that case.
pub async fn capture_one(session: &Session, out_dir: &Path) -> Result<Option<PathBuf>> {
    let path = frame_path(out_dir, unix_now());
    let Some(url) = camera::take_picture(session).await? else {
        return Ok(None);
    };
    debug!("downloading {url}");
    let image = session.rpc().fetch(&url).await?;
    tokio::fs::write(&path, &image).await?;
    info!("{} ({} bytes)", path.display(), image.len());
    Ok(Some(path))
}

/// Capture until `max_frames` attempts have been made (0 = forever).
///
/// Per-frame failures are logged and the loop moves on.  Returns the number
/// of frames written.
pub async fn run(session: &Session, out_dir: &Path, max_frames: u64) -> Result<u64> {
    tokio::fs::create_dir_all(out_dir).await?;
    let mut attempts = 0u64;
    let mut saved = 0u64;
    while max_frames == 0 || attempts < max_frames {
        attempts += 1;
        match capture_one(session, out_dir).await {
            Ok(Some(_)) => saved += 1,
            Ok(None) => debug!("frame {attempts}: no picture"),
            Err(e) => warn!("frame {attempts}: {e}"),
        }
    }
    Ok(saved)
}
