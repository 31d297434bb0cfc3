//! `actEnableMethods` challenge/response that unlocks the extended camera
//! methods.
//!
//! Step 1 asks the camera for a nonce (`dg`) with an empty developer identity.
//! Step 2 answers with `sg = base64(sha256(AUTH_KEY ++ dg))` together with the
//! fixed developer identity and the list of methods to unlock.  The key and
//! identity are shared by every client of this camera family and must match
//! the firmware byte for byte.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use log::{debug, info};
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest as _, Sha256};

use crate::error::{CamError, Result};
use crate::rpc::{decode_result, service, RpcClient, RpcReply};

const ENABLE_METHODS: &str = "actEnableMethods";

/// Digest key prepended to the camera nonce.
pub const AUTH_KEY: &str = "90adc8515a40558968fe8318b5b023fdd48d3828a2dda8905f3b93a3cd8e58dc";

pub const DEVELOPER_NAME: &str = "Sony Corporation";
pub const DEVELOPER_ID: &str = "7DED695E-75AC-4ea9-8A85-E5F8CA0AF2F3";

/// Methods unlocked by a successful handshake.
pub const EXTENDED_METHODS: &[&str] = &[
    "camera/setFlashMode",
    "camera/getFlashMode",
    "camera/getSupportedFlashMode",
    "camera/getAvailableFlashMode",
    "camera/setExposureCompensation",
    "camera/getExposureCompensation",
    "camera/getSupportedExposureCompensation",
    "camera/getAvailableExposureCompensation",
    "camera/setSteadyMode",
    "camera/getSteadyMode",
    "camera/getSupportedSteadyMode",
    "camera/getAvailableSteadyMode",
    "camera/setViewAngle",
    "camera/getViewAngle",
    "camera/getSupportedViewAngle",
    "camera/getAvailableViewAngle",
    "camera/setMovieQuality",
    "camera/getMovieQuality",
    "camera/getSupportedMovieQuality",
    "camera/getAvailableMovieQuality",
    "camera/setFocusMode",
    "camera/getFocusMode",
    "camera/getSupportedFocusMode",
    "camera/getAvailableFocusMode",
    "camera/setStillSize",
    "camera/getStillSize",
    "camera/getSupportedStillSize",
    "camera/getAvailableStillSize",
    "camera/setBeepMode",
    "camera/getBeepMode",
    "camera/getSupportedBeepMode",
    "camera/getAvailableBeepMode",
    "camera/setCameraFunction",
    "camera/getCameraFunction",
    "camera/getSupportedCameraFunction",
    "camera/getAvailableCameraFunction",
    "camera/setLiveviewSize",
    "camera/getLiveviewSize",
    "camera/getSupportedLiveviewSize",
    "camera/getAvailableLiveviewSize",
    "camera/setTouchAFPosition",
    "camera/getTouchAFPosition",
    "camera/cancelTouchAFPosition",
    "camera/setFNumber",
    "camera/getFNumber",
    "camera/getSupportedFNumber",
    "camera/getAvailableFNumber",
    "camera/setShutterSpeed",
    "camera/getShutterSpeed",
    "camera/getSupportedShutterSpeed",
    "camera/getAvailableShutterSpeed",
    "camera/setIsoSpeedRate",
    "camera/getIsoSpeedRate",
    "camera/getSupportedIsoSpeedRate",
    "camera/getAvailableIsoSpeedRate",
    "camera/setExposureMode",
    "camera/getExposureMode",
    "camera/getSupportedExposureMode",
    "camera/getAvailableExposureMode",
    "camera/setWhiteBalance",
    "camera/getWhiteBalance",
    "camera/getSupportedWhiteBalance",
    "camera/getAvailableWhiteBalance",
    "camera/setProgramShift",
    "camera/getSupportedProgramShift",
    "camera/getStorageInformation",
    "camera/startLiveviewWithSize",
    "camera/startIntervalStillRec",
    "camera/stopIntervalStillRec",
    "camera/actFormatStorage",
    "system/setCurrentTime",
];

/// True if `service/method` is only callable after the handshake.
pub fn is_extended(service: &str, method: &str) -> bool {
    EXTENDED_METHODS
        .iter()
        .filter_map(|m| m.split_once('/'))
        .any(|(s, m)| s == service && m == method)
}

/// `base64(sha256(AUTH_KEY ++ dg))`.
pub fn auth_digest(dg: &str) -> String {
    let mut h = Sha256::new();
    h.update(AUTH_KEY.as_bytes());
    h.update(dg.as_bytes());
    STANDARD.encode(h.finalize())
}

#[derive(Debug, Deserialize)]
struct Challenge {
    dg: Option<String>,
}

/// Run both handshake steps against the `accessControl` service.
pub async fn negotiate(rpc: &RpcClient) -> Result<()> {
    let dg = request_challenge(rpc).await?;
    debug!("{ENABLE_METHODS}: dg={dg}");

    let params = vec![json!({
        "developerName": DEVELOPER_NAME,
        "developerID":   DEVELOPER_ID,
        "sg":            auth_digest(&dg),
        "methods":       EXTENDED_METHODS.join(":"),
    })];
    match rpc.call(service::ACCESS_CONTROL, ENABLE_METHODS, params).await? {
        RpcReply::Result(_) => {
            info!("extended methods enabled");
            Ok(())
        }
        RpcReply::Error(fault) => Err(CamError::Auth(format!(
            "{ENABLE_METHODS} rejected digest: {fault}"
        ))),
    }
}

async fn request_challenge(rpc: &RpcClient) -> Result<String> {
    let params = vec![json!({
        "methods":       "",
        "developerName": "",
        "developerID":   "",
        "sg":            "",
    })];
    let result = match rpc.call(service::ACCESS_CONTROL, ENABLE_METHODS, params).await? {
        RpcReply::Result(items) => items,
        RpcReply::Error(fault) => {
            return Err(CamError::Auth(format!("{ENABLE_METHODS} challenge failed: {fault}")));
        }
    };
    let (challenge,): (Challenge,) = decode_result(ENABLE_METHODS, result)
        .map_err(|e| CamError::Auth(e.to_string()))?;
    challenge
        .dg
        .filter(|dg| !dg.is_empty())
        .ok_or_else(|| CamError::Auth("challenge reply carries no dg".into()))
}
