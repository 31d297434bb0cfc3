//! Typed wrappers for the camera web API methods this client uses.
//!
//! Every method has a fixed result shape; replies are decoded into that shape
//! and anything else is a protocol error.

use chrono::{DateTime, Utc};
use log::info;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{CamError, Result};
use crate::rpc::{decode_result, service, RpcReply};
use crate::session::Session;

/// `getApplicationInfo` → `[name, version]`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApplicationInfo(pub String, pub String);

/// One entry of `getMethodTypes`: `[name, params, results, version]`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MethodType(pub String, pub Vec<String>, pub Vec<String>, pub String);

/// `getStillSize` → `[{"aspect", "size"}]`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StillSize {
    pub aspect: String,
    pub size:   String,
}

pub async fn get_application_info(s: &Session) -> Result<ApplicationInfo> {
    s.call_typed(service::CAMERA, "getApplicationInfo", vec![]).await
}

/// `getVersions` → `[[version, ...]]`.
pub async fn get_versions(s: &Session) -> Result<Vec<String>> {
    let (versions,): (Vec<String>,) = s.call_typed(service::CAMERA, "getVersions", vec![]).await?;
    Ok(versions)
}

/// `getAvailableApiList` → `[[method, ...]]`.
pub async fn get_available_api_list(s: &Session) -> Result<Vec<String>> {
    let (apis,): (Vec<String>,) =
        s.call_typed(service::CAMERA, "getAvailableApiList", vec![]).await?;
    Ok(apis)
}

pub async fn get_method_types(s: &Session, version: &str) -> Result<Vec<MethodType>> {
    s.call_typed(service::CAMERA, "getMethodTypes", vec![json!(version)]).await
}

pub async fn start_rec_mode(s: &Session) -> Result<()> {
    expect_done(s, service::CAMERA, "startRecMode", vec![]).await
}

pub async fn get_still_size(s: &Session) -> Result<StillSize> {
    let (size,): (StillSize,) = s.call_typed(service::CAMERA, "getStillSize", vec![]).await?;
    Ok(size)
}

pub async fn set_still_size(s: &Session, aspect: &str, size: &str) -> Result<()> {
    expect_done(s, service::CAMERA, "setStillSize", vec![json!(aspect), json!(size)]).await
}

/// `getExposureMode` → `[mode]`.
pub async fn get_exposure_mode(s: &Session) -> Result<String> {
    let (mode,): (String,) = s.call_typed(service::CAMERA, "getExposureMode", vec![]).await?;
    Ok(mode)
}

/// `getAvailableExposureMode` → `[current, [candidates]]`.
pub async fn get_available_exposure_mode(s: &Session) -> Result<(String, Vec<String>)> {
    s.call_typed(service::CAMERA, "getAvailableExposureMode", vec![]).await
}

pub async fn set_exposure_mode(s: &Session, mode: &str) -> Result<()> {
    expect_done(s, service::CAMERA, "setExposureMode", vec![json!(mode)]).await
}

/// Set the camera clock (`system/setCurrentTime`, extended).
pub async fn set_current_time(s: &Session, now: DateTime<Utc>) -> Result<()> {
    let params = vec![json!({
        "dateTime":             now.format("%Y-%m-%dT%H:%M:%S+00:00").to_string(),
        "timeZoneOffsetMinute": 0,
        "dstOffsetMinute":      0,
    })];
    expect_done(s, service::SYSTEM, "setCurrentTime", params).await
}

/// Trigger the shutter.
///
/// `actTakePicture` → `[[url, ...]]`.  Returns the first (one-shot) download
/// URL, or `None` when the camera answered without a result.
pub async fn take_picture(s: &Session) -> Result<Option<String>> {
    const METHOD: &str = "actTakePicture";
    match s.call(service::CAMERA, METHOD, vec![]).await? {
        RpcReply::Result(items) => {
            let (urls,): (Vec<String>,) = decode_result(METHOD, items)?;
            urls.into_iter()
                .next()
                .map(Some)
                .ok_or_else(|| CamError::Protocol(format!("{METHOD}: empty URL list")))
        }
        RpcReply::Error(fault) => {
            info!("{METHOD}: no picture ({fault})");
            Ok(None)
        }
    }
}

/// Setter replies are `[]` or `[0]`; any other status code is a failure.
async fn expect_done(s: &Session, service: &str, method: &str, params: Vec<Value>) -> Result<()> {
    let result = s.call(service, method, params).await?.into_result(method)?;
    match result.as_slice() {
        [] => Ok(()),
        [status] if status.as_i64() == Some(0) => Ok(()),
        other => Err(CamError::Protocol(format!(
            "{method}: unexpected status {}",
            Value::Array(other.to_vec())
        ))),
    }
}

/// Log what the camera reports about itself.  Any failure aborts the dump.
pub async fn show_info(s: &Session) -> Result<()> {
    let ApplicationInfo(name, version) = get_application_info(s).await?;
    info!("application: {name} {version}");

    let versions = get_versions(s).await?;
    info!("API versions: {}", versions.join(", "));

    let apis = get_available_api_list(s).await?;
    info!("available APIs: {}", apis.join(", "));

    for v in &versions {
        for MethodType(name, params, results, mv) in get_method_types(s, v).await? {
            info!("  {name}({}) -> ({}) v{mv}", params.join(", "), results.join(", "));
        }
    }

    if s.extended_enabled() {
        let size = get_still_size(s).await?;
        info!("still size: {} {}", size.aspect, size.size);
        let (current, candidates) = get_available_exposure_mode(s).await?;
        info!("exposure mode: {current} (available: {})", candidates.join(", "));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::endpoint::Endpoint;
    use crate::rpc::RpcClient;
    use crate::transport::mock::MockTransport;

    const CAMERA_URL: &str = "http://10.0.0.1:10000/sony/camera";

    fn session(mock: &Arc<MockTransport>) -> Session {
        let ep = Endpoint::parse("http://10.0.0.1:10000/sony").unwrap();
        Session::new(RpcClient::new(ep, mock.clone()))
    }

    #[tokio::test]
    async fn decodes_documented_shapes() {
        let mock = Arc::new(MockTransport::new());
        mock.reply(CAMERA_URL, r#"{"result":[["1.0","1.1"]],"id":1}"#)
            .reply(CAMERA_URL, r#"{"result":[{"aspect":"4:3","size":"18M"}],"id":1}"#)
            .reply(CAMERA_URL, r#"{"result":["Program Auto",["Intelligent Auto","Program Auto"]],"id":1}"#)
            .reply(
                CAMERA_URL,
                r#"{"result":[["getVersions",[],["string*"],"1.0"],["setStillSize",["string","string"],[],"1.0"]],"id":1}"#,
            );
        let s = session(&mock);

        assert_eq!(get_versions(&s).await.unwrap(), vec!["1.0", "1.1"]);
        assert_eq!(
            get_still_size(&s).await.unwrap(),
            StillSize { aspect: "4:3".into(), size: "18M".into() }
        );
        let (current, candidates) = get_available_exposure_mode(&s).await.unwrap();
        assert_eq!(current, "Program Auto");
        assert_eq!(candidates.len(), 2);
        let types = get_method_types(&s, "1.0").await.unwrap();
        assert_eq!(types[1].0, "setStillSize");
        assert_eq!(types[1].1, vec!["string", "string"]);
        assert_eq!(mock.posted()[3]["params"], json!(["1.0"]));
    }

    #[tokio::test]
    async fn setter_status() {
        let mock = Arc::new(MockTransport::new());
        mock.reply(CAMERA_URL, r#"{"result":[0],"id":1}"#)
            .reply(CAMERA_URL, r#"{"result":[1],"id":1}"#)
            .reply(CAMERA_URL, r#"{"error":[403,"Forbidden"],"id":1}"#);
        let s = session(&mock);

        set_still_size(&s, "4:3", "18M").await.unwrap();
        assert!(matches!(set_exposure_mode(&s, "Program Auto").await, Err(CamError::Protocol(_))));
        assert!(matches!(set_exposure_mode(&s, "Program Auto").await, Err(CamError::Protocol(_))));
        assert_eq!(mock.posted()[0]["params"], json!(["4:3", "18M"]));
    }

    #[tokio::test]
    async fn take_picture_shapes() {
        let mock = Arc::new(MockTransport::new());
        mock.reply(CAMERA_URL, r#"{"result":[["http://x/y.jpg"]],"id":1}"#)
            .reply(CAMERA_URL, r#"{"error":[40403,"Long shooting"],"id":1}"#)
            .reply(CAMERA_URL, r#"{"result":[[]],"id":1}"#);
        let s = session(&mock);

        assert_eq!(take_picture(&s).await.unwrap().as_deref(), Some("http://x/y.jpg"));
        assert_eq!(take_picture(&s).await.unwrap(), None);
        assert!(matches!(take_picture(&s).await, Err(CamError::Protocol(_))));
    }

    #[tokio::test]
    async fn clock_goes_to_system_service() {
        let mock = Arc::new(MockTransport::new());
        mock.reply("http://10.0.0.1:10000/sony/system", r#"{"result":[],"id":1}"#);
        let s = session(&mock);

        let now = DateTime::from_timestamp(1413213124, 0).unwrap();
        set_current_time(&s, now).await.unwrap();
        assert_eq!(
            mock.posted()[0]["params"][0]["dateTime"],
            "2014-10-13T15:12:04+00:00"
        );
    }

    #[tokio::test]
    async fn info_dump_stops_on_failure() {
        let mock = Arc::new(MockTransport::new());
        mock.reply(CAMERA_URL, r#"{"result":["Smart Remote Control","2.1.4"],"id":1}"#)
            .fail(CAMERA_URL, "timed out");
        let s = session(&mock);

        assert!(matches!(show_info(&s).await, Err(CamError::Transport(_))));
        assert_eq!(mock.posted().len(), 2);
    }
}
