//! Camera discovery over SSDP.
//!
//! An M-SEARCH for the ScalarWebAPI service type is multicast on the chosen
//! interface.  The first reply carrying a `LOCATION` header points at the
//! UPnP device description; its `av:X_ScalarWebAPI_ActionList_URL` element is
//! the RPC endpoint.

use std::io;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::Duration;

use log::{debug, info};
use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;

use crate::endpoint::{CameraSource, Endpoint};
use crate::error::{CamError, Result};
use crate::transport::Transport;

pub const SSDP_ADDR: Ipv4Addr = Ipv4Addr::new(239, 255, 255, 250);
pub const SSDP_PORT: u16 = 1900;

pub const SERVICE_TYPE: &str = "urn:schemas-sony-com:service:ScalarWebAPI:1";

const AV_NAMESPACE: &str = "urn:schemas-sony-com:av";
const ACTION_LIST_TAG: &str = "X_ScalarWebAPI_ActionList_URL";

/// Sends one M-SEARCH and waits for the first usable answer.
#[derive(Debug, Clone)]
pub struct SsdpSearcher {
    /// Local address to send from; also used as the multicast interface.
    pub interface: Option<Ipv4Addr>,
    pub target:    SocketAddrV4,
    pub timeout:   Duration,
}

impl SsdpSearcher {
    pub fn new(interface: Option<Ipv4Addr>, timeout: Duration) -> Self {
        SsdpSearcher {
            interface,
            target: SocketAddrV4::new(SSDP_ADDR, SSDP_PORT),
            timeout,
        }
    }

    /// Search for `st`; returns the `LOCATION` of the first reply, or `None`
    /// when nothing answered before the timeout.
    pub async fn search(&self, st: &str) -> Result<Option<String>> {
        self.search_inner(st)
            .await
            .map_err(|e| CamError::Discovery(format!("SSDP search failed: {e}")))
    }

    async fn search_inner(&self, st: &str) -> io::Result<Option<String>> {
        let socket = self.bind()?;
        let request = m_search_request(st);
        socket.send_to(request.as_bytes(), self.target).await?;
        debug!("M-SEARCH {st} → {}", self.target);

        let deadline = tokio::time::Instant::now() + self.timeout;
        let mut buf = [0u8; 2048];
        loop {
            let (n, from) = match tokio::time::timeout_at(deadline, socket.recv_from(&mut buf)).await {
                Ok(r) => r?,
                Err(_) => return Ok(None),
            };
            let reply = String::from_utf8_lossy(&buf[..n]);
            match parse_location(&reply) {
                Some(location) => {
                    debug!("SSDP reply from {from}: LOCATION {location}");
                    return Ok(Some(location));
                }
                None => debug!("SSDP reply from {from} has no LOCATION; ignoring"),
            }
        }
    }

    fn bind(&self) -> io::Result<UdpSocket> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        if let Some(ip) = self.interface {
            if self.target.ip().is_multicast() {
                socket.set_multicast_if_v4(&ip)?;
            }
        }
        socket.set_multicast_ttl_v4(2)?;
        socket.set_nonblocking(true)?;
        let local = SocketAddrV4::new(self.interface.unwrap_or(Ipv4Addr::UNSPECIFIED), 0);
        socket.bind(&local.into())?;
        UdpSocket::from_std(socket.into())
    }
}

pub fn m_search_request(st: &str) -> String {
    format!(
        "M-SEARCH * HTTP/1.1\r\n\
         HOST: {SSDP_ADDR}:{SSDP_PORT}\r\n\
         MAN: \"ssdp:discover\"\r\n\
         MX: 1\r\n\
         ST: {st}\r\n\
         \r\n"
    )
}

/// Value of the `LOCATION` header of an SSDP reply (header names are
/// case-insensitive).
pub fn parse_location(reply: &str) -> Option<String> {
    reply
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("location"))
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Text of the first `{urn:schemas-sony-com:av}X_ScalarWebAPI_ActionList_URL`
/// element in a device description document.
pub fn parse_action_list_url(xml: &str) -> Result<String> {
    let mut reader = NsReader::from_str(xml);
    let mut inside = false;
    loop {
        match reader.read_resolved_event() {
            Ok((ResolveResult::Bound(Namespace(ns)), Event::Start(e)))
                if ns == AV_NAMESPACE.as_bytes()
                    && e.local_name().as_ref() == ACTION_LIST_TAG.as_bytes() =>
            {
                inside = true;
            }
            Ok((_, Event::Text(t))) if inside => {
                let text = t
                    .unescape()
                    .map_err(|e| CamError::Discovery(format!("bad {ACTION_LIST_TAG} text: {e}")))?;
                let text = text.trim();
                if !text.is_empty() {
                    return Ok(text.to_string());
                }
            }
            Ok((_, Event::End(_))) => inside = false,
            Ok((_, Event::Eof)) => break,
            Err(e) => {
                return Err(CamError::Discovery(format!("malformed device description: {e}")));
            }
            _ => {}
        }
    }
    Err(CamError::Discovery(format!(
        "device description has no {ACTION_LIST_TAG} element"
    )))
}

/// Turn the configured camera source into an endpoint.
pub async fn resolve(
    source:    &CameraSource,
    searcher:  &SsdpSearcher,
    transport: &dyn Transport,
) -> Result<Endpoint> {
    let location = match source {
        CameraSource::Url(endpoint) => return Ok(endpoint.clone()),
        CameraSource::Ssdp => searcher.search(SERVICE_TYPE).await?.ok_or_else(|| {
            CamError::Discovery(format!(
                "no SSDP reply for {SERVICE_TYPE} within {}s",
                searcher.timeout.as_secs()
            ))
        })?,
    };

    info!("camera description at {location}");
    let doc = transport
        .get(&location)
        .await
        .map_err(|e| CamError::Discovery(format!("cannot fetch {location}: {e}")))?;
    let url = parse_action_list_url(&String::from_utf8_lossy(&doc))?;
    Endpoint::parse(&url).map_err(|e| CamError::Discovery(format!("bad action list URL: {e}")))
}
