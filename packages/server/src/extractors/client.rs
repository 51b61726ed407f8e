use std::convert::Infallible;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{HeaderMap, request::Parts},
};
use ipnet::IpNet;

use crate::state::AppState;

/// Client address used to key anonymous access limits.
///
/// Forwarded headers are honoured only when the socket peer is one of
/// `server.trusted_proxies`; otherwise the peer address is the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIp(pub IpAddr);

fn parse_ip(raw: &str) -> Option<IpAddr> {
    let value = raw.trim().trim_matches('"');
    if let Ok(ip) = value.parse() {
        return Some(ip);
    }
    // "[v6]:port" or "v4:port"
    if let Some(rest) = value.strip_prefix('[') {
        return rest.split_once(']').and_then(|(host, _)| host.parse().ok());
    }
    value
        .rsplit_once(':')
        .filter(|(_, port)| port.chars().all(|c| c.is_ascii_digit()))
        .and_then(|(host, _)| host.parse().ok())
}

fn is_trusted(ip: IpAddr, trusted: &[IpNet]) -> bool {
    trusted.iter().any(|net| net.contains(&ip))
}

/// Resolve the client address from the peer and the forwarding headers.
///
/// The `X-Forwarded-For` chain is walked from the nearest hop outwards and
/// the first address outside the trusted networks wins.
fn resolve_client_ip(headers: &HeaderMap, peer: Option<IpAddr>, trusted: &[IpNet]) -> Option<IpAddr> {
    if trusted.is_empty() {
        return peer;
    }
    if let Some(peer) = peer
        && !is_trusted(peer, trusted)
    {
        return Some(peer);
    }

    let chain: Vec<IpAddr> = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(',').filter_map(parse_ip).collect())
        .unwrap_or_default();
    if !chain.is_empty() {
        return chain
            .iter()
            .rev()
            .find(|ip| !is_trusted(**ip, trusted))
            .or_else(|| chain.first())
            .copied();
    }

    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(parse_ip)
        .or(peer)
}

impl FromRequestParts<AppState> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());
        let ip = resolve_client_ip(&parts.headers, peer, &state.config.server.trusted_proxies)
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        Ok(ClientIp(ip))
    }
}

/// Scheme and authority used to build public file URLs.
///
/// Taken from `upload.public_base_url` when configured, otherwise from the
/// request `Host` header (`https` only when `X-Forwarded-Proto: https`).
#[derive(Debug, Clone)]
pub struct PublicBase(pub String);

impl PublicBase {
    /// Public URL of a stored file given its path relative to the upload root.
    pub fn file_url(&self, relative: &str) -> String {
        format!("{}/api/v1/files/{}", self.0.trim_end_matches('/'), relative)
    }
}

fn base_from_headers(headers: &HeaderMap) -> String {
    let host = headers
        .get("host")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    let scheme = match headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
    {
        Some(proto) if proto.eq_ignore_ascii_case("https") => "https",
        _ => "http",
    };
    format!("{scheme}://{host}")
}

impl FromRequestParts<AppState> for PublicBase {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let base = match &state.config.upload.public_base_url {
            Some(url) if !url.trim().is_empty() => url.trim().to_string(),
            _ => base_from_headers(&parts.headers),
        };
        Ok(PublicBase(base))
    }
}
