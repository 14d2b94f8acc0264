use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use tracing::warn;

use feira_common::{Identity, LogEntry};

use crate::app::AppState;

/// Write one [`LogEntry`] per request without holding up the response.
///
/// Must run inside `attach_identity` so the caller's identity is visible.
pub async fn record_request(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = req.method().to_string();
    let route = req.uri().path().to_string();
    let identity = req.extensions().get::<Identity>().cloned();
    let user_agent = req
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let ip_address = client_ip(&req);

    let response = next.run(req).await;

    let mut entry = LogEntry::request(
        method,
        route,
        response.status().as_u16(),
        started.elapsed().as_millis() as u64,
    )
    .with_identity(identity.as_ref());
    entry.user_agent = user_agent;
    entry.ip_address = ip_address;

    let logs = state.logs.clone();
    tokio::spawn(async move {
        if let Err(e) = logs.append(entry).await {
            warn!(error = %e, "Failed to write request log");
        }
    });

    response
}

/// First `X-Forwarded-For` hop, else the peer address.
fn client_ip(req: &Request) -> Option<String> {
    let forwarded = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    forwarded.or_else(|| {
        req.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn forwarded_header_wins_over_peer() {
        let mut req = Request::builder()
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000))));
        assert_eq!(client_ip(&req).as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn peer_address_without_forwarding() {
        let mut req = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(client_ip(&req), None);
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 168, 1, 2], 4000))));
        assert_eq!(client_ip(&req).as_deref(), Some("192.168.1.2"));
    }
}
