//! In-process fake of the router's web-management endpoints
//!
//! Serves the login, LAN manager and DHCP source endpoints from a shared
//! table, hands out a fresh `SID` cookie per anonymous session and records
//! every request for inspection.

#![allow(dead_code)]

use axum::Router;
use axum::body::{Body, Bytes};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, Method, StatusCode, header};
use axum::response::Response;
use axum::routing::any;
use f680_core::config::RouterConfig;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

pub const TEST_PUBLIC_KEY: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/test_public.pem");
pub const TEST_PRIVATE_PEM: &str = include_str!("../fixtures/test_private.pem");

pub const CHALLENGE: &str = "7342019";
pub const SESSION_TMP_TOKEN: &str = r"\x33\x39\x31\x32";

/// One request as seen by the fake
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub tag: String,
    pub headers: HeaderMap,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Mutable behaviour and state of the fake router
#[derive(Debug)]
pub struct FakeState {
    /// (`_InstID`, `ProcFlag` text, `VendorClassID`)
    pub sources: Vec<(String, String, String)>,
    /// `lockingTime` returned on login submit
    pub locking_time: Option<u32>,
    /// `(IF_ERRORID, IF_ERRORSTR)` returned on writes
    pub update_error: Option<(String, String)>,
    /// `(IF_ERRORID, IF_ERRORSTR)` returned on reads
    pub list_error: Option<(String, String)>,
    /// Whether the LAN manager page embeds a session token
    pub embed_token: bool,
    /// Status returned by the DHCP source listing
    pub list_status: StatusCode,
    pub next_session: u32,
    pub requests: Vec<RecordedRequest>,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            locking_time: None,
            update_error: None,
            list_error: None,
            embed_token: true,
            list_status: StatusCode::OK,
            next_session: 1,
            requests: Vec::new(),
        }
    }
}

pub struct FakeRouter {
    pub addr: SocketAddr,
    pub state: Arc<Mutex<FakeState>>,
}

impl FakeRouter {
    pub async fn start(sources: &[(&str, &str, &str)]) -> Self {
        let state = Arc::new(Mutex::new(FakeState {
            sources: sources
                .iter()
                .map(|(id, flag, vcid)| (id.to_string(), flag.to_string(), vcid.to_string()))
                .collect(),
            ..FakeState::default()
        }));

        let app = Router::new()
            .route("/", any(handle))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn upstream(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Router config pointing at the fake, signing with the test key
    pub fn config(&self) -> RouterConfig {
        let mut config = RouterConfig::new(self.upstream(), "mgts", "secret");
        config.timeout_secs = 5;
        config.encryption_key = Some(TEST_PUBLIC_KEY.into());
        config
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.with(|s| s.requests.clone())
    }

    pub fn posts(&self) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == Method::POST)
            .collect()
    }

    pub fn flags(&self) -> Vec<String> {
        self.with(|s| s.sources.iter().map(|(_, flag, _)| flag.clone()).collect())
    }
}

fn reply(status: StatusCode, content_type: &str, body: String) -> Response {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap()
}

fn xml_error(code: &str, message: &str) -> String {
    format!(
        "<ajax_response_xml_root><IF_ERRORSTR>{}</IF_ERRORSTR><IF_ERRORID>{}</IF_ERRORID></ajax_response_xml_root>",
        message, code
    )
}

fn parse_form(body: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(body.as_bytes())
        .into_owned()
        .collect()
}

async fn handle(
    State(state): State<Arc<Mutex<FakeState>>>,
    method: Method,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let mut state = state.lock().unwrap();
    let tag = query.get("_tag").cloned().unwrap_or_default();
    let body = String::from_utf8_lossy(&body).into_owned();

    state.requests.push(RecordedRequest {
        method: method.clone(),
        tag: tag.clone(),
        headers: headers.clone(),
        body: body.clone(),
    });

    match (method, tag.as_str()) {
        (Method::GET, "login_entry") => {
            let sid = state.next_session;
            state.next_session += 1;
            let mut response = reply(
                StatusCode::OK,
                "application/json",
                format!(r#"{{"sess_token":"anon{}"}}"#, sid),
            );
            response.headers_mut().insert(
                header::SET_COOKIE,
                format!("SID={}; Path=/", sid).parse().unwrap(),
            );
            response
        }
        (Method::GET, "login_token") => reply(
            StatusCode::OK,
            "text/xml",
            format!("<ajax_response_xml_root>{}</ajax_response_xml_root>", CHALLENGE),
        ),
        (Method::POST, "login_entry") => {
            let body = match state.locking_time {
                Some(t) => format!(r#"{{"lockingTime":{},"sess_token":"x"}}"#, t),
                None => r#"{"sess_token":"x"}"#.to_string(),
            };
            reply(StatusCode::OK, "application/json", body)
        }
        (Method::GET, "lanMgrIpv4") => {
            let html = if state.embed_token {
                format!(
                    "<html><script>var _sessionTmpToken = \"{}\";</script></html>",
                    SESSION_TMP_TOKEN
                )
            } else {
                "<html><body>no token</body></html>".to_string()
            };
            reply(StatusCode::OK, "text/html", html)
        }
        (Method::GET, "Localnet_LanDevDHCPSource_lua.lua") => {
            if !state.list_status.is_success() {
                return reply(state.list_status, "text/plain", "boom".to_string());
            }
            if let Some((code, message)) = &state.list_error {
                return reply(StatusCode::OK, "text/xml", xml_error(code, message));
            }

            let instances: String = state
                .sources
                .iter()
                .map(|(id, flag, vcid)| {
                    format!(
                        "<Instance><ParaName>_InstID</ParaName><ParaValue>{}</ParaValue>\
                         <ParaName>ProcFlag</ParaName><ParaValue>{}</ParaValue>\
                         <ParaName>VendorClassID</ParaName><ParaValue>{}</ParaValue></Instance>",
                        id, flag, vcid
                    )
                })
                .collect();
            reply(
                StatusCode::OK,
                "text/xml",
                format!(
                    "<ajax_response_xml_root><IF_ERRORSTR>SUCC</IF_ERRORSTR><IF_ERRORID>0</IF_ERRORID>\
                     <OBJ_LANDEVDHCPSOURCE_ID>{}</OBJ_LANDEVDHCPSOURCE_ID></ajax_response_xml_root>",
                    instances
                ),
            )
        }
        (Method::POST, "Localnet_LanDevDHCPSource_lua.lua") => {
            if let Some((code, message)) = &state.update_error {
                return reply(StatusCode::OK, "text/xml", xml_error(code, message));
            }

            let form = parse_form(&body);
            let count: usize = form
                .get("_InstNum")
                .and_then(|n| n.parse().ok())
                .unwrap_or(0);
            for i in 0..count {
                let id = &form[&format!("_InstID_{}", i)];
                let flag = &form[&format!("ProcFlag_{}", i)];
                if let Some(entry) = state.sources.iter_mut().find(|(sid, _, _)| sid == id) {
                    entry.1 = flag.clone();
                }
            }
            reply(StatusCode::OK, "text/xml", xml_error("0", "SUCC"))
        }
        _ => reply(StatusCode::NOT_FOUND, "text/plain", String::new()),
    }
}
