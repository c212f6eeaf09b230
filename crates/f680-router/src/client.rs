// # ZTE F680/F860 Web-Management Client
//
// Talks to the router's web UI the way a browser does: one cookie jar per
// session, a hashed-challenge login, per-page session tokens scraped from
// HTML and an RSA `Check` header on every POST.
//
// ## Endpoints
//
// - `GET  /?_type=loginData&_tag=login_entry`: anonymous session token (JSON)
// - `GET  /?_type=loginData&_tag=login_token`: login challenge (XML)
// - `POST /?_type=loginData&_tag=login_entry`: login submit (JSON)
// - `GET  /?_type=menuView&_tag=lanMgrIpv4&Menu3Location=0`: LAN manager page (HTML)
// - `GET  /?_type=menuData&_tag=Localnet_LanDevDHCPSource_lua.lua`: DHCP sources (XML)
// - `POST /?_type=menuData&_tag=Localnet_LanDevDHCPSource_lua.lua`: DHCP source write (XML)
//
// ## Error Contract
//
// The client never retries. A non-success status, an undecodable body or a
// non-zero `IF_ERRORID` fails the whole call. `IF_ERRORSTR == SessionTimeout`
// surfaces as `Error::Unauthorized`.

use async_trait::async_trait;
use f680_core::config::RouterConfig;
use f680_core::model::{DhcpSource, DhcpSourceKind};
use f680_core::traits::RouterClient;
use f680_core::{Error, Result, StepExt};
use reqwest::cookie::Jar;
use reqwest::header::{CONTENT_TYPE, ORIGIN, REFERER};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use url::Url;

use crate::form::{FORM_CONTENT_TYPE, FormBody};
use crate::session::{PatternScraper, ScrapedToken, SessionTokenScraper};
use crate::signer::{CHECK_HEADER, RequestSigner};
use crate::xml;

const LOGIN_ENTRY_PATH: &str = "/?_type=loginData&_tag=login_entry";
const LOGIN_TOKEN_PATH: &str = "/?_type=loginData&_tag=login_token";
const LAN_MGR_PATH: &str = "/?_type=menuView&_tag=lanMgrIpv4&Menu3Location=0";
const DHCP_SOURCES_PATH: &str = "/?_type=menuData&_tag=Localnet_LanDevDHCPSource_lua.lua";

const DHCP_SOURCES_OBJECT: &str = "OBJ_LANDEVDHCPSOURCE_ID";

const PARAM_INST_ID: &str = "_InstID";
const PARAM_PROC_FLAG: &str = "ProcFlag";
const PARAM_VENDOR_CLASS_ID: &str = "VendorClassID";

/// Anonymous session issued before login
#[derive(Debug, Deserialize)]
struct LoginEntry {
    #[serde(default)]
    sess_token: String,
}

/// Login submit outcome
#[derive(Debug, Deserialize)]
struct LoginOutcome {
    /// Present (and non-null) while the account is locked
    #[serde(rename = "lockingTime", default)]
    locking_time: Option<Value>,
}

impl LoginOutcome {
    fn is_locked(&self) -> bool {
        self.locking_time.as_ref().is_some_and(|v| !v.is_null())
    }
}

/// Client for the ZTE F680/F860 web-management API
///
/// # Session
///
/// All requests share one cookie jar. [`RouterClient::reset`] replaces the
/// HTTP client, dropping every cookie, so each reconciliation cycle starts
/// from an anonymous session.
///
/// # Security
///
/// The password and session tokens are never logged. With debug logging on,
/// request lines and response bodies are logged; request bodies are not.
pub struct F860Client {
    config: RouterConfig,
    base: String,
    origin: String,
    signer: RequestSigner,
    scraper: Box<dyn SessionTokenScraper>,
    http: reqwest::Client,
    debug: bool,
    placeholder_key: bool,
}

// Custom Debug implementation that hides the password
impl std::fmt::Debug for F860Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("F860Client")
            .field("config", &self.config)
            .field("origin", &self.origin)
            .field("debug", &self.debug)
            .field("placeholder_key", &self.placeholder_key)
            .finish()
    }
}

impl F860Client {
    /// Create a client for `config`
    ///
    /// Loads the signing key from `config.encryption_key`. Without one the
    /// bundled placeholder key is used and a warning is logged: a real router
    /// rejects every write signed with it.
    pub fn new(config: RouterConfig) -> Result<Self> {
        let url = Url::parse(&config.upstream)
            .map_err(|e| Error::config(format!("invalid router upstream {}: {}", config.upstream, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::config(format!(
                "router upstream must use HTTP or HTTPS scheme. Got: {}",
                config.upstream
            )));
        }

        let placeholder_key = config.encryption_key.is_none();
        let signer = match &config.encryption_key {
            Some(path) => RequestSigner::from_file(path),
            None => {
                tracing::warn!(
                    "router.encryption_key is not set, signing with the placeholder key; \
                     the router will reject DHCP source updates"
                );
                RequestSigner::placeholder()
            }
        }
        .step("unable to load encryption key")?;

        let http = Self::build_http(&config)?;

        Ok(Self {
            base: config.upstream.trim_end_matches('/').to_string(),
            origin: url.origin().ascii_serialization(),
            config,
            signer,
            scraper: Box::new(PatternScraper),
            http,
            debug: false,
            placeholder_key,
        })
    }

    /// Replace the request signer
    pub fn with_signer(mut self, signer: RequestSigner) -> Self {
        self.signer = signer;
        self.placeholder_key = false;
        self
    }

    /// True while requests are signed with the bundled placeholder key
    pub fn uses_placeholder_key(&self) -> bool {
        self.placeholder_key
    }

    /// Replace the session token scraper
    pub fn with_scraper(mut self, scraper: Box<dyn SessionTokenScraper>) -> Self {
        self.scraper = scraper;
        self
    }

    /// Log request lines and response bodies at DEBUG
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// `scheme://host[:port]` of the router, sent as `Origin`
    pub fn origin(&self) -> &str {
        &self.origin
    }

    fn build_http(config: &RouterConfig) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .cookie_provider(Arc::new(Jar::default()))
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::transport(format!("unable to build HTTP client: {}", e)))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn get(&self, path: &str) -> Result<String> {
        let url = self.url(path);
        if self.debug {
            tracing::debug!(method = "GET", url = %url, "router request");
        }

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::transport(format!("GET {} failed: {}", path, e)))?;

        self.read_body(response).await
    }

    /// POST a signed form
    async fn post_form(&self, path: &str, form: &FormBody, ajax: bool) -> Result<String> {
        let url = self.url(path);
        let body = form.encode();
        let check = self.signer.sign(body.as_bytes())?;

        if self.debug {
            tracing::debug!(method = "POST", url = %url, "router request");
        }

        let mut request = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .header(CHECK_HEADER, check);

        if ajax {
            request = request
                .header("X-Requested-With", "XMLHttpRequest")
                .header(ORIGIN, &self.origin)
                .header(REFERER, format!("{}/", self.origin));
        }

        let response = request
            .body(body)
            .send()
            .await
            .map_err(|e| Error::transport(format!("POST {} failed: {}", path, e)))?;

        self.read_body(response).await
    }

    async fn read_body(&self, response: reqwest::Response) -> Result<String> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::transport(format!("unable to read response: {}", e)))?;

        if self.debug {
            tracing::debug!(status = status.as_u16(), body = %body, "router response");
        }

        if !status.is_success() {
            return Err(Error::status(status.as_u16(), body));
        }

        Ok(body)
    }

    async fn anonymous_session(&self) -> Result<String> {
        let body = self.get(LOGIN_ENTRY_PATH).await?;
        let entry: LoginEntry = serde_json::from_str(&body)?;
        Ok(entry.sess_token)
    }

    async fn login_challenge(&self) -> Result<String> {
        let body = self.get(LOGIN_TOKEN_PATH).await?;
        let root = xml::parse_response(&body)?;
        Ok(root.text().trim().to_string())
    }

    async fn submit_login(&self, sess_token: &str, challenge: &str) -> Result<bool> {
        let password = RequestSigner::digest(format!("{}{}", self.config.password, challenge).as_bytes());

        let mut form = FormBody::new();
        form.set("action", "login")
            .set("Username", &self.config.username)
            .set("Password", password)
            .set("_sessionTOKEN", sess_token);

        let body = self.post_form(LOGIN_ENTRY_PATH, &form, false).await?;
        let outcome: LoginOutcome = serde_json::from_str(&body)?;

        if outcome.is_locked() {
            tracing::warn!(
                username = %self.config.username,
                locking_time = ?outcome.locking_time,
                "Router refused login, account is locked"
            );
            return Ok(false);
        }

        Ok(true)
    }

    /// Fetch the LAN manager page and scrape its session token
    async fn session_token(&self) -> Result<ScrapedToken> {
        let html = self.get(LAN_MGR_PATH).await?;
        let token = self.scraper.scrape(&html)?;
        if token == ScrapedToken::Absent {
            tracing::debug!("LAN manager page carries no session token");
        }
        Ok(token)
    }

    fn parse_instance(fields: &[(&str, Option<&str>)]) -> DhcpSource {
        let mut source = DhcpSource::default();

        for (name, value) in fields {
            let Some(value) = value else {
                tracing::warn!(name = %name, "DHCP source parameter has no value");
                continue;
            };

            match *name {
                PARAM_INST_ID => source.id = value.to_string(),
                PARAM_PROC_FLAG => match DhcpSourceKind::from_router(value) {
                    Ok(kind) => source.proc_flag = kind,
                    Err(e) => {
                        tracing::warn!(value = %value, error = %e, "unable to parse ProcFlag");
                    }
                },
                PARAM_VENDOR_CLASS_ID => source.vendor_class_id = value.to_string(),
                other => tracing::debug!(name = %other, "ignoring unknown DHCP source parameter"),
            }
        }

        source
    }
}

#[async_trait]
impl RouterClient for F860Client {
    fn reset(&mut self) -> Result<()> {
        self.http = Self::build_http(&self.config)?;
        Ok(())
    }

    async fn login(&self) -> Result<bool> {
        let sess_token = self
            .anonymous_session()
            .await
            .step("unable to get new session")?;
        let challenge = self
            .login_challenge()
            .await
            .step("unable to get login token")?;

        self.submit_login(&sess_token, &challenge)
            .await
            .step("unable to authorize")
    }

    async fn list_dhcp_sources(&self) -> Result<Vec<DhcpSource>> {
        self.session_token()
            .await
            .step("unable to open LAN manager page")?;

        let body = self
            .get(DHCP_SOURCES_PATH)
            .await
            .step("unable to fetch DHCP sources")?;
        let root = xml::parse_response(&body).step("unable to decode DHCP sources")?;
        xml::check_remote_error(&root)?;

        let sources = xml::instances(&root, DHCP_SOURCES_OBJECT)
            .iter()
            .map(|fields| Self::parse_instance(fields))
            .collect::<Vec<_>>();

        tracing::debug!(count = sources.len(), "Listed DHCP sources");
        Ok(sources)
    }

    async fn update_dhcp_sources(&self, sources: &[DhcpSource]) -> Result<()> {
        if sources.is_empty() {
            return Ok(());
        }

        let token = self
            .session_token()
            .await
            .step("unable to open LAN manager page")?
            .into_token();

        let mut form = FormBody::new();
        form.set("IF_ACTION", "Apply")
            .set("_InstNum", sources.len().to_string())
            .set("_sessionTOKEN", token.as_bytes());

        for (i, source) in sources.iter().enumerate() {
            form.set(format!("{}_{}", PARAM_INST_ID, i), &source.id)
                .set(
                    format!("{}_{}", PARAM_PROC_FLAG, i),
                    source.proc_flag.to_wire().to_string(),
                );
        }

        let body = self
            .post_form(DHCP_SOURCES_PATH, &form, true)
            .await
            .step("unable to update DHCP sources")?;
        let root = xml::parse_response(&body).step("unable to decode update response")?;
        if let Err(e) = xml::check_remote_error(&root) {
            if self.placeholder_key && !e.is_unauthorized() {
                tracing::warn!(
                    error = %e,
                    "update rejected while signing with the placeholder key, set router.encryption_key"
                );
            }
            return Err(e);
        }

        tracing::debug!(count = sources.len(), "Updated DHCP sources");
        Ok(())
    }

    fn client_name(&self) -> &'static str {
        "zte-f860"
    }
}
