// # ZTE F680/F860 Router Client
//
// This crate implements `f680_core::RouterClient` for the web-management UI
// of ZTE F680/F860 GPON routers.
//
// ## Modules
//
// - `client`: session handling, login and DHCP source read/write
// - `signer`: the RSA `Check` header required on POSTs
// - `session`: session token scraping from management pages
// - `form`, `xml`: request and response encodings
//
// ## Security Requirements
//
// - The router password NEVER appears in logs
// - Session tokens are redacted from `Debug` output

mod client;
mod form;
pub mod session;
pub mod signer;
mod xml;

pub use client::F860Client;
pub use session::{PatternScraper, ScrapedToken, SessionToken, SessionTokenScraper};
pub use signer::RequestSigner;
