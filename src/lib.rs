//! Acmegate: a dual-listener HTTP front end.
//!
//! The plaintext listener proves domain control to an automated certificate
//! authority by answering the ACME HTTP-01 well-known path from a shared
//! challenge store, and 302-redirects all other cleartext traffic to HTTPS.
//! The encrypted listener terminates TLS with a pre-provisioned wildcard
//! certificate pair and serves the same routing table.
//!
//! Certificate issuance itself is out of scope: an external ACME client
//! drives the store through [`EdgeServer::register_token`] and
//! [`EdgeServer::clear_tokens`], and hands the obtained certificate pair to
//! [`EdgeServer::start_encrypted`].

pub mod challenge;
pub mod config;
pub mod http;
pub mod middleware;

pub use challenge::ChallengeStore;
pub use http::{EdgeServer, ServerError};
