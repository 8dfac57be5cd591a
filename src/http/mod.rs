//! Listener lifecycle and request routing.
//!
//! The plaintext listener answers ACME HTTP-01 challenges and upgrades every
//! other request to HTTPS with a 302; the encrypted listener terminates TLS
//! with a fixed wildcard certificate pair and serves the same routing table.
//!
//! The listeners are independent: the plaintext one runs for the life of the
//! process so challenges can be answered before any certificate exists, and
//! the encrypted one comes up on demand once a certificate pair is supplied.

mod routes;
mod server;
mod shutdown;

pub use routes::build_router;
pub use server::{EdgeServer, ServerError};
pub use shutdown::shutdown_signal;
