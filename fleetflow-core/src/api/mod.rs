//! Fleet backend REST client
//!
//! The backend serves `{data: T}` envelopes over bearer-token-authenticated
//! JSON. Only the Location resource matters to the tracking flow: drivers
//! PATCH their position into it, riders resolve it from their route.
//!
//! Token storage is an external collaborator; the client consults a
//! [`TokenStore`] before every request so token refreshes are picked up
//! without rebuilding the client.

mod client;

pub use client::{ApiClient, LocationUpdater, StaticTokenStore, TokenStore};
