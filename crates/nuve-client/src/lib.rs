//! # Nuve client
//!
//! Blocking Rust client for the Nuve media-session REST API.
//!
//! Every call is authenticated with an `MAuth` header computed by
//! [`nuve_mauth`]:
//!
//! - **[`NuveClient`]**: resource methods for rooms, tokens, services and users
//! - **[`Transport`]**: the seam between signing and the wire; [`HttpTransport`]
//!   is the default blocking implementation
//! - **[`ResponseBody`]**: parsed JSON, or the raw text (or bytes) when the body
//!   is not JSON
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nuve_client::{NuveClient, ResponseBody};
//!
//! # fn example() -> nuve_client::Result<()> {
//! let nuve = NuveClient::new("svc1", "secret", "localhost", 3000);
//!
//! let token = nuve.create_token("room-id", "alice", "presenter", None)?;
//! if let ResponseBody::Text(token) = token {
//!     println!("token: {token}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │  nuve-client (this crate)                │
//! │  ┌────────────┐   ┌───────────────────┐  │
//! │  │ NuveClient │───│ nuve-mauth        │  │
//! │  │ (resources)│   │ (HMAC-SHA1 MAuth) │  │
//! │  └─────┬──────┘   └───────────────────┘  │
//! │        │                                 │
//! │  ┌─────┴──────────────┐                  │
//! │  │ Transport          │                  │
//! │  │ (blocking reqwest) │                  │
//! │  └────────────────────┘                  │
//! └──────────────────────────────────────────┘
//!          │
//!          ▼
//!     Nuve REST API
//! ```

pub mod client;
pub mod error;
pub mod transport;

pub use client::{Endpoint, NuveClient, NuveClientBuilder, ResponseBody, DEFAULT_PORT};
pub use error::Error;
pub use nuve_mauth::{Actor, Credentials};
pub use reqwest::Method;
pub use transport::{HttpRequest, HttpResponse, HttpTransport, Transport};

/// Result type alias for Nuve client operations.
pub type Result<T> = std::result::Result<T, Error>;
