//! GCP API interaction module
//!
//! This module provides the pieces the reconciliation engine uses to reach
//! the Compute Engine API: authentication, the HTTP client, and the
//! [`Transport`](transport::Transport) seam the engine is written against.
//!
//! # Module Structure
//!
//! - [`auth`] - GCP authentication and ambient default discovery
//! - [`client`] - Authenticated client implementing [`transport::Transport`]
//! - [`http`] - HTTP utilities for REST API calls
//! - [`transport`] - The trait every remote call goes through
//!
//! # Example
//!
//! ```ignore
//! use gcpsync::gcp::{client::GcpClient, transport::Transport};
//!
//! async fn example() -> gcpsync::Result<()> {
//!     let client = GcpClient::with_access_token("ya29...")?;
//!     let url = "https://compute.googleapis.com/compute/v1/projects/p/global/routes/r";
//!     let route = client.send(reqwest::Method::GET, url, None).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod http;
pub mod transport;
