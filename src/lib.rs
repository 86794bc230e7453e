//! Async Rust client library for a punchout test tool.
//!
//! Buyers test supplier punchout catalogs through a small backend service.
//! This crate holds the client side of that tool: the OCI parameter
//! synchronizer that keeps a punchout URL and its structured fields in step,
//! the cXML setup-request builder, and typed access to the backend endpoints
//! that start sessions, return carts and inspect supplier sites.
//!
//! # Modules
//!
//! - [`oci`]: OCI configuration types (reserved fields, custom parameter rows).
//! - [`sync`]: Two-way synchronization between the base URL and the fields.
//! - [`debounce`]: Cancel-and-restart delayed tasks on the tokio timer.
//! - [`session`]: A debounced editing session over the synchronizer.
//! - [`cxml`]: cXML `PunchOutSetupRequest` form, payload and paste parsing.
//! - [`roundtrip`]: Starting OCI and cXML punchout sessions.
//! - [`cart`]: Carts returned by suppliers (OCI columns, cXML order messages).
//! - [`inspect`]: Header and framing checks for supplier sites.
//! - [`render`]: Plain-text tables and JSON trees.
//! - [`client`]: HTTP wrapper for the backend REST API.
//! - [`config`]: TOML and environment configuration.
//! - [`error`]: Typed error hierarchy (`PunchoutError`).
//!
//! # Quick Start
//!
//! ```ignore
//! use punchout_tester::client::BackendClient;
//! use punchout_tester::oci::OciField;
//! use punchout_tester::roundtrip::send_oci_roundtrip;
//! use punchout_tester::session::{OciSession, SyncTiming};
//!
//! let session = OciSession::new(SyncTiming::default());
//! session.set_field(OciField::BaseUrl, "https://supplier.test/oci?username=bob");
//! session.flush();
//!
//! let client = BackendClient::new("http://localhost:3001")?;
//! let supplier_url = send_oci_roundtrip(&client, &session.snapshot()).await?;
//! ```

#![warn(missing_docs)]

pub mod cart;
pub mod client;
pub mod config;
pub mod cxml;
pub mod debounce;
pub mod error;
pub mod inspect;
pub mod oci;
pub mod render;
pub mod roundtrip;
pub mod session;
pub mod sync;
