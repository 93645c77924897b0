//! Library for issuing wallet passes.
//!
//! This crate builds RS256-signed save links and `multipart/mixed` batch bodies
//! for the wallet pass object API, and talks to the API to manage classes and objects.

/// Batch request envelopes (`multipart/mixed`)
pub mod batch;

/// Endpoints and deployment settings
pub mod config;

/// Service-account credentials and the issuer identity
pub mod credential;

/// End-to-end issuance walkthrough
#[cfg(feature = "client")]
pub mod demo;

/// Crate error type
pub mod error;

/// Compact JWT encoding and verification
pub mod jwt;

/// OAuth JWT-bearer assertions for API access tokens
pub mod oauth;

/// Class and object stores (REST API, in-memory)
#[cfg(feature = "client")]
pub mod object_store;

/// Pass types, classes, objects and references
pub mod pass;

/// Save-link claims and URLs
pub mod save_link;

/// RS256 signing
pub mod signer;

/// Sample class and object bodies per pass type
pub mod templates;

pub use batch::{build_batch_body, BatchRequest};
pub use config::WalletConfig;
pub use credential::IssuerIdentity;
pub use error::{Result, WalletError};
pub use save_link::{build_save_link, SaveLinkBuilder, SaveLinkPayload};
