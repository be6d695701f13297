//! # superset-client
//!
//! Blocking client for the Apache Superset REST API.
//!
//! This crate provides:
//! - The [`Api`] trait: typed operations on users, roles, groups,
//!   permissions, databases, datasets and tags
//! - [`HttpApi`], which logs in with a username and password and talks to a
//!   live server
//! - [`MockApi`], an in-memory server for tests
//! - Paginated listing with a configurable page size
//!
//! ## Example
//!
//! ```no_run
//! use superset_client::{Api, HttpApi};
//!
//! let api = HttpApi::login("http://localhost:8088", "admin", "admin", 0)
//!     .expect("login failed");
//!
//! for role in api.list_roles().expect("listing failed") {
//!     println!("{} {}", role.id, role.name);
//! }
//! ```
//!
//! ## Errors
//!
//! Every operation returns [`Result`]. A missing object is reported as
//! [`Error::NotFound`]; use [`Error::is_not_found`] to tell it apart from
//! a failed call.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod error;
pub mod http;
pub mod mock;
pub mod rison;
pub mod types;

pub use api::{Api, DEFAULT_PAGE_SIZE, PageEnd, collect_pages};
pub use error::{Error, ErrorCategory, Result};
pub use http::HttpApi;
pub use mock::MockApi;
pub use types::*;
