//! # reconcile
//!
//! Mapping between declared Superset objects and their wire representation.
//!
//! Configuration names things; the Superset API identifies them by
//! server-assigned ids and uuids. This crate bridges the two:
//!
//! - [`resolver`]: names to ids over a listed collection, reporting misses
//! - [`permission`]: permission/view-menu pairs, duplicates and resolution
//! - [`folder`]: the two-level dataset folder tree and its uuids
//! - [`columns`] / [`metrics`]: keyed collections that keep server ids
//! - [`extra`]: certification packed into the opaque `extra` string
//!
//! Everything here is pure; no function performs I/O.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod columns;
pub mod error;
pub mod extra;
pub mod folder;
pub mod metrics;
pub mod permission;
pub mod resolver;

pub use columns::{DatasetColumn, columns_from_wire, reconcile_columns};
pub use error::{Error, Result};
pub use extra::{Certification, pack_certification, unpack_certification};
pub use folder::{
    Folder, FolderChild, from_wire_folders, resolve_columns, to_wire_folders, unresolved_children,
};
pub use metrics::{Currency, DatasetMetric, metrics_from_wire, reconcile_metrics};
pub use permission::{DuplicatePermission, PermissionRef, find_duplicates, resolve_permissions};
pub use resolver::{Entity, Resolution, permission_key, resolve};
