//! CRM sync
//!
//! Optimistic client-side entity store for a sales CRM, mirrored to a remote backend.
//! The bundled backend is SQLite.

pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod remote;
pub mod store;

pub use auth::{Identity, LocalSession, Session};
pub use config::Config;
pub use errors::AppError;
pub use remote::RemoteStore;
pub use store::{
    LoadReport, Notice, NoticeLevel, PendingSync, Snapshot, Store, SyncOutcome, SyncReport,
};
