//! Redash query engine.
//!
//! Turns Redash's asynchronous, page-capped query API into synchronous calls and
//! forward-only typed row cursors.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐
//! │ QuerySession │ execute_and_wait / open_paginated / cancel
//! └──────┬───────┘
//!        │
//! ┌──────┴──────────┐    ┌──────────────────┐
//! │ KeysetPaginator │───▶│ RemoteJobClient  │◀──▶ QueryResultCache
//! └──────┬──────────┘    └────────┬─────────┘
//!        │                        │
//! ┌──────┴─────────────┐   ┌──────┴───────┐
//! │ ResultMaterializer │   │ ControlPlane │ (HTTP, or a fake in tests)
//! └────────────────────┘   └──────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use redash_common::config::AppConfig;
//! use redash_core::{QuerySession, RowCursor};
//!
//! # async fn run() -> redash_error::Result<()> {
//! let config = AppConfig::from_file("redash.toml").expect("config");
//! let session = QuerySession::connect(&config).await?;
//! let mut rows = session
//!     .open_paginated("SELECT id, name FROM users", Some("id"), session.dialect())
//!     .await?;
//! while rows.advance().await? {
//!     let id = rows.current().get_long("id")?;
//!     let name = rows.current().get_string("name")?;
//!     println!("{id} {name:?}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod cursor;
pub mod identity;
pub mod job;
pub mod listing;
pub mod materializer;
pub mod paginator;
pub mod remote;
pub mod session;
pub mod types;

pub use cache::{Clock, ManualClock, QueryResultCache, SystemClock};
pub use cursor::RowCursor;
pub use job::{CancelHandle, Outcome, PollSchedule, RemoteJobClient};
pub use listing::{QueryScope, QuerySummary};
pub use materializer::{ColumnRef, ResultMaterializer};
pub use paginator::{KeysetPaginator, PaginatorOptions};
pub use session::{QuerySession, SessionOptions};
pub use types::{Backend, ColumnType, Value};
