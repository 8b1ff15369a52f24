//! WordPress provisioning service.
//!
//! Runs on the host that serves the sites. It turns HTTP requests into
//! filesystem changes, wp-cli and mysql invocations, and nginx reloads.
//!
//! ## Module Map
//!
//! ```text
//! ┌──────────┐  HTTP   ┌───────────────────────────────────────────────┐
//! │ Gateway  │ ──────> │  server.rs  (TraceLayer, graceful shutdown)   │
//! │  / curl  │ <────── │    └─ api.rs  (routes, bearer auth, ApiError) │
//! └──────────┘         │         │                                     │
//!                      │         v                                     │
//!                      │  workflow.rs  (Provisioner)                   │
//!                      │    ├─ locks.rs       per-site mutex           │
//!                      │    ├─ checkpoint.rs  step records + rollback  │
//!                      │    ├─ vhost.rs       nginx config files       │
//!                      │    └─ exec.rs        CommandRunner trait      │
//!                      └───────────────────────────────────────────────┘
//! ```
//!
//! `naming` holds the validated `SiteName` / `DomainName` types and the
//! derived `SiteLayout` (hostname, database name, directory).

pub mod api;
pub mod checkpoint;
pub mod exec;
pub mod locks;
pub mod naming;
pub mod server;
pub mod vhost;
pub mod workflow;
