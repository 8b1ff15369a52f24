//! CLI command implementations.
//!
//! | Module   | Commands handled          |
//! |----------|---------------------------|
//! | `serve`  | `Provisioner`, `Gateway`  |
//! | `config` | `Config`                  |

pub mod config;
pub mod serve;

pub use config::cmd_config;
pub use serve::{cmd_gateway, cmd_provisioner};
