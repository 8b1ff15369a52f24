//! Typed error hierarchy for wpfleet.
//!
//! Three enums cover the three layers:
//! - `ExecError`: a spawned program could not start or exited non-zero
//! - `ProvisionError`: site lifecycle workflow failures
//! - `GatewayError`: gateway upstream, LLM and settings failures

use std::path::PathBuf;

use thiserror::Error;

/// Errors from running an external program.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command failed: {command} (exit status {}): {stderr}", status_label(.status))]
    Failed {
        command: String,
        status: Option<i32>,
        stderr: String,
    },
}

fn status_label(status: &Option<i32>) -> String {
    match status {
        Some(code) => code.to_string(),
        None => "signal".to_string(),
    }
}

/// Errors from the site lifecycle workflows.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("{0}")]
    Validation(String),

    #[error("WordPress site not found")]
    NotFound { site_id: String },

    #[error("WordPress site {site_id} already exists")]
    Conflict { site_id: String },

    #[error("Domain {domain} is already served by another site")]
    DomainTaken { domain: String },

    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error("{action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Provisioning record error: {0}")]
    Checkpoint(String),
}

impl ProvisionError {
    pub fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ProvisionError::Io {
            action,
            path: path.into(),
            source,
        }
    }
}

/// Errors from the gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("WordPress server configuration is missing. Please add your server details in the Settings page.")]
    MissingServerConfig,

    #[error("LLM API key is missing. Please add it in the Settings page.")]
    MissingLlmKey,

    #[error("Invalid WordPress server URL: {0}")]
    InvalidUrl(String),

    #[error("Upstream returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("LLM response was empty")]
    EmptyCompletion,

    #[error("Failed to persist settings at {path}: {source}")]
    SettingsWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read settings at {path}: {message}")]
    SettingsRead { path: PathBuf, message: String },
}

impl GatewayError {
    /// HTTP status the upstream answered with, if the failure came from it.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            GatewayError::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exec_failed_message_carries_stderr_and_status() {
        let err = ExecError::Failed {
            command: "wp core download".into(),
            status: Some(1),
            stderr: "Error: WordPress files seem to already be present".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("wp core download"));
        assert!(msg.contains("exit status 1"));
        assert!(msg.contains("already be present"));
    }

    #[test]
    fn exec_failed_without_status_reports_signal() {
        let err = ExecError::Failed {
            command: "mysql".into(),
            status: None,
            stderr: String::new(),
        };
        assert!(err.to_string().contains("signal"));
    }

    #[test]
    fn provision_error_converts_from_exec_error() {
        let err: ProvisionError = ExecError::Spawn {
            program: "wp".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        }
        .into();
        assert!(matches!(err, ProvisionError::Exec(ExecError::Spawn { .. })));
        assert!(err.to_string().contains("Failed to spawn wp"));
    }

    #[test]
    fn not_found_message_is_stable() {
        let err = ProvisionError::NotFound {
            site_id: "demo".into(),
        };
        assert_eq!(err.to_string(), "WordPress site not found");
    }

    #[test]
    fn io_error_names_action_and_path() {
        let err = ProvisionError::io(
            "create directory",
            "/var/www/html/demo.example.com",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = err.to_string();
        assert!(msg.starts_with("create directory /var/www/html/demo.example.com"));
    }

    #[test]
    fn gateway_upstream_status_is_exposed() {
        let err = GatewayError::Upstream {
            status: 404,
            message: "WordPress site not found".into(),
        };
        assert_eq!(err.upstream_status(), Some(404));
        assert_eq!(GatewayError::MissingServerConfig.upstream_status(), None);
    }

    #[test]
    fn all_error_types_implement_std_error_trait() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&ProvisionError::Validation("x".into()));
        assert_std_error(&GatewayError::EmptyCompletion);
        assert_std_error(&ExecError::Failed {
            command: "x".into(),
            status: Some(2),
            stderr: String::new(),
        });
    }
}
