//! Wire types shared by the provisioning service and the gateway.
//!
//! The provisioning API mixes key styles (`site_id` on create, `adminUrl`
//! everywhere else); the serde attributes here pin those names so both sides
//! agree without hand-written JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of `POST /create-wordpress`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSiteRequest {
    #[serde(default)]
    pub subdomain: String,
    #[serde(default)]
    pub site_name: String,
    #[serde(default)]
    pub admin_user: String,
    #[serde(default)]
    pub admin_password: String,
    #[serde(default)]
    pub admin_email: String,
}

/// Result of a successful provisioning run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSiteResponse {
    pub site_id: String,
    pub url: String,
    pub admin_url: String,
}

/// Body of `POST /add-domain`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddDomainRequest {
    #[serde(default)]
    pub site_id: String,
    #[serde(default)]
    pub domain: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddDomainResponse {
    pub id: String,
    pub url: String,
    pub admin_url: String,
    pub status: SiteState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteSiteResponse {
    pub success: bool,
    pub message: String,
}

/// Coarse health of a site as reported by status and listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteState {
    Active,
    Unknown,
}

/// One site as returned by `GET /status/:siteId` and inside `GET /list-sites`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteSummary {
    pub id: String,
    pub name: String,
    pub url: String,
    /// Absent on the fallback record produced when a site cannot be queried.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_url: Option<String>,
    pub status: SiteState,
    pub articles: u64,
}

impl SiteSummary {
    /// Minimal record for a site whose metadata could not be read.
    pub fn unknown(id: &str, hostname: &str) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            url: format!("http://{}", hostname),
            admin_url: None,
            status: SiteState::Unknown,
            articles: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteList {
    pub sites: Vec<SiteSummary>,
}

/// Provisioning steps in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisionStep {
    DirectoryCreated,
    CoreDownloaded,
    DatabaseCreated,
    ConfigWritten,
    CoreInstalled,
    OwnershipFixed,
    VhostEnabled,
}

impl ProvisionStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProvisionStep::DirectoryCreated => "directory_created",
            ProvisionStep::CoreDownloaded => "core_downloaded",
            ProvisionStep::DatabaseCreated => "database_created",
            ProvisionStep::ConfigWritten => "config_written",
            ProvisionStep::CoreInstalled => "core_installed",
            ProvisionStep::OwnershipFixed => "ownership_fixed",
            ProvisionStep::VhostEnabled => "vhost_enabled",
        }
    }
}

impl std::fmt::Display for ProvisionStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisionStatus {
    InProgress,
    Complete,
    RolledBack,
    RollbackFailed,
}

impl ProvisionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProvisionStatus::InProgress)
    }
}

/// Checkpoint written after every provisioning step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionRecord {
    pub site_id: String,
    /// Last step that completed; `None` until the directory exists.
    pub step: Option<ProvisionStep>,
    pub status: ProvisionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Error body used by every route of both services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
