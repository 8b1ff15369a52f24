//! Validated site identifiers and the paths and names derived from them.

use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;

use crate::config::ProvisionerConfig;
use crate::errors::ProvisionError;

static SUBDOMAIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9-]+$").expect("static regex"));

static DOMAIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9-]+(\.[a-z0-9-]+)+$").expect("static regex"));

/// A subdomain label that names one site (`^[a-z0-9-]+$`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SiteName(String);

impl SiteName {
    pub fn parse(raw: &str) -> Result<Self, ProvisionError> {
        if SUBDOMAIN_RE.is_match(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(ProvisionError::Validation(
                "Invalid subdomain format. Use only lowercase letters, numbers, and hyphens."
                    .to_string(),
            ))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `wp_` + the subdomain with every `-` replaced by `_`.
    pub fn database_name(&self) -> String {
        format!("wp_{}", self.0.replace('-', "_"))
    }
}

impl std::fmt::Display for SiteName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A fully-qualified hostname such as `blog.example.org`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainName(String);

impl DomainName {
    pub fn parse(raw: &str) -> Result<Self, ProvisionError> {
        if DOMAIN_RE.is_match(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(ProvisionError::Validation("Invalid domain format".to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DomainName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a site lives on this host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteLayout {
    pub site: SiteName,
    pub hostname: String,
    pub database: String,
    pub site_dir: PathBuf,
}

impl SiteLayout {
    pub fn new(site: SiteName, config: &ProvisionerConfig) -> Self {
        let hostname = format!("{}.{}", site.as_str(), config.base_domain);
        let database = site.database_name();
        let site_dir = config.sites_dir.join(&hostname);
        Self {
            site,
            hostname,
            database,
            site_dir,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.hostname)
    }

    pub fn admin_url(&self) -> String {
        format!("http://{}/wp-admin/", self.hostname)
    }
}

/// Subdomain of a directory entry under the sites root, if the entry belongs
/// to `base_domain`.
pub fn subdomain_of(dir_name: &str, base_domain: &str) -> Option<String> {
    let suffix = format!(".{}", base_domain);
    let sub = dir_name.strip_suffix(&suffix)?;
    if sub.is_empty() {
        None
    } else {
        Some(sub.to_string())
    }
}
