//! Site lifecycle workflows: create, add domain, delete, status, list.
//!
//! Every mutating workflow holds the site's lock from [`SiteLocks`] for its
//! whole run. Provisioning records a checkpoint after each step and, when a
//! step fails, tears down whatever the run had already built.

use futures::future::join_all;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use wpfleet_common::{
    AddDomainRequest, AddDomainResponse, CreateSiteRequest, CreateSiteResponse,
    DeleteSiteResponse, ProvisionRecord, ProvisionStatus, ProvisionStep, SiteList, SiteState,
    SiteSummary,
};

use crate::config::ProvisionerConfig;
use crate::errors::ProvisionError;
use crate::provision::checkpoint::CheckpointStore;
use crate::provision::exec::{CommandRunner, CommandSpec};
use crate::provision::locks::SiteLocks;
use crate::provision::naming::{DomainName, SiteLayout, SiteName, subdomain_of};
use crate::provision::vhost;

/// Validated input for [`Provisioner::create_site`].
#[derive(Debug, Clone)]
pub struct NewSite {
    pub site: SiteName,
    pub title: String,
    pub admin_user: String,
    pub admin_password: String,
    pub admin_email: String,
}

impl NewSite {
    pub fn validate(req: &CreateSiteRequest) -> Result<Self, ProvisionError> {
        let required = [
            &req.subdomain,
            &req.site_name,
            &req.admin_user,
            &req.admin_password,
            &req.admin_email,
        ];
        if required.iter().any(|v| v.trim().is_empty()) {
            return Err(ProvisionError::Validation(
                "Missing required parameters".to_string(),
            ));
        }
        Ok(Self {
            site: SiteName::parse(&req.subdomain)?,
            title: req.site_name.clone(),
            admin_user: req.admin_user.clone(),
            admin_password: req.admin_password.clone(),
            admin_email: req.admin_email.clone(),
        })
    }
}

/// Runs site lifecycle operations against one host.
pub struct Provisioner {
    config: Arc<ProvisionerConfig>,
    runner: Arc<dyn CommandRunner>,
    checkpoints: CheckpointStore,
    locks: SiteLocks,
}

impl Provisioner {
    pub fn new(config: ProvisionerConfig, runner: Arc<dyn CommandRunner>) -> Self {
        let checkpoints = CheckpointStore::new(config.state_dir.clone());
        Self {
            config: Arc::new(config),
            runner,
            checkpoints,
            locks: SiteLocks::new(),
        }
    }

    pub fn config(&self) -> &ProvisionerConfig {
        &self.config
    }

    pub fn layout(&self, site: SiteName) -> SiteLayout {
        SiteLayout::new(site, &self.config)
    }

    // ── Command builders ──────────────────────────────────────────────

    fn wp<I, S>(&self, layout: &SiteLayout, args: I) -> CommandSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandSpec::new(&self.config.wp_cmd)
            .args(args)
            .arg("--allow-root")
            .current_dir(&layout.site_dir)
    }

    fn mysql(&self, sql: String) -> CommandSpec {
        let spec = CommandSpec::new(&self.config.mysql_cmd)
            .arg(format!("-u{}", self.config.db_user))
            .args(["-h", self.config.db_host.as_str(), "-e"])
            .arg(sql);
        if self.config.db_password.is_empty() {
            spec
        } else {
            spec.env("MYSQL_PWD", &self.config.db_password)
        }
    }

    async fn reload_proxy(&self) -> Result<(), ProvisionError> {
        let spec = CommandSpec::from_argv(&self.config.reload_cmd).ok_or_else(|| {
            ProvisionError::Validation("Proxy reload command is empty".to_string())
        })?;
        self.runner.run(&spec).await?;
        tracing::info!(command = %spec.display(), "proxy reloaded");
        Ok(())
    }

    // ── Create ────────────────────────────────────────────────────────

    pub async fn create_site(
        &self,
        req: &CreateSiteRequest,
    ) -> Result<CreateSiteResponse, ProvisionError> {
        let input = NewSite::validate(req)?;
        let layout = self.layout(input.site.clone());
        let _guard = self.locks.acquire(&layout.site).await;

        if site_exists(&layout.site_dir).await? {
            return Err(ProvisionError::Conflict {
                site_id: layout.site.to_string(),
            });
        }

        if let Ok(Some(previous)) = self.checkpoints.load(&layout.site).await
            && !previous.status.is_terminal()
        {
            tracing::warn!(site = %layout.site, step = ?previous.step, "previous provisioning run was interrupted");
        }

        tracing::info!(site = %layout.site, dir = %layout.site_dir.display(), "provisioning site");
        let mut record = self.checkpoints.begin(&layout.site).await?;

        match self.run_create_steps(&input, &layout, &mut record).await {
            Ok(()) => {
                self.checkpoints
                    .finish(&mut record, ProvisionStatus::Complete, None)
                    .await?;
                tracing::info!(site = %layout.site, url = %layout.url(), "site provisioned");
                Ok(CreateSiteResponse {
                    site_id: layout.site.to_string(),
                    url: layout.url(),
                    admin_url: layout.admin_url(),
                })
            }
            Err(err) => {
                tracing::error!(site = %layout.site, step = ?record.step, error = %err, "provisioning failed, rolling back");
                let problems = self.compensate(&layout, record.step).await;
                let (status, message) = if problems.is_empty() {
                    (ProvisionStatus::RolledBack, err.to_string())
                } else {
                    (
                        ProvisionStatus::RollbackFailed,
                        format!("{}; rollback: {}", err, problems.join("; ")),
                    )
                };
                if let Err(e) = self
                    .checkpoints
                    .finish(&mut record, status, Some(message))
                    .await
                {
                    tracing::warn!(site = %layout.site, error = %e, "failed to record rollback");
                }
                Err(err)
            }
        }
    }

    async fn run_create_steps(
        &self,
        input: &NewSite,
        layout: &SiteLayout,
        record: &mut ProvisionRecord,
    ) -> Result<(), ProvisionError> {
        let cfg = &self.config;

        tokio::fs::create_dir_all(&layout.site_dir)
            .await
            .map_err(|e| ProvisionError::io("create directory", &layout.site_dir, e))?;
        self.checkpoints
            .advance(record, ProvisionStep::DirectoryCreated)
            .await?;

        self.runner
            .run(&self.wp(layout, ["core", "download"]))
            .await?;
        self.checkpoints
            .advance(record, ProvisionStep::CoreDownloaded)
            .await?;

        self.runner
            .run(&self.mysql(format!(
                "CREATE DATABASE IF NOT EXISTS `{}`;",
                layout.database
            )))
            .await?;
        self.checkpoints
            .advance(record, ProvisionStep::DatabaseCreated)
            .await?;

        self.runner
            .run(&self.wp(
                layout,
                [
                    "config".to_string(),
                    "create".to_string(),
                    format!("--dbname={}", layout.database),
                    format!("--dbuser={}", cfg.db_user),
                    format!("--dbpass={}", cfg.db_password),
                    format!("--dbhost={}", cfg.db_host),
                ],
            ))
            .await?;
        self.checkpoints
            .advance(record, ProvisionStep::ConfigWritten)
            .await?;

        self.runner
            .run(&self.wp(
                layout,
                [
                    "core".to_string(),
                    "install".to_string(),
                    format!("--url={}", layout.url()),
                    format!("--title={}", input.title),
                    format!("--admin_user={}", input.admin_user),
                    format!("--admin_password={}", input.admin_password),
                    format!("--admin_email={}", input.admin_email),
                ],
            ))
            .await?;
        self.checkpoints
            .advance(record, ProvisionStep::CoreInstalled)
            .await?;

        let owner = format!("{}:{}", cfg.web_user, cfg.web_group);
        self.runner
            .run(
                &CommandSpec::new("chown")
                    .args(["-R", owner.as_str()])
                    .arg(layout.site_dir.to_string_lossy()),
            )
            .await?;
        self.checkpoints
            .advance(record, ProvisionStep::OwnershipFixed)
            .await?;

        vhost::enable(cfg, &layout.hostname, &layout.site_dir).await?;
        self.reload_proxy().await?;
        self.checkpoints
            .advance(record, ProvisionStep::VhostEnabled)
            .await?;

        Ok(())
    }

    /// Undo the completed steps of a failed run, newest first. Returns one
    /// message per compensation that itself failed.
    async fn compensate(&self, layout: &SiteLayout, reached: Option<ProvisionStep>) -> Vec<String> {
        let mut problems = Vec::new();
        let Some(reached) = reached else {
            return problems;
        };

        // The vhost step may have written the file before failing.
        if reached >= ProvisionStep::OwnershipFixed {
            if let Err(e) = vhost::disable(&self.config, &layout.hostname).await {
                problems.push(e.to_string());
            } else if let Err(e) = self.reload_proxy().await {
                problems.push(e.to_string());
            }
        }

        if reached >= ProvisionStep::DatabaseCreated {
            let drop = self.mysql(format!("DROP DATABASE IF EXISTS `{}`;", layout.database));
            if let Err(e) = self.runner.run(&drop).await {
                problems.push(e.to_string());
            }
        }

        if let Err(e) = remove_site_dir(&layout.site_dir).await {
            problems.push(e.to_string());
        }

        if problems.is_empty() {
            tracing::info!(site = %layout.site, "rollback complete");
        } else {
            tracing::error!(site = %layout.site, ?problems, "rollback incomplete, manual cleanup needed");
        }
        problems
    }

    // ── Add domain ────────────────────────────────────────────────────

    /// Serve the site under an extra hostname and make that hostname canonical.
    pub async fn add_domain(
        &self,
        req: &AddDomainRequest,
    ) -> Result<AddDomainResponse, ProvisionError> {
        if req.site_id.trim().is_empty() || req.domain.trim().is_empty() {
            return Err(ProvisionError::Validation(
                "Missing required parameters".to_string(),
            ));
        }
        let domain = DomainName::parse(&req.domain)?;
        let layout = self.layout(SiteName::parse(&req.site_id)?);
        let _guard = self.locks.acquire(&layout.site).await;
        self.ensure_exists(&layout).await?;
        self.ensure_domain_free(&layout, &domain).await?;

        vhost::enable(&self.config, domain.as_str(), &layout.site_dir).await?;

        let url = format!("http://{}", domain);
        for option in ["siteurl", "home"] {
            self.runner
                .run(&self.wp(&layout, ["option", "update", option, url.as_str()]))
                .await?;
        }
        self.reload_proxy().await?;

        tracing::info!(site = %layout.site, %domain, "domain added");
        Ok(AddDomainResponse {
            id: layout.site.to_string(),
            url: url.clone(),
            admin_url: format!("{}/wp-admin/", url),
            status: SiteState::Active,
        })
    }

    // ── Delete ────────────────────────────────────────────────────────

    pub async fn delete_site(&self, site_id: &str) -> Result<DeleteSiteResponse, ProvisionError> {
        if site_id.trim().is_empty() {
            return Err(ProvisionError::Validation("Missing site ID".to_string()));
        }
        let layout = self.layout(SiteName::parse(site_id)?);
        let _guard = self.locks.acquire(&layout.site).await;
        self.ensure_exists(&layout).await?;

        tracing::info!(site = %layout.site, "deleting site");

        let mut hosts = vec![layout.hostname.clone()];
        for extra in vhost::hosts_serving(&self.config, &layout.site_dir).await? {
            if !hosts.contains(&extra) {
                hosts.push(extra);
            }
        }
        for host in &hosts {
            vhost::disable(&self.config, host).await?;
        }

        self.runner
            .run(&self.mysql(format!("DROP DATABASE IF EXISTS `{}`;", layout.database)))
            .await?;
        remove_site_dir(&layout.site_dir).await?;
        self.reload_proxy().await?;
        self.checkpoints.remove(&layout.site).await?;

        tracing::info!(site = %layout.site, hosts = ?hosts, "site deleted");
        Ok(DeleteSiteResponse {
            success: true,
            message: "WordPress site deleted successfully".to_string(),
        })
    }

    // ── Status / list ─────────────────────────────────────────────────

    pub async fn status_of(&self, site_id: &str) -> Result<SiteSummary, ProvisionError> {
        if site_id.trim().is_empty() {
            return Err(ProvisionError::Validation("Missing site ID".to_string()));
        }
        let layout = self.layout(SiteName::parse(site_id)?);
        self.ensure_exists(&layout).await?;
        self.query_site(&layout).await
    }

    /// Every site directory under the sites root, queried concurrently.
    pub async fn list_sites(&self) -> Result<SiteList, ProvisionError> {
        let root = &self.config.sites_dir;
        let mut entries = tokio::fs::read_dir(root)
            .await
            .map_err(|e| ProvisionError::io("read sites directory", root, e))?;

        let mut layouts = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ProvisionError::io("read sites directory", root, e))?
        {
            let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
            if !is_dir {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let Some(sub) = subdomain_of(&name, &self.config.base_domain) else {
                continue;
            };
            match SiteName::parse(&sub) {
                Ok(site) => layouts.push(self.layout(site)),
                Err(_) => tracing::debug!(dir = %name, "skipping directory with invalid subdomain"),
            }
        }

        let limit = Duration::from_secs(self.config.status_timeout_secs);
        let queries = layouts.iter().map(|layout| async move {
            match tokio::time::timeout(limit, self.query_site(layout)).await {
                Ok(Ok(summary)) => summary,
                Ok(Err(e)) => {
                    tracing::warn!(site = %layout.site, error = %e, "status query failed");
                    SiteSummary::unknown(layout.site.as_str(), &layout.hostname)
                }
                Err(_) => {
                    tracing::warn!(site = %layout.site, "status query timed out");
                    SiteSummary::unknown(layout.site.as_str(), &layout.hostname)
                }
            }
        });

        let mut sites = join_all(queries).await;
        sites.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(SiteList { sites })
    }

    async fn query_site(&self, layout: &SiteLayout) -> Result<SiteSummary, ProvisionError> {
        let url_cmd = self.wp(layout, ["option", "get", "siteurl"]);
        let name_cmd = self.wp(layout, ["option", "get", "blogname"]);
        let count_cmd = self.wp(layout, ["post", "list", "--post_type=post", "--format=count"]);

        let (url, name, count) = futures::try_join!(
            self.runner.run(&url_cmd),
            self.runner.run(&name_cmd),
            self.runner.run(&count_cmd),
        )?;

        let url = url.trim().to_string();
        Ok(SiteSummary {
            id: layout.site.to_string(),
            name: name.trim().to_string(),
            admin_url: Some(format!("{}/wp-admin/", url)),
            url,
            status: SiteState::Active,
            articles: count.trim().parse().unwrap_or(0),
        })
    }

    /// Checkpoint of the last provisioning run for `site_id`.
    pub async fn provisioning_record(
        &self,
        site_id: &str,
    ) -> Result<ProvisionRecord, ProvisionError> {
        let site = SiteName::parse(site_id)?;
        self.checkpoints
            .load(&site)
            .await?
            .ok_or(ProvisionError::NotFound {
                site_id: site.to_string(),
            })
    }

    /// A domain may be attached only if no other site owns it, either as its
    /// primary hostname or through an existing virtual host.
    async fn ensure_domain_free(
        &self,
        layout: &SiteLayout,
        domain: &DomainName,
    ) -> Result<(), ProvisionError> {
        let taken = || ProvisionError::DomainTaken {
            domain: domain.to_string(),
        };

        if let Some(owner) = subdomain_of(domain.as_str(), &self.config.base_domain)
            .and_then(|sub| SiteName::parse(&sub).ok())
            && owner != layout.site
            && site_exists(&self.layout(owner).site_dir).await?
        {
            return Err(taken());
        }

        match vhost::root_of(&self.config, domain.as_str()).await? {
            Some(root) if root != layout.site_dir => Err(taken()),
            _ => Ok(()),
        }
    }

    async fn ensure_exists(&self, layout: &SiteLayout) -> Result<(), ProvisionError> {
        if site_exists(&layout.site_dir).await? {
            Ok(())
        } else {
            Err(ProvisionError::NotFound {
                site_id: layout.site.to_string(),
            })
        }
    }
}

async fn site_exists(dir: &Path) -> Result<bool, ProvisionError> {
    match tokio::fs::metadata(dir).await {
        Ok(meta) => Ok(meta.is_dir()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(ProvisionError::io("inspect site directory", dir, e)),
    }
}

async fn remove_site_dir(dir: &Path) -> Result<(), ProvisionError> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ProvisionError::io("remove directory", dir, e)),
    }
}
