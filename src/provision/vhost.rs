//! nginx virtual hosts: one file per hostname in the sites-available
//! directory, enabled through a symlink of the same name.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::config::ProvisionerConfig;
use crate::errors::ProvisionError;

/// The pair of paths that make a hostname live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VhostPaths {
    pub conf: PathBuf,
    pub enabled: PathBuf,
}

impl VhostPaths {
    pub fn for_host(config: &ProvisionerConfig, hostname: &str) -> Self {
        let file = format!("{}.conf", hostname);
        Self {
            conf: config.nginx_sites_dir.join(&file),
            enabled: config.nginx_enabled_dir.join(&file),
        }
    }
}

/// Render the server block for `server_name` serving `root` through PHP-FPM.
pub fn render(server_name: &str, root: &Path, php_fpm_socket: &str) -> String {
    format!(
        r#"
server {{
    listen 80;
    listen [::]:80;
    server_name {server_name};
    root {root};
    index index.php index.html index.htm;

    location / {{
        try_files $uri $uri/ /index.php?$args;
    }}

    location ~ \.php$ {{
        include snippets/fastcgi-php.conf;
        fastcgi_pass unix:{php_fpm_socket};
    }}

    location ~ /\.ht {{
        deny all;
    }}
}}
"#,
        root = root.display(),
    )
}

/// Write the config file and enable it. An existing symlink is left alone.
///
/// The caller reloads the proxy once this returns.
pub async fn enable(
    config: &ProvisionerConfig,
    hostname: &str,
    root: &Path,
) -> Result<VhostPaths, ProvisionError> {
    let paths = VhostPaths::for_host(config, hostname);
    let content = render(hostname, root, &config.php_fpm_socket);

    tokio::fs::write(&paths.conf, content)
        .await
        .map_err(|e| ProvisionError::io("write virtual host", &paths.conf, e))?;

    match tokio::fs::symlink(&paths.conf, &paths.enabled).await {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            tracing::debug!(link = %paths.enabled.display(), "virtual host already enabled");
        }
        Err(e) => return Err(ProvisionError::io("enable virtual host", &paths.enabled, e)),
    }

    tracing::info!(%hostname, conf = %paths.conf.display(), "virtual host enabled");
    Ok(paths)
}

/// Remove the enabling symlink and then the config file. Either being absent
/// is not an error.
pub async fn disable(config: &ProvisionerConfig, hostname: &str) -> Result<(), ProvisionError> {
    let paths = VhostPaths::for_host(config, hostname);
    remove_if_present(&paths.enabled, "disable virtual host").await?;
    remove_if_present(&paths.conf, "remove virtual host").await?;
    tracing::info!(%hostname, "virtual host removed");
    Ok(())
}

/// The `root` a hostname's config file points at, or `None` when the
/// hostname has no config file.
pub async fn root_of(
    config: &ProvisionerConfig,
    hostname: &str,
) -> Result<Option<PathBuf>, ProvisionError> {
    let paths = VhostPaths::for_host(config, hostname);
    let content = match tokio::fs::read_to_string(&paths.conf).await {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(ProvisionError::io("read virtual host", &paths.conf, e)),
    };
    let root = content.lines().find_map(|line| {
        line.trim()
            .strip_prefix("root ")
            .and_then(|rest| rest.strip_suffix(';'))
            .map(|root| PathBuf::from(root.trim()))
    });
    // A config without a root line still claims the hostname.
    Ok(Some(root.unwrap_or_default()))
}

/// Hostnames whose config file serves `root`. Finds domains attached to a
/// site after it was created.
pub async fn hosts_serving(
    config: &ProvisionerConfig,
    root: &Path,
) -> Result<Vec<String>, ProvisionError> {
    let dir = &config.nginx_sites_dir;
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(ProvisionError::io("read virtual hosts", dir, e)),
    };

    let needle = format!("root {};", root.display());
    let mut hosts = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| ProvisionError::io("read virtual hosts", dir, e))?
    {
        let name = entry.file_name().to_string_lossy().into_owned();
        let Some(host) = name.strip_suffix(".conf") else {
            continue;
        };
        let Ok(content) = tokio::fs::read_to_string(entry.path()).await else {
            continue;
        };
        if content.lines().any(|line| line.trim() == needle) {
            hosts.push(host.to_string());
        }
    }
    hosts.sort();
    Ok(hosts)
}

async fn remove_if_present(path: &Path, action: &'static str) -> Result<(), ProvisionError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ProvisionError::io(action, path, e)),
    }
}
