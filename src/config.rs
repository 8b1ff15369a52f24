//! Configuration for both services.
//!
//! Values are layered file → environment → CLI:
//!
//! ```toml
//! [provisioner]
//! port = 3001
//! api_key = "change-me"
//! base_domain = "example.com"
//! sites_dir = "/var/www/html"
//! reload_cmd = ["systemctl", "reload", "nginx"]
//!
//! [gateway]
//! port = 3000
//! provisioner_url = "http://127.0.0.1:3001"
//! settings_path = ".wpfleet/settings.json"
//! ```
//!
//! Environment variables keep the names the dashboard's deployment scripts
//! already export (`BASE_DOMAIN`, `WP_SITES_DIR`, `WP_SERVER_API_KEY`, ...).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "wpfleet.toml";

/// Raw TOML structure for `wpfleet.toml`.
#[derive(Debug, Default, Deserialize)]
pub struct WpfleetToml {
    #[serde(default)]
    pub provisioner: ProvisionerSection,
    #[serde(default)]
    pub gateway: GatewaySection,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProvisionerSection {
    pub port: Option<u16>,
    pub bind: Option<String>,
    pub api_key: Option<String>,
    pub base_domain: Option<String>,
    pub sites_dir: Option<PathBuf>,
    pub nginx_sites_dir: Option<PathBuf>,
    pub nginx_enabled_dir: Option<PathBuf>,
    pub php_fpm_socket: Option<String>,
    pub web_user: Option<String>,
    pub web_group: Option<String>,
    pub db_user: Option<String>,
    pub db_password: Option<String>,
    pub db_host: Option<String>,
    pub wp_cmd: Option<String>,
    pub mysql_cmd: Option<String>,
    pub reload_cmd: Option<Vec<String>>,
    pub state_dir: Option<PathBuf>,
    pub status_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GatewaySection {
    pub port: Option<u16>,
    pub bind: Option<String>,
    pub api_token: Option<String>,
    pub settings_path: Option<PathBuf>,
    pub llm_base_url: Option<String>,
    pub llm_model: Option<String>,
    pub llm_api_key: Option<String>,
    pub provisioner_url: Option<String>,
    pub provisioner_key: Option<String>,
    pub base_domain: Option<String>,
    pub default_wp_username: Option<String>,
    pub default_wp_password: Option<String>,
    pub default_wp_email: Option<String>,
    pub dev: Option<bool>,
}

impl WpfleetToml {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }
}

/// Resolved settings for the provisioning service.
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionerConfig {
    pub port: u16,
    pub bind: String,
    pub api_key: Option<String>,
    pub base_domain: String,
    pub sites_dir: PathBuf,
    pub nginx_sites_dir: PathBuf,
    pub nginx_enabled_dir: PathBuf,
    pub php_fpm_socket: String,
    pub web_user: String,
    pub web_group: String,
    pub db_user: String,
    pub db_password: String,
    pub db_host: String,
    pub wp_cmd: String,
    pub mysql_cmd: String,
    pub reload_cmd: Vec<String>,
    pub state_dir: PathBuf,
    pub status_timeout_secs: u64,
}

impl Default for ProvisionerConfig {
    fn default() -> Self {
        Self {
            port: 3001,
            bind: "0.0.0.0".to_string(),
            api_key: None,
            base_domain: "yourdomain.com".to_string(),
            sites_dir: PathBuf::from("/var/www/html"),
            nginx_sites_dir: PathBuf::from("/etc/nginx/sites-available"),
            nginx_enabled_dir: PathBuf::from("/etc/nginx/sites-enabled"),
            php_fpm_socket: "/var/run/php/php8.0-fpm.sock".to_string(),
            web_user: "www-data".to_string(),
            web_group: "www-data".to_string(),
            db_user: "root".to_string(),
            db_password: String::new(),
            db_host: "localhost".to_string(),
            wp_cmd: "wp".to_string(),
            mysql_cmd: "mysql".to_string(),
            reload_cmd: vec![
                "systemctl".to_string(),
                "reload".to_string(),
                "nginx".to_string(),
            ],
            state_dir: PathBuf::from("/var/lib/wpfleet"),
            status_timeout_secs: 30,
        }
    }
}

impl ProvisionerConfig {
    fn apply_file(&mut self, section: ProvisionerSection) {
        if let Some(v) = section.port {
            self.port = v;
        }
        if let Some(v) = section.bind {
            self.bind = v;
        }
        if section.api_key.is_some() {
            self.api_key = section.api_key;
        }
        if let Some(v) = section.base_domain {
            self.base_domain = v;
        }
        if let Some(v) = section.sites_dir {
            self.sites_dir = v;
        }
        if let Some(v) = section.nginx_sites_dir {
            self.nginx_sites_dir = v;
        }
        if let Some(v) = section.nginx_enabled_dir {
            self.nginx_enabled_dir = v;
        }
        if let Some(v) = section.php_fpm_socket {
            self.php_fpm_socket = v;
        }
        if let Some(v) = section.web_user {
            self.web_user = v;
        }
        if let Some(v) = section.web_group {
            self.web_group = v;
        }
        if let Some(v) = section.db_user {
            self.db_user = v;
        }
        if let Some(v) = section.db_password {
            self.db_password = v;
        }
        if let Some(v) = section.db_host {
            self.db_host = v;
        }
        if let Some(v) = section.wp_cmd {
            self.wp_cmd = v;
        }
        if let Some(v) = section.mysql_cmd {
            self.mysql_cmd = v;
        }
        if let Some(v) = section.reload_cmd
            && !v.is_empty()
        {
            self.reload_cmd = v;
        }
        if let Some(v) = section.state_dir {
            self.state_dir = v;
        }
        if let Some(v) = section.status_timeout_secs {
            self.status_timeout_secs = v;
        }
    }

    fn apply_env(&mut self, env: &impl Fn(&str) -> Option<String>) {
        if let Some(v) = env("WP_SERVER_PORT").and_then(|p| p.parse().ok()) {
            self.port = v;
        }
        if let Some(v) = env("WP_SERVER_API_KEY") {
            self.api_key = Some(v);
        }
        if let Some(v) = env("BASE_DOMAIN") {
            self.base_domain = v;
        }
        if let Some(v) = env("WP_SITES_DIR") {
            self.sites_dir = PathBuf::from(v);
        }
        if let Some(v) = env("NGINX_SITES_DIR") {
            self.nginx_sites_dir = PathBuf::from(v);
        }
        if let Some(v) = env("NGINX_ENABLED_DIR") {
            self.nginx_enabled_dir = PathBuf::from(v);
        }
        if let Some(v) = env("DB_USER") {
            self.db_user = v;
        }
        if let Some(v) = env("DB_PASSWORD") {
            self.db_password = v;
        }
        if let Some(v) = env("DB_HOST") {
            self.db_host = v;
        }
        if let Some(v) = env("WPFLEET_STATE_DIR") {
            self.state_dir = PathBuf::from(v);
        }
    }
}

/// Resolved settings for the gateway.
///
/// The `llm_api_key` .. `default_wp_email` fields only seed the settings
/// store the first time it is created; afterwards the stored file wins.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayConfig {
    pub port: u16,
    pub bind: String,
    pub api_token: Option<String>,
    pub settings_path: PathBuf,
    pub llm_base_url: String,
    pub llm_model: String,
    pub llm_api_key: Option<String>,
    pub provisioner_url: Option<String>,
    pub provisioner_key: Option<String>,
    pub base_domain: Option<String>,
    pub default_wp_username: Option<String>,
    pub default_wp_password: Option<String>,
    pub default_wp_email: Option<String>,
    pub dev: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            bind: "127.0.0.1".to_string(),
            api_token: None,
            settings_path: PathBuf::from(".wpfleet/settings.json"),
            llm_base_url: "https://api.openai.com/v1".to_string(),
            llm_model: "gpt-4".to_string(),
            llm_api_key: None,
            provisioner_url: None,
            provisioner_key: None,
            base_domain: None,
            default_wp_username: None,
            default_wp_password: None,
            default_wp_email: None,
            dev: false,
        }
    }
}

impl GatewayConfig {
    fn apply_file(&mut self, section: GatewaySection) {
        if let Some(v) = section.port {
            self.port = v;
        }
        if let Some(v) = section.bind {
            self.bind = v;
        }
        if section.api_token.is_some() {
            self.api_token = section.api_token;
        }
        if let Some(v) = section.settings_path {
            self.settings_path = v;
        }
        if let Some(v) = section.llm_base_url {
            self.llm_base_url = v;
        }
        if let Some(v) = section.llm_model {
            self.llm_model = v;
        }
        if let Some(v) = section.dev {
            self.dev = v;
        }
        self.llm_api_key = section.llm_api_key.or(self.llm_api_key.take());
        self.provisioner_url = section.provisioner_url.or(self.provisioner_url.take());
        self.provisioner_key = section.provisioner_key.or(self.provisioner_key.take());
        self.base_domain = section.base_domain.or(self.base_domain.take());
        self.default_wp_username = section
            .default_wp_username
            .or(self.default_wp_username.take());
        self.default_wp_password = section
            .default_wp_password
            .or(self.default_wp_password.take());
        self.default_wp_email = section.default_wp_email.or(self.default_wp_email.take());
    }

    fn apply_env(&mut self, env: &impl Fn(&str) -> Option<String>) {
        if let Some(v) = env("PORT").and_then(|p| p.parse().ok()) {
            self.port = v;
        }
        if let Some(v) = env("GATEWAY_API_TOKEN") {
            self.api_token = Some(v);
        }
        if let Some(v) = env("WPFLEET_SETTINGS_PATH") {
            self.settings_path = PathBuf::from(v);
        }
        if let Some(v) = env("OPENAI_BASE_URL") {
            self.llm_base_url = v;
        }
        self.llm_api_key = env("OPENAI_API_KEY").or(self.llm_api_key.take());
        self.provisioner_url = env("WP_SERVER_API_URL").or(self.provisioner_url.take());
        self.provisioner_key = env("WP_SERVER_API_KEY").or(self.provisioner_key.take());
        self.base_domain = env("BASE_DOMAIN").or(self.base_domain.take());
        self.default_wp_username = env("DEFAULT_WP_USERNAME").or(self.default_wp_username.take());
        self.default_wp_password = env("DEFAULT_WP_PASSWORD").or(self.default_wp_password.take());
        self.default_wp_email = env("DEFAULT_WP_EMAIL").or(self.default_wp_email.take());
    }
}

/// Both service configurations, resolved.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Config {
    pub provisioner: ProvisionerConfig,
    pub gateway: GatewayConfig,
}

impl Config {
    /// Load `wpfleet.toml` and apply process environment overrides.
    ///
    /// An explicit `path` must exist; the default path is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, |key| {
            std::env::var(key).ok().filter(|v| !v.is_empty())
        })
    }

    pub fn load_with_env(path: Option<&Path>, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let toml = match path {
            Some(path) => WpfleetToml::load(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    WpfleetToml::load(default_path)?
                } else {
                    WpfleetToml::default()
                }
            }
        };

        let mut config = Config::default();
        config.provisioner.apply_file(toml.provisioner);
        config.gateway.apply_file(toml.gateway);
        config.provisioner.apply_env(&env);
        config.gateway.apply_env(&env);
        Ok(config)
    }

    /// Copy of the configuration with every secret replaced by a mask, for display.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.provisioner.api_key = copy.provisioner.api_key.as_deref().map(mask_secret);
        if !copy.provisioner.db_password.is_empty() {
            copy.provisioner.db_password = mask_secret(&copy.provisioner.db_password);
        }
        copy.gateway.api_token = copy.gateway.api_token.as_deref().map(mask_secret);
        copy.gateway.llm_api_key = copy.gateway.llm_api_key.as_deref().map(mask_secret);
        copy.gateway.provisioner_key = copy.gateway.provisioner_key.as_deref().map(mask_secret);
        copy.gateway.default_wp_password =
            copy.gateway.default_wp_password.as_deref().map(mask_secret);
        copy
    }
}

/// Mask a secret, keeping the last four characters of long values.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "********".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("********{}", tail)
}

/// Commented starting point written by `wpfleet config init`.
pub fn default_toml() -> &'static str {
    r#"# wpfleet configuration. Environment variables override these values.

[provisioner]
port = 3001
bind = "0.0.0.0"
# Bearer token the gateway must present (WP_SERVER_API_KEY).
# api_key = "change-me"
base_domain = "yourdomain.com"
sites_dir = "/var/www/html"
nginx_sites_dir = "/etc/nginx/sites-available"
nginx_enabled_dir = "/etc/nginx/sites-enabled"
php_fpm_socket = "/var/run/php/php8.0-fpm.sock"
web_user = "www-data"
web_group = "www-data"
db_user = "root"
db_host = "localhost"
reload_cmd = ["systemctl", "reload", "nginx"]
state_dir = "/var/lib/wpfleet"
status_timeout_secs = 30

[gateway]
port = 3000
bind = "127.0.0.1"
# Bearer token for /api/* routes (GATEWAY_API_TOKEN). Generated at startup when unset.
# api_token = "change-me"
settings_path = ".wpfleet/settings.json"
llm_base_url = "https://api.openai.com/v1"
llm_model = "gpt-4"
# provisioner_url = "http://127.0.0.1:3001"
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults_match_stock_deployment() {
        let config = Config::default();
        assert_eq!(config.provisioner.port, 3001);
        assert_eq!(config.provisioner.base_domain, "yourdomain.com");
        assert_eq!(config.provisioner.sites_dir, PathBuf::from("/var/www/html"));
        assert_eq!(config.provisioner.reload_cmd, vec!["systemctl", "reload", "nginx"]);
        assert_eq!(config.gateway.port, 3000);
        assert_eq!(config.gateway.llm_model, "gpt-4");
    }

    #[test]
    fn test_load_full_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wpfleet.toml");
        fs::write(
            &path,
            r#"
[provisioner]
port = 4001
api_key = "secret-key"
base_domain = "example.com"
sites_dir = "/srv/sites"
reload_cmd = ["nginx", "-s", "reload"]
status_timeout_secs = 5

[gateway]
port = 4000
provisioner_url = "http://10.0.0.2:4001"
llm_model = "gpt-4o"
dev = true
"#,
        )
        .unwrap();

        let config = Config::load_with_env(Some(&path), no_env).unwrap();
        assert_eq!(config.provisioner.port, 4001);
        assert_eq!(config.provisioner.api_key.as_deref(), Some("secret-key"));
        assert_eq!(config.provisioner.sites_dir, PathBuf::from("/srv/sites"));
        assert_eq!(config.provisioner.reload_cmd, vec!["nginx", "-s", "reload"]);
        assert_eq!(config.provisioner.status_timeout_secs, 5);
        assert_eq!(config.provisioner.db_user, "root");
        assert_eq!(config.gateway.port, 4000);
        assert_eq!(
            config.gateway.provisioner_url.as_deref(),
            Some("http://10.0.0.2:4001")
        );
        assert_eq!(config.gateway.llm_model, "gpt-4o");
        assert!(config.gateway.dev);
    }

    #[test]
    fn test_env_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wpfleet.toml");
        fs::write(&path, "[provisioner]\nbase_domain = \"file.com\"\n").unwrap();

        let env: HashMap<&str, &str> = HashMap::from([
            ("BASE_DOMAIN", "env.com"),
            ("WP_SITES_DIR", "/tmp/sites"),
            ("WP_SERVER_API_KEY", "k"),
            ("WP_SERVER_API_URL", "http://up"),
            ("WP_SERVER_PORT", "5001"),
        ]);
        let config =
            Config::load_with_env(Some(&path), |k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.provisioner.base_domain, "env.com");
        assert_eq!(config.provisioner.sites_dir, PathBuf::from("/tmp/sites"));
        assert_eq!(config.provisioner.port, 5001);
        assert_eq!(config.provisioner.api_key.as_deref(), Some("k"));
        assert_eq!(config.gateway.provisioner_key.as_deref(), Some("k"));
        assert_eq!(config.gateway.provisioner_url.as_deref(), Some("http://up"));
        assert_eq!(config.gateway.base_domain.as_deref(), Some("env.com"));
    }

    #[test]
    fn test_unparseable_port_env_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wpfleet.toml");
        fs::write(&path, "").unwrap();
        let config = Config::load_with_env(Some(&path), |k| {
            (k == "WP_SERVER_PORT").then(|| "not-a-port".to_string())
        })
        .unwrap();
        assert_eq!(config.provisioner.port, 3001);
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load_with_env(Some(&dir.path().join("nope.toml")), no_env).is_err());
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wpfleet.toml");
        fs::write(&path, "not valid toml {{{{").unwrap();
        assert!(Config::load_with_env(Some(&path), no_env).is_err());
    }

    #[test]
    fn test_empty_reload_cmd_keeps_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wpfleet.toml");
        fs::write(&path, "[provisioner]\nreload_cmd = []\n").unwrap();
        let config = Config::load_with_env(Some(&path), no_env).unwrap();
        assert_eq!(config.provisioner.reload_cmd.len(), 3);
    }

    #[test]
    fn test_default_toml_parses() {
        let toml: WpfleetToml = toml::from_str(default_toml()).unwrap();
        assert_eq!(toml.provisioner.port, Some(3001));
        assert_eq!(toml.gateway.llm_model.as_deref(), Some("gpt-4"));
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret("short"), "********");
        assert_eq!(mask_secret("sk-abcdefghijkl"), "********ijkl");
    }

    #[test]
    fn test_redacted_hides_secrets() {
        let mut config = Config::default();
        config.provisioner.api_key = Some("super-secret-token".into());
        config.provisioner.db_password = "hunter2hunter2".into();
        config.gateway.llm_api_key = Some("sk-123456789".into());
        let redacted = config.redacted();
        assert_eq!(redacted.provisioner.api_key.as_deref(), Some("********oken"));
        assert!(!redacted.provisioner.db_password.contains("hunter2hunter2"));
        assert_eq!(redacted.gateway.llm_api_key.as_deref(), Some("********6789"));
        assert_eq!(config.provisioner.api_key.as_deref(), Some("super-secret-token"));
    }
}
