//! Runtime configuration from environment variables
//!
//! `.env` is loaded by the binaries before `TrackingConfig::from_env` runs.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug)]
pub enum ConfigError {
    MissingVariable(String),
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingVariable(var) => write!(f, "Missing environment variable: {}", var),
            ConfigError::InvalidValue(msg) => write!(f, "Invalid configuration value: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Portal connection settings
#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub token: Option<String>,
    pub timeout: Duration,
}

/// Dashboard template cloned by the setup tool
#[derive(Debug, Clone)]
pub struct TemplateConfig {
    pub portal_url: String,
    pub item_id: String,
    /// Service id referenced by the template, replaced with the new service id
    pub service_id: String,
}

#[derive(Debug, Clone)]
pub struct TrackingConfig {
    pub portal: PortalConfig,
    pub project_name: Option<String>,
    pub output_root: Option<PathBuf>,
    pub table: String,
    pub publish_enabled: bool,
    pub mirror_db_path: Option<PathBuf>,
    pub template: Option<TemplateConfig>,
}

fn non_empty(var: &str) -> Option<String> {
    env::var(var)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parse_bool(var: &str, default: bool) -> Result<bool, ConfigError> {
    match non_empty(var) {
        None => Ok(default),
        Some(raw) => match raw.to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue(format!(
                "{} must be a boolean, got '{}'",
                var, raw
            ))),
        },
    }
}

impl TrackingConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `PORTAL_URL` (default: https://www.arcgis.com)
    /// - `PORTAL_USERNAME`, `PORTAL_PASSWORD`, `PORTAL_TOKEN`
    /// - `PROJECT_NAME` (default: first team in the checkout layer)
    /// - `TRACKING_OUTPUT_ROOT` (default: directory containing the source)
    /// - `TRACKING_TABLE` (default: CO)
    /// - `ENABLE_PUBLISH` (default: true)
    /// - `TRACKING_DB_PATH` (SQLite mirror location)
    /// - `TEMPLATE_PORTAL_URL`, `TEMPLATE_ITEM_ID`, `TEMPLATE_SERVICE_ID`
    /// - `HTTP_TIMEOUT_SECS` (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        let url = non_empty("PORTAL_URL").unwrap_or_else(|| "https://www.arcgis.com".to_string());
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "PORTAL_URL must start with http:// or https://".to_string(),
            ));
        }

        let timeout_secs = match non_empty("HTTP_TIMEOUT_SECS") {
            None => 30,
            Some(raw) => raw.parse::<u64>().map_err(|_| {
                ConfigError::InvalidValue(format!("HTTP_TIMEOUT_SECS must be an integer, got '{}'", raw))
            })?,
        };

        let template = match non_empty("TEMPLATE_ITEM_ID") {
            None => None,
            Some(item_id) => Some(TemplateConfig {
                portal_url: non_empty("TEMPLATE_PORTAL_URL").unwrap_or_else(|| url.clone()),
                item_id,
                service_id: non_empty("TEMPLATE_SERVICE_ID")
                    .ok_or_else(|| ConfigError::MissingVariable("TEMPLATE_SERVICE_ID".to_string()))?,
            }),
        };

        Ok(Self {
            portal: PortalConfig {
                url: url.trim_end_matches('/').to_string(),
                username: non_empty("PORTAL_USERNAME"),
                password: non_empty("PORTAL_PASSWORD"),
                token: non_empty("PORTAL_TOKEN"),
                timeout: Duration::from_secs(timeout_secs),
            },
            project_name: non_empty("PROJECT_NAME"),
            output_root: non_empty("TRACKING_OUTPUT_ROOT").map(PathBuf::from),
            table: non_empty("TRACKING_TABLE").unwrap_or_else(|| "CO".to_string()),
            publish_enabled: parse_bool("ENABLE_PUBLISH", true)?,
            mirror_db_path: non_empty("TRACKING_DB_PATH").map(PathBuf::from),
            template,
        })
    }

    /// Output root for a given source path: configured root, else the source's directory
    pub fn output_root_for(&self, source: &std::path::Path) -> PathBuf {
        self.output_root.clone().unwrap_or_else(|| {
            source
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from("."))
        })
    }
}

/// Positional arguments after the program name, skipping flags and their values
pub fn positional_args(args: &[String], valued_flags: &[&str]) -> Vec<String> {
    let mut positional = Vec::new();
    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        if valued_flags.contains(&arg.as_str()) {
            iter.next();
        } else if !arg.starts_with("--") {
            positional.push(arg.clone());
        }
    }
    positional
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Mutex;

    // Environment is process-global; serialize the tests that touch it
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const VARS: [&str; 11] = [
        "PORTAL_URL",
        "PORTAL_USERNAME",
        "PORTAL_PASSWORD",
        "PORTAL_TOKEN",
        "PROJECT_NAME",
        "TRACKING_OUTPUT_ROOT",
        "TRACKING_TABLE",
        "ENABLE_PUBLISH",
        "TRACKING_DB_PATH",
        "TEMPLATE_ITEM_ID",
        "TEMPLATE_SERVICE_ID",
    ];

    fn clear() {
        for var in VARS {
            env::remove_var(var);
        }
        env::remove_var("HTTP_TIMEOUT_SECS");
        env::remove_var("TEMPLATE_PORTAL_URL");
    }

    #[test]
    fn test_default_config() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear();

        let config = TrackingConfig::from_env().unwrap();
        assert_eq!(config.portal.url, "https://www.arcgis.com");
        assert_eq!(config.portal.timeout, Duration::from_secs(30));
        assert_eq!(config.table, "CO");
        assert!(config.publish_enabled);
        assert!(config.project_name.is_none());
        assert!(config.template.is_none());
    }

    #[test]
    fn test_custom_config() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear();
        env::set_var("PORTAL_URL", "https://gis.example.org/portal/");
        env::set_var("PROJECT_NAME", "Red River");
        env::set_var("ENABLE_PUBLISH", "false");
        env::set_var("TEMPLATE_ITEM_ID", "abc");
        env::set_var("TEMPLATE_SERVICE_ID", "def");

        let config = TrackingConfig::from_env().unwrap();
        assert_eq!(config.portal.url, "https://gis.example.org/portal");
        assert_eq!(config.project_name.as_deref(), Some("Red River"));
        assert!(!config.publish_enabled);
        let template = config.template.unwrap();
        assert_eq!(template.portal_url, "https://gis.example.org/portal");
        assert_eq!(template.service_id, "def");

        clear();
    }

    #[test]
    fn test_invalid_values() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear();

        env::set_var("PORTAL_URL", "ftp://nope");
        assert!(matches!(TrackingConfig::from_env(), Err(ConfigError::InvalidValue(_))));
        env::remove_var("PORTAL_URL");

        env::set_var("ENABLE_PUBLISH", "maybe");
        assert!(matches!(TrackingConfig::from_env(), Err(ConfigError::InvalidValue(_))));
        env::remove_var("ENABLE_PUBLISH");

        env::set_var("TEMPLATE_ITEM_ID", "abc");
        assert!(matches!(TrackingConfig::from_env(), Err(ConfigError::MissingVariable(_))));

        clear();
    }

    #[test]
    fn test_positional_args() {
        let args: Vec<String> = ["bin", "--backend", "sqlite", "co.gpkg", "--verbose", "out"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(positional_args(&args, &["--backend"]), vec!["co.gpkg", "out"]);
        assert!(positional_args(&args[..1], &["--backend"]).is_empty());
    }

    #[test]
    fn test_output_root_defaults_to_source_dir() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear();
        let config = TrackingConfig::from_env().unwrap();
        assert_eq!(
            config.output_root_for(Path::new("/data/proj/checkout.gpkg")),
            PathBuf::from("/data/proj")
        );
        assert_eq!(config.output_root_for(Path::new("co.csv")), PathBuf::from("."));
    }
}
