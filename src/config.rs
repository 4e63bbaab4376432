use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "cur8tr", about = "Share curated recommendations")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to data directory
    #[arg(long, env = "CUR8TR_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Deployment environment; selects the database profile
    #[arg(long, env = "CUR8TR_ENVIRONMENT", value_enum)]
    pub environment: Option<Environment>,

    /// Create the admin account on startup when it does not exist
    #[arg(long, env = "CUR8TR_SEED_ADMIN")]
    pub seed_admin: bool,
}

#[derive(Deserialize, ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub environment: Environment,
    pub seed_admin: bool,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub uploads: UploadConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Absolute base URL used for share links; derived from the Host header when unset.
    pub public_url: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub session_hours: u64,
    pub verification_minutes: i64,
    pub bcrypt_cost: u32,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct UploadConfig {
    pub max_bytes: usize,
}

/// Connection pool settings, fixed per environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolProfile {
    pub max_size: u32,
    pub min_idle: Option<u32>,
    pub idle_timeout: Option<Duration>,
    pub max_lifetime: Option<Duration>,
    pub test_on_check_out: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            public_url: None,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_hours: 24 * 7,
            verification_minutes: 10,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: 16 * 1024 * 1024,
        }
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli);
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        // CLI overrides
        if let Some(ref host) = cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }
        if let Some(environment) = cli.environment {
            config.environment = environment;
        }
        if cli.seed_admin {
            config.seed_admin = true;
        }

        // Resolve paths relative to data dir
        if config.database.path.is_none() {
            config.database.path = Some(data_dir.join("cur8tr.db"));
        }

        Ok(config)
    }

    pub fn data_dir(cli: &Cli) -> PathBuf {
        cli.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".cur8tr")
        })
    }

    pub fn db_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from("cur8tr.db"))
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    pub fn pool_profile(&self) -> PoolProfile {
        match self.environment {
            Environment::Development => PoolProfile {
                max_size: 8,
                min_idle: None,
                idle_timeout: None,
                max_lifetime: Some(Duration::from_secs(300)),
                test_on_check_out: true,
            },
            Environment::Production => PoolProfile {
                max_size: 2,
                min_idle: Some(0),
                idle_timeout: Some(Duration::from_secs(30)),
                max_lifetime: None,
                test_on_check_out: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(data_dir: Option<PathBuf>) -> Cli {
        Cli {
            config: None,
            host: None,
            port: None,
            data_dir,
            environment: None,
            seed_admin: false,
        }
    }

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.auth.session_hours, 168);
        assert_eq!(config.auth.verification_minutes, 10);
        assert_eq!(config.auth.bcrypt_cost, bcrypt::DEFAULT_COST);
        assert_eq!(config.uploads.max_bytes, 16 * 1024 * 1024);
        assert_eq!(config.environment, Environment::Development);
        assert!(!config.seed_admin);
        assert!(config.database.path.is_none());
    }

    #[test]
    fn data_dir_uses_cli_override() {
        let cli = cli(Some(PathBuf::from("/tmp/test-cur8tr")));
        assert_eq!(Config::data_dir(&cli), PathBuf::from("/tmp/test-cur8tr"));
    }

    #[test]
    fn data_dir_defaults_to_home_dot_cur8tr() {
        assert!(Config::data_dir(&cli(None)).ends_with(".cur8tr"));
    }

    #[test]
    fn load_with_no_config_file_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::load(&cli(Some(tmp.path().to_path_buf()))).unwrap();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.db_path(), tmp.path().join("cur8tr.db"));
    }

    #[test]
    fn load_applies_cli_overrides() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cli = cli(Some(tmp.path().to_path_buf()));
        cli.host = Some("127.0.0.1".to_string());
        cli.port = Some(8080);
        cli.environment = Some(Environment::Production);
        cli.seed_admin = true;

        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert!(config.is_production());
        assert!(config.seed_admin);
    }

    #[test]
    fn load_reads_toml_file() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
environment = "production"

[server]
host = "192.168.1.1"
port = 9000
public_url = "https://cur8tr.example"

[auth]
session_hours = 24
"#,
        )
        .unwrap();

        let mut cli = cli(Some(tmp.path().to_path_buf()));
        cli.config = Some(config_path);
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.host, "192.168.1.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(
            config.server.public_url.as_deref(),
            Some("https://cur8tr.example")
        );
        assert_eq!(config.auth.session_hours, 24);
        assert_eq!(config.auth.verification_minutes, 10);
        assert_eq!(config.environment, Environment::Production);
    }

    #[test]
    fn pool_profiles_differ_by_environment() {
        let mut config = Config::default();
        let dev = config.pool_profile();
        assert_eq!(dev.max_size, 8);
        assert!(dev.test_on_check_out);
        assert_eq!(dev.max_lifetime, Some(Duration::from_secs(300)));

        config.environment = Environment::Production;
        let prod = config.pool_profile();
        assert_eq!(prod.max_size, 2);
        assert_eq!(prod.min_idle, Some(0));
        assert!(prod.idle_timeout.is_some());
    }
}
