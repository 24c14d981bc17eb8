use anyhow::Result;
use serde::Deserialize;
use anyhow::anyhow;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8080,
            worker_threads: Some(4),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_max_lifetime")]
    pub max_lifetime_secs: u64,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
    #[serde(default)]
    pub sqlx_logging: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
            max_lifetime_secs: default_max_lifetime(),
            acquire_timeout_secs: default_acquire_timeout(),
            sqlx_logging: false,
        }
    }
}

/// Deployment environment; decides cookie `Secure`/`SameSite` attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(anyhow!("auth.environment must be development or production, got {other:?}")),
        }
    }

    pub fn is_production(self) -> bool {
        matches!(self, Environment::Production)
    }
}

/// Bootstrap administrator created at startup when absent.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedAdmin {
    pub email: String,
    pub password: String,
    #[serde(default = "default_seed_name")]
    pub full_name: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AuthConfig {
    #[serde(default)]
    pub access_secret: String,
    #[serde(default)]
    pub refresh_secret: String,
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub seed_admin: Option<SeedAdmin>,
}

fn default_request_timeout() -> u64 { 15 }
fn default_max_connections() -> u32 { 10 }
fn default_min_connections() -> u32 { 2 }
fn default_connect_timeout() -> u64 { 30 }
fn default_idle_timeout() -> u64 { 600 }
fn default_max_lifetime() -> u64 { 3600 }
fn default_acquire_timeout() -> u64 { 30 }
fn default_seed_name() -> String { "Administrator".into() }

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    parse(&content)
}

pub fn parse(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

impl AppConfig {
    /// Load `config.toml` (or `CONFIG_PATH`) when present, overlay env vars and validate.
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = match load_default() {
            Ok(cfg) => cfg,
            Err(e) if is_missing_file(&e) => AppConfig::default(),
            Err(e) => return Err(e),
        };
        cfg.normalize_and_validate(&|key: &str| std::env::var(key).ok())?;
        Ok(cfg)
    }

    /// `lookup` resolves environment variables; injected so tests stay hermetic.
    pub fn normalize_and_validate(&mut self, lookup: &dyn Fn(&str) -> Option<String>) -> Result<()> {
        self.server.normalize()?;
        self.database.normalize_from_env(lookup);
        self.database.validate()?;
        self.auth.normalize_from_env(lookup)?;
        self.auth.validate()?;
        Ok(())
    }
}

fn is_missing_file(err: &anyhow::Error) -> bool {
    err.downcast_ref::<std::io::Error>()
        .map(|io| io.kind() == std::io::ErrorKind::NotFound)
        .unwrap_or(false)
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = "127.0.0.1".to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be within 1..=65535"));
        }
        if self.request_timeout_secs == 0 {
            return Err(anyhow!("server.request_timeout_secs must be a positive number of seconds"));
        }
        if let Some(w) = self.worker_threads {
            if w == 0 { self.worker_threads = Some(4); }
        } else {
            self.worker_threads = Some(4);
        }
        Ok(())
    }
}

impl DatabaseConfig {
    pub fn normalize_from_env(&mut self, lookup: &dyn Fn(&str) -> Option<String>) {
        if self.url.trim().is_empty() {
            if let Some(url) = lookup("DATABASE_URL") {
                self.url = url;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(anyhow!("database.url is empty; set it in config.toml or DATABASE_URL"));
        }
        let lower = self.url.to_lowercase();
        if !(lower.starts_with("postgresql://") || lower.starts_with("postgres://")) {
            return Err(anyhow!("database.url must start with postgresql:// or postgres://"));
        }
        if self.min_connections == 0 {
            return Err(anyhow!("database.min_connections must be >= 1"));
        }
        if self.max_connections < self.min_connections {
            return Err(anyhow!("database.max_connections must be >= min_connections"));
        }
        if self.connect_timeout_secs == 0 || self.acquire_timeout_secs == 0 {
            return Err(anyhow!("database timeouts must be positive seconds"));
        }
        Ok(())
    }
}

impl AuthConfig {
    pub fn normalize_from_env(&mut self, lookup: &dyn Fn(&str) -> Option<String>) -> Result<()> {
        if self.access_secret.trim().is_empty() {
            if let Some(s) = lookup("JWT_SECRET") { self.access_secret = s; }
        }
        if self.refresh_secret.trim().is_empty() {
            if let Some(s) = lookup("JWT_REFRESH_SECRET") { self.refresh_secret = s; }
        }
        if let Some(env) = lookup("APP_ENV") {
            self.environment = Environment::parse(&env)?;
        }
        if self.seed_admin.is_none() {
            if let (Some(email), Some(password)) = (lookup("SEED_ADMIN_EMAIL"), lookup("SEED_ADMIN_PASSWORD")) {
                self.seed_admin = Some(SeedAdmin {
                    email,
                    password,
                    full_name: lookup("SEED_ADMIN_NAME").unwrap_or_else(default_seed_name),
                });
            }
        }
        Ok(())
    }

    /// Both signing secrets are mandatory and must be distinct.
    pub fn validate(&self) -> Result<()> {
        if self.access_secret.trim().is_empty() {
            return Err(anyhow!("auth.access_secret is empty; set it in config.toml or JWT_SECRET"));
        }
        if self.refresh_secret.trim().is_empty() {
            return Err(anyhow!("auth.refresh_secret is empty; set it in config.toml or JWT_REFRESH_SECRET"));
        }
        if self.access_secret == self.refresh_secret {
            return Err(anyhow!("auth.refresh_secret must differ from auth.access_secret"));
        }
        if let Some(seed) = &self.seed_admin {
            if !seed.email.contains('@') || seed.password.is_empty() {
                return Err(anyhow!("auth.seed_admin needs a valid email and a non-empty password"));
            }
        }
        Ok(())
    }
}
