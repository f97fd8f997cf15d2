//! Application configuration module
//! Handles environment variable loading, configuration validation, and application settings

use std::env;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub bkash: BkashConfig,
    pub storage: StorageConfig,
    pub payment: PaymentConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connection_timeout: u64,   // seconds
    pub idle_timeout: Option<u64>, // seconds
}

/// bKash tokenized checkout credentials and endpoint
#[derive(Debug, Clone)]
pub struct BkashConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub app_key: String,
    pub app_secret: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

/// External media storage (uploaded applicant photos)
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

/// Payment workflow settings
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    /// Public site base URL, target of payment-status redirects
    pub site_url: String,
    /// Fixed application fee charged at checkout (BDT)
    pub application_fee: i64,
    /// First roll number handed out when the applications table is empty
    pub roll_base: i64,
    /// Age in minutes after which an unconfirmed reservation is sweepable
    pub cleanup_threshold_minutes: i64,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log format options
#[derive(Debug, Clone)]
pub enum LogFormat {
    Json,
    Plain,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        let _ = dotenv::dotenv().ok();

        Ok(AppConfig {
            server: ServerConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            bkash: BkashConfig::from_env()?,
            storage: StorageConfig::from_env()?,
            payment: PaymentConfig::from_env()?,
            logging: LoggingConfig::from_env()?,
        })
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.database.validate()?;
        self.bkash.validate()?;
        self.storage.validate()?;
        self.payment.validate()?;
        self.logging.validate()?;

        Ok(())
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(ServerConfig {
            host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".to_string()))?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidValue(
                "SERVER_PORT cannot be 0".to_string(),
            ));
        }

        if self.host.is_empty() {
            return Err(ConfigError::InvalidValue(
                "SERVER_HOST cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(DatabaseConfig {
            url: env::var("DATABASE_URL")
                .map_err(|_| ConfigError::MissingVariable("DATABASE_URL".to_string()))?,
            max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()))?,
            min_connections: env::var("DB_MIN_CONNECTIONS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("DB_MIN_CONNECTIONS".to_string()))?,
            connection_timeout: env::var("DB_CONNECTION_TIMEOUT")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("DB_CONNECTION_TIMEOUT".to_string()))?,
            idle_timeout: env::var("DB_IDLE_TIMEOUT")
                .ok()
                .and_then(|val| val.parse().ok()),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.is_empty() {
            return Err(ConfigError::InvalidValue("DATABASE_URL".to_string()));
        }

        if self.max_connections == 0 {
            return Err(ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()));
        }

        if self.min_connections > self.max_connections {
            return Err(ConfigError::InvalidValue(
                "DB_MIN_CONNECTIONS must be <= DB_MAX_CONNECTIONS".to_string(),
            ));
        }

        Ok(())
    }
}

impl BkashConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(BkashConfig {
            base_url: env::var("BKASH_BASE_URL").unwrap_or_else(|_| {
                "https://tokenized.sandbox.bka.sh/v1.2.0-beta/tokenized".to_string()
            }),
            username: env::var("BKASH_USERNAME")
                .map_err(|_| ConfigError::MissingVariable("BKASH_USERNAME".to_string()))?,
            password: env::var("BKASH_PASSWORD")
                .map_err(|_| ConfigError::MissingVariable("BKASH_PASSWORD".to_string()))?,
            app_key: env::var("BKASH_APP_KEY")
                .map_err(|_| ConfigError::MissingVariable("BKASH_APP_KEY".to_string()))?,
            app_secret: env::var("BKASH_APP_SECRET")
                .map_err(|_| ConfigError::MissingVariable("BKASH_APP_SECRET".to_string()))?,
            timeout_secs: env::var("BKASH_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("BKASH_TIMEOUT_SECS".to_string()))?,
            max_retries: env::var("BKASH_MAX_RETRIES")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("BKASH_MAX_RETRIES".to_string()))?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "BKASH_BASE_URL must be a valid URL".to_string(),
            ));
        }

        if self.app_key.is_empty() || self.app_secret.is_empty() {
            return Err(ConfigError::InvalidValue(
                "BKASH_APP_KEY and BKASH_APP_SECRET cannot be empty".to_string(),
            ));
        }

        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue("BKASH_TIMEOUT_SECS".to_string()));
        }

        Ok(())
    }
}

impl StorageConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(StorageConfig {
            base_url: env::var("STORAGE_BASE_URL")
                .map_err(|_| ConfigError::MissingVariable("STORAGE_BASE_URL".to_string()))?,
            api_key: env::var("STORAGE_API_KEY")
                .map_err(|_| ConfigError::MissingVariable("STORAGE_API_KEY".to_string()))?,
            timeout_secs: env::var("STORAGE_TIMEOUT_SECS")
                .unwrap_or_else(|_| "15".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("STORAGE_TIMEOUT_SECS".to_string()))?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "STORAGE_BASE_URL must be a valid URL".to_string(),
            ));
        }

        Ok(())
    }
}

impl PaymentConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(PaymentConfig {
            site_url: env::var("SITE_URL")
                .map_err(|_| ConfigError::MissingVariable("SITE_URL".to_string()))?,
            application_fee: env::var("APPLICATION_FEE")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("APPLICATION_FEE".to_string()))?,
            roll_base: env::var("ROLL_BASE")
                .unwrap_or_else(|_| "2000".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("ROLL_BASE".to_string()))?,
            cleanup_threshold_minutes: env::var("CLEANUP_THRESHOLD_MINUTES")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("CLEANUP_THRESHOLD_MINUTES".to_string()))?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.site_url.starts_with("http://") && !self.site_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "SITE_URL must be a valid URL".to_string(),
            ));
        }

        if self.application_fee <= 0 {
            return Err(ConfigError::InvalidValue(
                "APPLICATION_FEE must be positive".to_string(),
            ));
        }

        if self.cleanup_threshold_minutes <= 0 {
            return Err(ConfigError::InvalidValue(
                "CLEANUP_THRESHOLD_MINUTES must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

impl LoggingConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "INFO".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "plain".to_string())
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Plain,
            },
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["TRACE", "DEBUG", "INFO", "WARN", "ERROR"];
        if !valid_levels.contains(&self.level.to_uppercase().as_str()) {
            return Err(ConfigError::InvalidValue("LOG_LEVEL".to_string()));
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),

    #[error("Invalid value for configuration: {0}")]
    InvalidValue(String),
}
