use crate::error::ConfigError;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use logging::init_tracing;
pub use settings::{Config, DatabaseConfig, LoggingConfig, ServerConfig, StoreBackend};

/// Prefix of the environment variables that override file settings,
/// e.g. `DONATIONS_SERVER__PORT=8080`.
pub const ENV_PREFIX: &str = "DONATIONS";

/// Loads the application configuration.
///
/// Sources, lowest precedence first: built-in defaults, the TOML file (`path`,
/// or an optional `config.toml` in the working directory), `DONATIONS_*`
/// environment variables, then `backend` (a command-line override).
/// `DATABASE_URL` (also read from `.env`) fills in the database URL when none
/// was configured. Validation runs last, on the merged result.
pub fn load_config(
    path: Option<&Path>,
    backend: Option<StoreBackend>,
) -> Result<Config, ConfigError> {
    dotenvy::dotenv().ok();

    let config = read_sources(path, true)?;
    finish(config, backend, std::env::var("DATABASE_URL").ok())
}

fn finish(
    mut config: Config,
    backend: Option<StoreBackend>,
    database_url: Option<String>,
) -> Result<Config, ConfigError> {
    if let Some(backend) = backend {
        config.database.backend = backend;
    }
    if config.database.url.is_empty() {
        if let Some(url) = database_url {
            config.database.url = url;
        }
    }

    config.validate()?;
    Ok(config)
}

fn read_sources(path: Option<&Path>, with_env: bool) -> Result<Config, ConfigError> {
    let file = match path {
        Some(path) => config::File::from(path).required(true),
        None => config::File::with_name("config").required(false),
    };

    let mut builder = config::Config::builder().add_source(file);
    if with_env {
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );
    }

    let config = builder.build()?.try_deserialize::<Config>()?;
    Ok(config)
}
