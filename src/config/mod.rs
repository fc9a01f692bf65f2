mod settings;

use config::{Config, Environment, File};

use settings::PartialSettings;

use crate::utils::error::Result;

pub use settings::{
    BrokerSettings, LoggingSettings, MIN_OUTBOUND_QUEUE_CAPACITY, ServerSettings, Settings,
};

/// Prefix for environment overrides, e.g. `CHANBUS_SERVER__PORT=9000`.
pub const ENV_PREFIX: &str = "CHANBUS";

/// Loads the configuration from `config/default` and environment variables,
/// merged over the built-in defaults.
pub fn load_config() -> Result<Settings> {
    load_config_from("config/default")
}

/// Same as [`load_config`] with an explicit file stem. The file is optional.
pub fn load_config_from(path: &str) -> Result<Settings> {
    let builder = Config::builder()
        .add_source(File::with_name(path).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    Ok(partial.merge_onto(Settings::default()))
}

#[cfg(test)]
mod tests;
