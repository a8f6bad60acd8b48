use crate::error::CoreError;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Environment prefix for overrides, e.g. `APP_API__BASE_URL`.
pub const ENV_PREFIX: &str = "APP";

/// Load layered settings: `<dir>/base.yaml`, then `<dir>/local.yaml`, then
/// `APP_...` environment variables (`__` separates nested keys).
///
/// Both files are optional so a deployment can be configured from the
/// environment alone.
pub fn load_configuration<T: DeserializeOwned>(config_dir: &Path) -> Result<T, CoreError> {
    dotenvy::dotenv().ok();

    let settings = config::Config::builder()
        .add_source(config::File::from(config_dir.join("base.yaml")).required(false))
        .add_source(config::File::from(config_dir.join("local.yaml")).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    Ok(settings.try_deserialize::<T>()?)
}
