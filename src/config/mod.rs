pub mod paths;
pub mod profile;
pub mod runtime;
pub mod settings;

pub use paths::AppPaths;
pub use profile::resolve_profile;
pub use runtime::{ConfigOverrides, RuntimeConfig, parse_time_zone};
pub use settings::Settings;

use crate::error::AppResult;

pub fn load_settings(paths: &AppPaths, profile: &str) -> AppResult<Settings> {
    settings::load(&paths.settings_file(profile))
}
