//! Command implementations.

mod info;
mod run;
mod validate;

pub use info::run_info;
pub use run::run_pipeline;
pub use validate::run_validate;

use std::path::Path;

use config_loader::{ConfigLoader, NodeConfig};
use tracing::info;

use crate::error::{CliError, Result};

/// Load the node configuration, falling back to defaults when no path is given
pub(crate) fn load_node_config(path: Option<&Path>) -> Result<NodeConfig> {
    let Some(path) = path else {
        info!("No configuration file given, using defaults");
        return Ok(NodeConfig::default());
    };

    if !path.exists() {
        return Err(CliError::config_not_found(path.display().to_string()));
    }

    info!(config = %path.display(), "Loading configuration");
    Ok(ConfigLoader::load_from_path(path)?)
}
