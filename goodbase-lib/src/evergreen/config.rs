use crate::Result;
use camino::{Utf8Path, Utf8PathBuf};
use directories::BaseDirs;
use ohno::{EnrichableExt, IntoAppError, bail};
use serde::Deserialize;
use std::fs;

/// Location of the Evergreen configuration, relative to the user's home directory.
pub const DEFAULT_EVERGREEN_CONFIG: &str = "~/.evergreen.yml";

/// Server and credentials read from the user's Evergreen configuration file.
///
/// Other settings in the file are ignored.
#[derive(Clone, Deserialize)]
pub struct EvergreenConfig {
    pub api_server_host: String,
    pub user: String,
    pub api_key: String,
}

impl core::fmt::Debug for EvergreenConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EvergreenConfig")
            .field("api_server_host", &self.api_server_host)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

impl EvergreenConfig {
    /// Read the configuration file, expanding a leading `~` to the home directory.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let path = expand_home(path)?;
        let text = fs::read_to_string(&path).into_app_err_with(|| format!("reading Evergreen configuration '{path}'"))?;
        Self::from_yaml(&text).map_err(|e| e.enrich_with(|| format!("parsing Evergreen configuration '{path}'")))
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(text)?;
        if config.api_server_host.is_empty() {
            bail!("'api_server_host' is empty");
        }

        Ok(config)
    }
}

/// Replace a leading `~` with the current user's home directory.
pub fn expand_home(path: &Utf8Path) -> Result<Utf8PathBuf> {
    let Ok(rest) = path.strip_prefix("~") else {
        return Ok(path.to_path_buf());
    };

    let home = BaseDirs::new()
        .into_app_err("could not determine the home directory")?
        .home_dir()
        .to_path_buf();
    let home = Utf8PathBuf::from_path_buf(home)
        .map_err(|home| ohno::app_err!("home directory '{}' is not valid UTF-8", home.display()))?;

    Ok(home.join(rest))
}
