use super::{BuildCheck, CriteriaError, CriteriaGroup, LOG_TARGET};
use crate::Result;
use camino::{Utf8Path, Utf8PathBuf};
use directories::BaseDirs;
use ohno::IntoAppError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io;

/// Name of the criteria file within the user's configuration directory.
pub const CONFIG_FILE_NAME: &str = "git_co_evg_base.yml";

/// All saved criteria groups, persisted as a single YAML document.
///
/// The document is always read and written as a whole; concurrent writers are not coordinated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CriteriaStore {
    #[serde(default)]
    saved_criteria: Vec<CriteriaGroup>,
}

impl CriteriaStore {
    #[must_use]
    pub fn new(groups: Vec<CriteriaGroup>) -> Self {
        Self { saved_criteria: groups }
    }

    #[must_use]
    pub fn groups(&self) -> &[CriteriaGroup] {
        &self.saved_criteria
    }

    /// Get a copy of the named group, or a new empty group if there is none.
    #[must_use]
    pub fn get_or_create(&self, name: &str) -> CriteriaGroup {
        self.saved_criteria
            .iter()
            .find(|group| group.name() == name)
            .cloned()
            .unwrap_or_else(|| CriteriaGroup::new(name))
    }

    /// Store a group under the given name, replacing any group already saved under it.
    pub fn save(&mut self, name: &str, group: CriteriaGroup) {
        self.saved_criteria.retain(|existing| existing.name() != name);
        self.saved_criteria.push(group);
    }

    /// Add a rule to the named group, creating the group if needed.
    pub fn add_criteria(&mut self, name: &str, check: BuildCheck, override_existing: bool) -> Result<(), CriteriaError> {
        let mut group = self.get_or_create(name);
        group.add(check, override_existing)?;
        self.save(name, group);
        Ok(())
    }

    /// Get the rules of the named group.
    ///
    /// A group without rules is treated the same as a missing group.
    pub fn lookup(&self, name: &str) -> Result<&[BuildCheck], CriteriaError> {
        self.saved_criteria
            .iter()
            .find(|group| group.name() == name && !group.is_empty())
            .map(CriteriaGroup::rules)
            .ok_or_else(|| CriteriaError::NotFound(name.to_string()))
    }

    /// Build a store holding only the named groups, in their current order.
    #[must_use]
    pub fn export<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Self {
        let names: HashSet<&str> = names.into_iter().collect();
        Self {
            saved_criteria: self
                .saved_criteria
                .iter()
                .filter(|group| names.contains(group.name()))
                .cloned()
                .collect(),
        }
    }

    /// Merge every rule of `other` into this store, group by group.
    ///
    /// Each rule goes through [`Self::add_criteria`] so imported rules follow the same conflict
    /// policy as rules added directly. Either every rule is merged or, on the first conflict,
    /// none is.
    pub fn import(&mut self, other: &Self, override_existing: bool) -> Result<(), CriteriaError> {
        let mut merged = self.clone();
        for group in &other.saved_criteria {
            for rule in group.rules() {
                merged.add_criteria(group.name(), rule.clone(), override_existing)?;
            }
        }

        *self = merged;
        Ok(())
    }

    /// Default location of the criteria file for the current user.
    pub fn default_location() -> Result<Utf8PathBuf> {
        let config_dir = BaseDirs::new()
            .into_app_err("could not determine the user configuration directory")?
            .config_dir()
            .join(CONFIG_FILE_NAME);

        Utf8PathBuf::from_path_buf(config_dir)
            .map_err(|path| ohno::app_err!("configuration directory '{}' is not valid UTF-8", path.display()))
    }

    /// Load the store from `path`, or return an empty store if the file does not exist.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(text) => Self::from_yaml(&text, path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!(target: LOG_TARGET, "No criteria file at '{path}', starting from an empty store");
                Ok(Self::default())
            }
            Err(e) => Err(e).into_app_err_with(|| format!("reading criteria file '{path}'")),
        }
    }

    /// Read a store document that must exist, such as an import source.
    pub fn read_document(path: &Utf8Path) -> Result<Self> {
        let text = fs::read_to_string(path).into_app_err_with(|| format!("reading criteria file '{path}'"))?;
        Self::from_yaml(&text, path)
    }

    /// Write the whole store to `path`, creating parent directories as needed.
    pub fn write_document(&self, path: &Utf8Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_str().is_empty()
        {
            fs::create_dir_all(parent).into_app_err_with(|| format!("creating directory '{parent}'"))?;
        }

        let text = serde_yaml::to_string(self).into_app_err_with(|| format!("serializing criteria for saving to '{path}'"))?;
        fs::write(path, text).into_app_err_with(|| format!("writing criteria file '{path}'"))?;
        log::debug!(target: LOG_TARGET, "Wrote {} criteria group(s) to '{path}'", self.saved_criteria.len());
        Ok(())
    }

    fn from_yaml(text: &str, path: &Utf8Path) -> Result<Self> {
        // An empty file holds no document at all
        if text.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(text).into_app_err_with(|| format!("parsing criteria file '{path}'"))
    }
}
