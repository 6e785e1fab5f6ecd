use crate::Result;
use camino::{Utf8Path, Utf8PathBuf};
use ohno::{EnrichableExt, IntoAppError};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;

#[derive(Debug, Deserialize)]
struct ProjectConfig {
    #[serde(default)]
    modules: Option<Vec<ModuleDecl>>,
}

#[derive(Debug, Deserialize)]
struct ModuleDecl {
    name: String,
    prefix: String,
}

/// Read where each module of a project is checked out, from the project's CI configuration.
///
/// Module directories are `prefix/name` relative to the repository root. Files without a
/// `modules` section yield an empty map.
pub fn module_locations(config_file: &Utf8Path) -> Result<BTreeMap<String, Utf8PathBuf>> {
    let text = fs::read_to_string(config_file).into_app_err_with(|| format!("reading project configuration '{config_file}'"))?;
    parse_module_locations(&text).map_err(|e| e.enrich_with(|| format!("parsing project configuration '{config_file}'")))
}

fn parse_module_locations(text: &str) -> Result<BTreeMap<String, Utf8PathBuf>> {
    if text.trim().is_empty() {
        return Ok(BTreeMap::new());
    }

    let config: ProjectConfig = serde_yaml::from_str(text)?;
    Ok(config
        .modules
        .unwrap_or_default()
        .into_iter()
        .map(|module| {
            let location = Utf8PathBuf::from(&module.prefix).join(&module.name);
            (module.name, location)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_modules() {
        let yaml = "\
functions:
  compile: {}
modules:
- name: enterprise
  repo: git@github.com:10gen/mongo-enterprise-modules.git
  prefix: src/mongo/db/modules
  branch: master
- name: wtdevelop
  prefix: src/third_party
";

        let modules = parse_module_locations(yaml).unwrap();

        assert_eq!(modules.len(), 2);
        assert_eq!(modules["enterprise"], "src/mongo/db/modules/enterprise");
        assert_eq!(modules["wtdevelop"], "src/third_party/wtdevelop");
    }

    #[test]
    fn test_parse_without_modules() {
        assert!(parse_module_locations("tasks: []\n").unwrap().is_empty());
        assert!(parse_module_locations("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_invalid_module() {
        assert!(parse_module_locations("modules:\n- name: enterprise\n").is_err());
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn test_module_locations_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::try_from(tmp.path().join("etc").join("evergreen.yml")).unwrap();

        assert!(module_locations(&path).is_err());
    }
}
