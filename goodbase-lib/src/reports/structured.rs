use crate::Result;
use crate::search::RevisionInformation;
use core::fmt::Write;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Key holding the found revision in the structured output.
const STABLE_REVISION_KEY: &str = "stable_revision";

/// The flat mapping emitted for a found revision: modules first, then `stable_revision`.
struct RevisionMapping<'a>(&'a RevisionInformation);

impl Serialize for RevisionMapping<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let info = self.0;
        let mut map = serializer.serialize_map(Some(info.module_revisions.len() + 1))?;
        for (module, revision) in &info.module_revisions {
            map.serialize_entry(module, revision)?;
        }

        map.serialize_entry(STABLE_REVISION_KEY, &info.revision)?;
        map.end()
    }
}

pub fn generate_yaml<W: Write>(info: &RevisionInformation, writer: &mut W) -> Result<()> {
    write!(writer, "{}", serde_yaml::to_string(&RevisionMapping(info))?)?;
    Ok(())
}

pub fn generate_json<W: Write>(info: &RevisionInformation, writer: &mut W) -> Result<()> {
    writeln!(writer, "{}", serde_json::to_string_pretty(&RevisionMapping(info))?)?;
    Ok(())
}
