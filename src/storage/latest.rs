use super::db::{Database, DatabaseError};
use super::models::{Channel, VersionRecord};
use super::versions::Mutation;

impl Database {
    /// Mark `version_name` as the latest build of `channel`.
    ///
    /// Every other record of the same channel loses its latest flag in the
    /// same write; other channels are untouched. Returns `None`, without
    /// writing, when no record of `channel` has that name.
    pub fn set_latest(
        &self,
        channel: Channel,
        version_name: &str,
    ) -> Result<Option<VersionRecord>, DatabaseError> {
        self.mutate_versions(|versions| {
            let found = versions
                .iter()
                .any(|v| v.channel == channel && v.version_name == version_name);
            if !found {
                return Mutation::Discard(None);
            }

            let mut selected = None;
            for version in versions.iter_mut().filter(|v| v.channel == channel) {
                version.latest = version.version_name == version_name;
                if version.latest {
                    selected = Some(version.clone());
                }
            }
            Mutation::Commit(selected)
        })
    }

    /// The record currently flagged latest in `channel`, if any.
    pub fn get_latest(&self, channel: Channel) -> Result<Option<VersionRecord>, DatabaseError> {
        Ok(self
            .load_versions()?
            .into_iter()
            .find(|v| v.channel == channel && v.latest))
    }
}
