use redb::ReadableTable;

use super::db::{Database, DatabaseError};
use super::models::{Channel, VersionRecord};
use super::tables::*;

/// What to do with the collection after a read-modify-write step.
pub(crate) enum Mutation<R> {
    /// Persist the modified collection and return the value.
    Commit(R),
    /// Drop any modification and return the value.
    Discard(R),
}

fn decode_versions(
    table: &impl ReadableTable<&'static str, &'static [u8]>,
) -> Result<Vec<VersionRecord>, DatabaseError> {
    match table.get(VERSIONS_KEY)? {
        Some(data) => Ok(rmp_serde::from_slice(data.value())?),
        None => Ok(Vec::new()),
    }
}

impl Database {
    // ========================================================================
    // Whole-collection access
    // ========================================================================

    /// Load the full version collection from a read snapshot.
    pub fn load_versions(&self) -> Result<Vec<VersionRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(REGISTRY)?;
        decode_versions(&table)
    }

    /// Read-modify-write the version collection inside one write transaction.
    ///
    /// The collection is loaded and handed to `mutate`. On
    /// [`Mutation::Commit`] the whole collection is rewritten; on
    /// [`Mutation::Discard`] the transaction is aborted and the stored value
    /// is left untouched.
    pub(crate) fn mutate_versions<R>(
        &self,
        mutate: impl FnOnce(&mut Vec<VersionRecord>) -> Mutation<R>,
    ) -> Result<R, DatabaseError> {
        let write_txn = self.begin_write()?;

        let outcome = {
            let mut table = write_txn.open_table(REGISTRY)?;
            let mut versions = decode_versions(&table)?;
            let outcome = mutate(&mut versions);
            if let Mutation::Commit(_) = outcome {
                let data = rmp_serde::to_vec_named(&versions)?;
                table.insert(VERSIONS_KEY, data.as_slice())?;
            }
            outcome
        };

        match outcome {
            Mutation::Commit(result) => {
                write_txn.commit()?;
                Ok(result)
            }
            Mutation::Discard(result) => {
                write_txn.abort()?;
                Ok(result)
            }
        }
    }

    // ========================================================================
    // Version operations
    // ========================================================================

    /// Insert a version, or update the build number of an existing one.
    ///
    /// An existing record keeps its channel, latest flag and upload time.
    pub fn upsert_version(
        &self,
        version_name: &str,
        version_code: i64,
    ) -> Result<VersionRecord, DatabaseError> {
        debug_assert!(!version_name.is_empty(), "version name must not be empty");

        self.mutate_versions(|versions| {
            match versions
                .iter_mut()
                .find(|v| v.version_name == version_name)
            {
                Some(existing) => {
                    existing.version_code = version_code;
                    Mutation::Commit(existing.clone())
                }
                None => {
                    let record = VersionRecord::new(version_name, version_code);
                    versions.push(record.clone());
                    Mutation::Commit(record)
                }
            }
        })
    }

    /// Get a version by name
    pub fn get_version(&self, version_name: &str) -> Result<Option<VersionRecord>, DatabaseError> {
        Ok(self
            .load_versions()?
            .into_iter()
            .find(|v| v.version_name == version_name))
    }

    /// All versions of a channel, in upload order
    pub fn list_by_channel(&self, channel: Channel) -> Result<Vec<VersionRecord>, DatabaseError> {
        self.list_versions(Some(channel))
    }

    /// List versions with an optional channel filter
    pub fn list_versions(
        &self,
        channel: Option<Channel>,
    ) -> Result<Vec<VersionRecord>, DatabaseError> {
        let all = self.load_versions()?;
        match channel {
            Some(channel) => Ok(all.into_iter().filter(|v| v.channel == channel).collect()),
            None => Ok(all),
        }
    }
}
