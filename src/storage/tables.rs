use redb::TableDefinition;

/// Registry values: well-known key -> msgpack document
pub const REGISTRY: TableDefinition<&str, &[u8]> = TableDefinition::new("registry");

/// Key holding the whole msgpack `Vec<VersionRecord>` collection
pub const VERSIONS_KEY: &str = "apps";
