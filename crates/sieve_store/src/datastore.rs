use std::path::{Path, PathBuf};

use crate::{SieveConfig, SieveResult, SieveStore};

const DEFAULT_DB_NAME: &str = "sieve.sqlite";

pub fn load_or_init_config(base: &Path) -> SieveResult<SieveConfig> {
    let default_sqlite = base.join(DEFAULT_DB_NAME);
    SieveConfig::load_or_init(base, &default_sqlite)
}

pub async fn open_store(base: &Path) -> SieveResult<SieveStore> {
    let config = load_or_init_config(base)?;
    SieveStore::connect(&config, base).await
}

pub fn default_sqlite_path(base: &Path) -> PathBuf {
    base.join(DEFAULT_DB_NAME)
}
