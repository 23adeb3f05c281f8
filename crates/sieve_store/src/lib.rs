pub mod config;
pub mod datastore;
pub mod decode;
pub mod executor;
pub mod lookups;
pub mod orchestrator;
mod sql;
pub mod store;

pub use config::{DatabaseConfig, LimitsConfig, PoolConfig, SieveConfig, SieveLimits};
pub use datastore::{default_sqlite_path, load_or_init_config, open_store};
pub use decode::Decode;
pub use executor::{Executor, KeyScope};
pub use lookups::DatasourceEdit;
pub use orchestrator::{AnchorQuery, Orchestrator, StagedRequest};
pub use patchfox_sieve_core::*;
pub use store::SieveStore;
