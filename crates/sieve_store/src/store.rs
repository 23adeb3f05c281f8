use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use log::info;
use sea_orm::{ConnectOptions, Database, DatabaseBackend, DatabaseConnection};

use patchfox_sieve_core::{
    CompositeQueryApi, EditRecord, FilterParams, FindingRecord, PackageRecord, PageRequest,
    PageResult, Record, SieveError, SieveResult, Table, TableQueryApi,
};

use crate::config::{DatabaseConfig, SieveConfig, SieveLimits};
use crate::executor::Executor;
use crate::orchestrator::Orchestrator;

#[derive(Clone)]
pub struct SieveStore {
    conn: DatabaseConnection,
    backend: DatabaseBackend,
    limits: SieveLimits,
}

impl SieveStore {
    pub async fn connect(config: &SieveConfig, base_dir: &Path) -> SieveResult<Self> {
        let url = build_connection_url(config, base_dir)?;
        let mut options = ConnectOptions::new(url);
        if let Some(pool) = &config.pool {
            if let Some(max) = pool.max_connections {
                options.max_connections(max);
            }
            if let Some(min) = pool.min_connections {
                options.min_connections(min);
            }
            if let Some(timeout_ms) = pool.connect_timeout_ms {
                options.connect_timeout(Duration::from_millis(timeout_ms));
            }
            if let Some(timeout_ms) = pool.acquire_timeout_ms {
                options.acquire_timeout(Duration::from_millis(timeout_ms));
            }
            if let Some(timeout_ms) = pool.idle_timeout_ms {
                options.idle_timeout(Duration::from_millis(timeout_ms));
            }
        }
        options.sqlx_logging(false);
        let conn = Database::connect(options).await.map_err(SieveError::from)?;
        let limits = config
            .limits
            .as_ref()
            .map(SieveLimits::from_config)
            .unwrap_or_default();
        info!("sieve: connected to {} backend", config.backend_name());
        Ok(Self::from_connection(conn, limits))
    }

    pub async fn connect_sqlite(path: &Path) -> SieveResult<Self> {
        let config = SieveConfig::default_sqlite(path.to_string_lossy());
        Self::connect(&config, path.parent().unwrap_or_else(|| Path::new("."))).await
    }

    pub fn from_connection(conn: DatabaseConnection, limits: SieveLimits) -> Self {
        let backend = conn.get_database_backend();
        Self {
            conn,
            backend,
            limits,
        }
    }

    pub fn backend(&self) -> DatabaseBackend {
        self.backend
    }

    pub fn limits(&self) -> SieveLimits {
        self.limits
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    pub fn into_connection(self) -> DatabaseConnection {
        self.conn
    }

    fn executor(&self) -> Executor<'_, DatabaseConnection> {
        Executor::new(&self.conn, self.limits)
    }

    fn orchestrator(&self) -> Orchestrator<'_, DatabaseConnection> {
        Orchestrator::new(self.executor())
    }
}

#[async_trait]
impl TableQueryApi for SieveStore {
    async fn query_table(
        &self,
        table: &str,
        mut params: FilterParams,
        page: PageRequest,
    ) -> SieveResult<PageResult<Record>> {
        let table = Table::from_name(table).ok_or_else(|| SieveError::unknown_table(table))?;
        let page = page.apply_params(&mut params)?;
        self.executor().query_record(table, &params, &page).await
    }
}

#[async_trait]
impl CompositeQueryApi for SieveStore {
    async fn dataset_metrics_edits(
        &self,
        params: FilterParams,
        page: PageRequest,
    ) -> SieveResult<PageResult<EditRecord>> {
        self.orchestrator().dataset_metrics_edits(params, page).await
    }

    async fn datasource_edits(
        &self,
        params: FilterParams,
        page: PageRequest,
    ) -> SieveResult<PageResult<EditRecord>> {
        self.orchestrator().datasource_edits(params, page).await
    }

    async fn dataset_metrics_packages(
        &self,
        params: FilterParams,
        page: PageRequest,
    ) -> SieveResult<PageResult<PackageRecord>> {
        self.orchestrator().dataset_metrics_packages(params, page).await
    }

    async fn dataset_metrics_package_types(
        &self,
        params: FilterParams,
        page: PageRequest,
    ) -> SieveResult<PageResult<PackageRecord>> {
        self.orchestrator()
            .dataset_metrics_package_types(params, page)
            .await
    }

    async fn datasource_packages(
        &self,
        params: FilterParams,
        page: PageRequest,
    ) -> SieveResult<PageResult<PackageRecord>> {
        self.orchestrator().datasource_packages(params, page).await
    }

    async fn dataset_metrics_findings(
        &self,
        params: FilterParams,
        page: PageRequest,
    ) -> SieveResult<PageResult<FindingRecord>> {
        self.orchestrator().dataset_metrics_findings(params, page).await
    }

    async fn datasource_findings(
        &self,
        params: FilterParams,
        page: PageRequest,
    ) -> SieveResult<PageResult<FindingRecord>> {
        self.orchestrator().datasource_findings(params, page).await
    }
}

fn build_connection_url(config: &SieveConfig, base_dir: &Path) -> SieveResult<String> {
    match &config.database {
        DatabaseConfig::Sqlite { .. } => {
            let path = config.sqlite_path(base_dir)?;
            Ok(format!("sqlite://{}?mode=rwc", path.display()))
        }
        DatabaseConfig::Postgres { url } => Ok(url.clone()),
    }
}
