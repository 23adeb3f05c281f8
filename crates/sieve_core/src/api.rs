use async_trait::async_trait;

use crate::{
    EditRecord, FilterParams, FindingRecord, PackageRecord, PageRequest, PageResult, Record,
    SieveResult,
};

#[async_trait]
pub trait TableQueryApi {
    async fn query_table(
        &self,
        table: &str,
        params: FilterParams,
        page: PageRequest,
    ) -> SieveResult<PageResult<Record>>;
}

#[async_trait]
pub trait CompositeQueryApi {
    async fn dataset_metrics_edits(
        &self,
        params: FilterParams,
        page: PageRequest,
    ) -> SieveResult<PageResult<EditRecord>>;

    async fn datasource_edits(
        &self,
        params: FilterParams,
        page: PageRequest,
    ) -> SieveResult<PageResult<EditRecord>>;

    async fn dataset_metrics_packages(
        &self,
        params: FilterParams,
        page: PageRequest,
    ) -> SieveResult<PageResult<PackageRecord>>;

    async fn dataset_metrics_package_types(
        &self,
        params: FilterParams,
        page: PageRequest,
    ) -> SieveResult<PageResult<PackageRecord>>;

    async fn datasource_packages(
        &self,
        params: FilterParams,
        page: PageRequest,
    ) -> SieveResult<PageResult<PackageRecord>>;

    async fn dataset_metrics_findings(
        &self,
        params: FilterParams,
        page: PageRequest,
    ) -> SieveResult<PageResult<FindingRecord>>;

    async fn datasource_findings(
        &self,
        params: FilterParams,
        page: PageRequest,
    ) -> SieveResult<PageResult<FindingRecord>>;
}
