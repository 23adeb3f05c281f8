use sea_orm::{QueryResult, TryGetable};
use serde::de::DeserializeOwned;

use patchfox_sieve_core::{
    DatasetMetricsRecord, DatasetRecord, DatasourceEventRecord, DatasourceMetricsRecord,
    DatasourceRecord, EditRecord, FindingDataRecord, FindingRecord, FindingReporterRecord,
    PackageRecord, SieveError, SieveResult, Table,
};

pub trait Decode: Sized + Clone + Send {
    const TABLE: Table;
    const COLUMNS: &'static [&'static str];

    fn decode(row: &QueryResult) -> SieveResult<Self>;
}

fn get<T: TryGetable>(row: &QueryResult, col: &str) -> SieveResult<T> {
    row.try_get::<T>("", col).map_err(SieveError::from)
}

fn opt<T: TryGetable>(row: &QueryResult, col: &str) -> SieveResult<Option<T>> {
    get::<Option<T>>(row, col)
}

fn or_default<T: TryGetable + Default>(row: &QueryResult, col: &str) -> SieveResult<T> {
    Ok(opt::<T>(row, col)?.unwrap_or_default())
}

// postgres hands back native arrays; sqlite stores the same columns as JSON text
fn array<T>(row: &QueryResult, col: &str) -> SieveResult<Vec<T>>
where
    Vec<T>: TryGetable,
    T: DeserializeOwned,
{
    let native = match row.try_get::<Option<Vec<T>>>("", col) {
        Ok(values) => return Ok(values.unwrap_or_default()),
        Err(err) => err,
    };
    match row.try_get::<Option<String>>("", col) {
        Ok(Some(raw)) if !raw.trim().is_empty() => serde_json::from_str(&raw)
            .map_err(|err| SieveError::storage(format!("decode {col}: {err}"))),
        Ok(_) => Ok(Vec::new()),
        Err(_) => Err(SieveError::storage(format!("decode {col}: {native}"))),
    }
}

pub fn decode_count(row: Option<QueryResult>) -> SieveResult<u64> {
    let Some(row) = row else {
        return Ok(0);
    };
    let total: i64 = get(&row, "total")?;
    Ok(total.max(0) as u64)
}

impl Decode for DatasetRecord {
    const TABLE: Table = Table::Dataset;
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "latest_txid",
        "latest_job_id",
        "name",
        "updated_at",
        "status",
    ];

    fn decode(row: &QueryResult) -> SieveResult<Self> {
        Ok(Self {
            id: get(row, "id")?,
            latest_txid: opt(row, "latest_txid")?,
            latest_job_id: opt(row, "latest_job_id")?,
            name: opt(row, "name")?,
            updated_at: opt(row, "updated_at")?,
            status: opt(row, "status")?,
            datasources: Vec::new(),
        })
    }
}

impl Decode for DatasourceRecord {
    const TABLE: Table = Table::Datasource;
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "latest_txid",
        "latest_job_id",
        "purl",
        "domain",
        "name",
        "commit_branch",
        "type",
        "number_events_received",
        "number_event_processing_errors",
        "first_event_received_at",
        "last_event_received_at",
        "last_event_received_status",
        "status",
    ];

    fn decode(row: &QueryResult) -> SieveResult<Self> {
        Ok(Self {
            id: get(row, "id")?,
            latest_txid: opt(row, "latest_txid")?,
            latest_job_id: opt(row, "latest_job_id")?,
            purl: opt(row, "purl")?,
            domain: opt(row, "domain")?,
            name: opt(row, "name")?,
            commit_branch: opt(row, "commit_branch")?,
            kind: opt(row, "type")?,
            number_events_received: or_default(row, "number_events_received")?,
            number_event_processing_errors: or_default(row, "number_event_processing_errors")?,
            first_event_received_at: opt(row, "first_event_received_at")?,
            last_event_received_at: opt(row, "last_event_received_at")?,
            last_event_received_status: opt(row, "last_event_received_status")?,
            status: opt(row, "status")?,
        })
    }
}

impl Decode for DatasourceEventRecord {
    const TABLE: Table = Table::DatasourceEvent;
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "purl",
        "txid",
        "job_id",
        "commit_hash",
        "commit_branch",
        "commit_date_time",
        "event_date_time",
        "status",
        "processing_error",
        "oss_enriched",
        "package_index_enriched",
        "analyzed",
        "forecasted",
        "recommended",
        "datasource_id",
    ];

    fn decode(row: &QueryResult) -> SieveResult<Self> {
        Ok(Self {
            id: get(row, "id")?,
            purl: opt(row, "purl")?,
            txid: opt(row, "txid")?,
            job_id: opt(row, "job_id")?,
            commit_hash: opt(row, "commit_hash")?,
            commit_branch: opt(row, "commit_branch")?,
            commit_date_time: opt(row, "commit_date_time")?,
            event_date_time: opt(row, "event_date_time")?,
            status: opt(row, "status")?,
            processing_error: opt(row, "processing_error")?,
            oss_enriched: or_default(row, "oss_enriched")?,
            package_index_enriched: or_default(row, "package_index_enriched")?,
            analyzed: or_default(row, "analyzed")?,
            forecasted: or_default(row, "forecasted")?,
            recommended: or_default(row, "recommended")?,
            datasource_id: opt(row, "datasource_id")?,
        })
    }
}

impl Decode for DatasetMetricsRecord {
    const TABLE: Table = Table::DatasetMetrics;
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "dataset_id",
        "txid",
        "job_id",
        "commit_date_time",
        "event_date_time",
        "forecast_maturity_date",
        "datasource_count",
        "datasource_event_count",
        "is_current",
        "is_forecast_same_course",
        "is_forecast_recommendations_taken",
        "recommendation_type",
        "recommendation_headline",
        "rps_score",
        "total_findings",
        "critical_findings",
        "high_findings",
        "medium_findings",
        "low_findings",
        "packages",
        "packages_with_findings",
        "downlevel_packages",
        "stale_packages",
        "patches",
        "patch_efficacy_score",
        "patch_impact",
        "patch_effort",
        "package_indexes",
    ];

    fn decode(row: &QueryResult) -> SieveResult<Self> {
        Ok(Self {
            id: get(row, "id")?,
            dataset_id: opt(row, "dataset_id")?,
            txid: opt(row, "txid")?,
            job_id: opt(row, "job_id")?,
            commit_date_time: opt(row, "commit_date_time")?,
            event_date_time: opt(row, "event_date_time")?,
            forecast_maturity_date: opt(row, "forecast_maturity_date")?,
            datasource_count: or_default(row, "datasource_count")?,
            datasource_event_count: or_default(row, "datasource_event_count")?,
            is_current: or_default(row, "is_current")?,
            is_forecast_same_course: or_default(row, "is_forecast_same_course")?,
            is_forecast_recommendations_taken: or_default(
                row,
                "is_forecast_recommendations_taken",
            )?,
            recommendation_type: opt(row, "recommendation_type")?,
            recommendation_headline: opt(row, "recommendation_headline")?,
            rps_score: or_default(row, "rps_score")?,
            total_findings: or_default(row, "total_findings")?,
            critical_findings: or_default(row, "critical_findings")?,
            high_findings: or_default(row, "high_findings")?,
            medium_findings: or_default(row, "medium_findings")?,
            low_findings: or_default(row, "low_findings")?,
            packages: or_default(row, "packages")?,
            packages_with_findings: or_default(row, "packages_with_findings")?,
            downlevel_packages: or_default(row, "downlevel_packages")?,
            stale_packages: or_default(row, "stale_packages")?,
            patches: or_default(row, "patches")?,
            patch_efficacy_score: or_default(row, "patch_efficacy_score")?,
            patch_impact: or_default(row, "patch_impact")?,
            patch_effort: or_default(row, "patch_effort")?,
            package_indexes: array(row, "package_indexes")?,
        })
    }
}

impl Decode for EditRecord {
    const TABLE: Table = Table::Edit;
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "dataset_metrics_id",
        "datasource_id",
        "commit_date_time",
        "event_date_time",
        "edit_type",
        "before",
        "after",
        "is_same_edit",
        "same_edit_count",
        "is_pf_recommended_edit",
        "is_user_edit",
        "critical_findings",
        "high_findings",
        "medium_findings",
        "low_findings",
        "reduce_cves_index",
        "reduce_cve_growth_index",
        "reduce_cve_backlog_index",
        "reduce_cve_backlog_growth_index",
        "reduce_stale_packages_index",
        "reduce_stale_packages_growth_index",
        "reduce_downlevel_packages_index",
        "reduce_downlevel_packages_growth_index",
        "grow_patch_efficacy_index",
        "remove_redundant_packages_index",
        "decrease_backlog_rank",
        "decrease_vulnerability_count_rank",
        "avoids_vulnerabilities_rank",
        "increase_impact_rank",
    ];

    fn decode(row: &QueryResult) -> SieveResult<Self> {
        Ok(Self {
            id: get(row, "id")?,
            dataset_metrics_id: opt(row, "dataset_metrics_id")?,
            datasource_id: opt(row, "datasource_id")?,
            commit_date_time: opt(row, "commit_date_time")?,
            event_date_time: opt(row, "event_date_time")?,
            edit_type: opt(row, "edit_type")?,
            before: opt(row, "before")?,
            after: opt(row, "after")?,
            is_same_edit: or_default(row, "is_same_edit")?,
            same_edit_count: or_default(row, "same_edit_count")?,
            is_pf_recommended_edit: or_default(row, "is_pf_recommended_edit")?,
            is_user_edit: or_default(row, "is_user_edit")?,
            critical_findings: opt(row, "critical_findings")?,
            high_findings: opt(row, "high_findings")?,
            medium_findings: opt(row, "medium_findings")?,
            low_findings: opt(row, "low_findings")?,
            reduce_cves_index: opt(row, "reduce_cves_index")?,
            reduce_cve_growth_index: opt(row, "reduce_cve_growth_index")?,
            reduce_cve_backlog_index: opt(row, "reduce_cve_backlog_index")?,
            reduce_cve_backlog_growth_index: opt(row, "reduce_cve_backlog_growth_index")?,
            reduce_stale_packages_index: opt(row, "reduce_stale_packages_index")?,
            reduce_stale_packages_growth_index: opt(row, "reduce_stale_packages_growth_index")?,
            reduce_downlevel_packages_index: opt(row, "reduce_downlevel_packages_index")?,
            reduce_downlevel_packages_growth_index: opt(
                row,
                "reduce_downlevel_packages_growth_index",
            )?,
            grow_patch_efficacy_index: opt(row, "grow_patch_efficacy_index")?,
            remove_redundant_packages_index: opt(row, "remove_redundant_packages_index")?,
            decrease_backlog_rank: opt(row, "decrease_backlog_rank")?,
            decrease_vulnerability_count_rank: opt(row, "decrease_vulnerability_count_rank")?,
            avoids_vulnerabilities_rank: opt(row, "avoids_vulnerabilities_rank")?,
            increase_impact_rank: opt(row, "increase_impact_rank")?,
        })
    }
}

impl Decode for PackageRecord {
    const TABLE: Table = Table::Package;
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "purl",
        "type",
        "namespace",
        "name",
        "version",
        "number_versions_behind_head",
        "number_major_versions_behind_head",
        "number_minor_versions_behind_head",
        "number_patch_versions_behind_head",
        "most_recent_version",
        "most_recent_version_published_at",
        "this_version_published_at",
        "updated_at",
    ];

    fn decode(row: &QueryResult) -> SieveResult<Self> {
        Ok(Self {
            id: get(row, "id")?,
            purl: opt(row, "purl")?,
            kind: opt(row, "type")?,
            namespace: opt(row, "namespace")?,
            name: opt(row, "name")?,
            version: opt(row, "version")?,
            number_versions_behind_head: or_default(row, "number_versions_behind_head")?,
            number_major_versions_behind_head: or_default(
                row,
                "number_major_versions_behind_head",
            )?,
            number_minor_versions_behind_head: or_default(
                row,
                "number_minor_versions_behind_head",
            )?,
            number_patch_versions_behind_head: or_default(
                row,
                "number_patch_versions_behind_head",
            )?,
            most_recent_version: opt(row, "most_recent_version")?,
            most_recent_version_published_at: opt(row, "most_recent_version_published_at")?,
            this_version_published_at: opt(row, "this_version_published_at")?,
            updated_at: opt(row, "updated_at")?,
        })
    }
}

impl Decode for FindingRecord {
    const TABLE: Table = Table::Finding;
    // finding_data columns are selected through the join in the executor
    const COLUMNS: &'static [&'static str] = &["id", "identifier"];

    fn decode(row: &QueryResult) -> SieveResult<Self> {
        Ok(Self {
            id: get(row, "id")?,
            identifier: opt(row, "identifier")?,
            data_id: opt(row, "data_id")?,
            severity: opt(row, "severity")?,
            description: opt(row, "description")?,
            cpes: array(row, "cpes")?,
            reported_at: opt(row, "reported_at")?,
            published_at: opt(row, "published_at")?,
            patched_in: array(row, "patched_in")?,
        })
    }
}

pub const FINDING_DATA_JOIN_COLUMNS: &[&str] = &[
    "severity",
    "description",
    "cpes",
    "reported_at",
    "published_at",
    "patched_in",
];

impl Decode for FindingDataRecord {
    const TABLE: Table = Table::FindingData;
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "finding_id",
        "identifier",
        "severity",
        "description",
        "cpes",
        "reported_at",
        "published_at",
        "patched_in",
    ];

    fn decode(row: &QueryResult) -> SieveResult<Self> {
        Ok(Self {
            id: get(row, "id")?,
            finding_id: opt(row, "finding_id")?,
            identifier: opt(row, "identifier")?,
            severity: opt(row, "severity")?,
            description: opt(row, "description")?,
            cpes: array(row, "cpes")?,
            reported_at: opt(row, "reported_at")?,
            published_at: opt(row, "published_at")?,
            patched_in: array(row, "patched_in")?,
        })
    }
}

impl Decode for FindingReporterRecord {
    const TABLE: Table = Table::FindingReporter;
    const COLUMNS: &'static [&'static str] = &["id", "name"];

    fn decode(row: &QueryResult) -> SieveResult<Self> {
        Ok(Self {
            id: get(row, "id")?,
            name: opt(row, "name")?,
        })
    }
}

const DATASOURCE_METRICS_COLUMNS: &[&str] = &[
    "id",
    "datasource_event_count",
    "commit_date_time",
    "event_date_time",
    "txid",
    "job_id",
    "purl",
    "total_findings",
    "critical_findings",
    "high_findings",
    "medium_findings",
    "low_findings",
    "packages",
    "packages_with_findings",
    "downlevel_packages",
    "stale_packages",
    "patches",
];

pub fn datasource_metrics_columns(table: Table) -> Vec<&'static str> {
    let mut columns = DATASOURCE_METRICS_COLUMNS.to_vec();
    if table == Table::DatasourceMetrics {
        columns.push("patch_efficacy_score");
    }
    columns
}

pub fn decode_datasource_metrics(
    row: &QueryResult,
    table: Table,
) -> SieveResult<DatasourceMetricsRecord> {
    let patch_efficacy_score = if table == Table::DatasourceMetrics {
        Some(or_default(row, "patch_efficacy_score")?)
    } else {
        None
    };
    Ok(DatasourceMetricsRecord {
        id: get(row, "id")?,
        datasource_event_count: or_default(row, "datasource_event_count")?,
        commit_date_time: opt(row, "commit_date_time")?,
        event_date_time: opt(row, "event_date_time")?,
        txid: opt(row, "txid")?,
        job_id: opt(row, "job_id")?,
        purl: opt(row, "purl")?,
        total_findings: or_default(row, "total_findings")?,
        critical_findings: or_default(row, "critical_findings")?,
        high_findings: or_default(row, "high_findings")?,
        medium_findings: or_default(row, "medium_findings")?,
        low_findings: or_default(row, "low_findings")?,
        packages: or_default(row, "packages")?,
        packages_with_findings: or_default(row, "packages_with_findings")?,
        downlevel_packages: or_default(row, "downlevel_packages")?,
        stale_packages: or_default(row, "stale_packages")?,
        patches: or_default(row, "patches")?,
        patch_efficacy_score,
    })
}
