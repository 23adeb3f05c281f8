use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::registry::Table;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetRecord {
    pub id: i64,
    pub latest_txid: Option<Uuid>,
    pub latest_job_id: Option<Uuid>,
    pub name: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
    pub status: Option<String>,
    pub datasources: Vec<DatasourceRecord>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasourceRecord {
    pub id: i64,
    pub latest_txid: Option<Uuid>,
    pub latest_job_id: Option<Uuid>,
    pub purl: Option<String>,
    pub domain: Option<String>,
    pub name: Option<String>,
    pub commit_branch: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub number_events_received: f64,
    pub number_event_processing_errors: f64,
    #[serde(with = "time::serde::rfc3339::option")]
    pub first_event_received_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_event_received_at: Option<OffsetDateTime>,
    pub last_event_received_status: Option<String>,
    pub status: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasourceEventRecord {
    pub id: i64,
    pub purl: Option<String>,
    pub txid: Option<Uuid>,
    pub job_id: Option<Uuid>,
    pub commit_hash: Option<String>,
    pub commit_branch: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub commit_date_time: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub event_date_time: Option<OffsetDateTime>,
    pub status: Option<String>,
    pub processing_error: Option<String>,
    pub oss_enriched: bool,
    pub package_index_enriched: bool,
    pub analyzed: bool,
    pub forecasted: bool,
    pub recommended: bool,
    pub datasource_id: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetMetricsRecord {
    pub id: i64,
    pub dataset_id: Option<i64>,
    pub txid: Option<Uuid>,
    pub job_id: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub commit_date_time: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub event_date_time: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub forecast_maturity_date: Option<OffsetDateTime>,
    pub datasource_count: i64,
    pub datasource_event_count: i64,
    pub is_current: bool,
    pub is_forecast_same_course: bool,
    pub is_forecast_recommendations_taken: bool,
    pub recommendation_type: Option<String>,
    pub recommendation_headline: Option<String>,
    pub rps_score: f64,
    pub total_findings: i64,
    pub critical_findings: i64,
    pub high_findings: i64,
    pub medium_findings: i64,
    pub low_findings: i64,
    pub packages: i64,
    pub packages_with_findings: i64,
    pub downlevel_packages: i64,
    pub stale_packages: i64,
    pub patches: i64,
    pub patch_efficacy_score: f64,
    pub patch_impact: f64,
    pub patch_effort: f64,
    pub package_indexes: Vec<i64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditRecord {
    pub id: i64,
    pub dataset_metrics_id: Option<i64>,
    pub datasource_id: Option<i64>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub commit_date_time: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub event_date_time: Option<OffsetDateTime>,
    pub edit_type: Option<String>,
    pub before: Option<String>,
    pub after: Option<String>,
    pub is_same_edit: bool,
    pub same_edit_count: i32,
    pub is_pf_recommended_edit: bool,
    pub is_user_edit: bool,
    pub critical_findings: Option<i32>,
    pub high_findings: Option<i32>,
    pub medium_findings: Option<i32>,
    pub low_findings: Option<i32>,
    pub reduce_cves_index: Option<i32>,
    pub reduce_cve_growth_index: Option<i32>,
    pub reduce_cve_backlog_index: Option<i32>,
    pub reduce_cve_backlog_growth_index: Option<i32>,
    pub reduce_stale_packages_index: Option<i32>,
    pub reduce_stale_packages_growth_index: Option<i32>,
    pub reduce_downlevel_packages_index: Option<i32>,
    pub reduce_downlevel_packages_growth_index: Option<i32>,
    pub grow_patch_efficacy_index: Option<i32>,
    pub remove_redundant_packages_index: Option<i32>,
    pub decrease_backlog_rank: Option<i32>,
    pub decrease_vulnerability_count_rank: Option<i32>,
    pub avoids_vulnerabilities_rank: Option<i32>,
    pub increase_impact_rank: Option<i32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageRecord {
    pub id: i64,
    pub purl: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub namespace: Option<String>,
    pub name: Option<String>,
    pub version: Option<String>,
    pub number_versions_behind_head: i32,
    pub number_major_versions_behind_head: i32,
    pub number_minor_versions_behind_head: i32,
    pub number_patch_versions_behind_head: i32,
    pub most_recent_version: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub most_recent_version_published_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub this_version_published_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindingRecord {
    pub id: i64,
    pub identifier: Option<String>,
    pub data_id: Option<i64>,
    pub severity: Option<String>,
    pub description: Option<String>,
    pub cpes: Vec<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub reported_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    pub patched_in: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindingDataRecord {
    pub id: i64,
    pub finding_id: Option<i64>,
    pub identifier: Option<String>,
    pub severity: Option<String>,
    pub description: Option<String>,
    pub cpes: Vec<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub reported_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    pub patched_in: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindingReporterRecord {
    pub id: i64,
    pub name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasourceMetricsRecord {
    pub id: i64,
    pub datasource_event_count: i64,
    #[serde(with = "time::serde::rfc3339::option")]
    pub commit_date_time: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub event_date_time: Option<OffsetDateTime>,
    pub txid: Option<Uuid>,
    pub job_id: Option<Uuid>,
    pub purl: Option<String>,
    pub total_findings: i64,
    pub critical_findings: i64,
    pub high_findings: i64,
    pub medium_findings: i64,
    pub low_findings: i64,
    pub packages: i64,
    pub packages_with_findings: i64,
    pub downlevel_packages: i64,
    pub stale_packages: i64,
    pub patches: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch_efficacy_score: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Record {
    Dataset(DatasetRecord),
    Datasource(DatasourceRecord),
    DatasourceEvent(DatasourceEventRecord),
    DatasetMetrics(DatasetMetricsRecord),
    Edit(EditRecord),
    Package(PackageRecord),
    Finding(FindingRecord),
    FindingData(FindingDataRecord),
    FindingReporter(FindingReporterRecord),
    DatasourceMetrics(DatasourceMetricsRecord),
    DatasourceMetricsCurrent(DatasourceMetricsRecord),
}

impl Record {
    pub fn table(&self) -> Table {
        match self {
            Record::Dataset(_) => Table::Dataset,
            Record::Datasource(_) => Table::Datasource,
            Record::DatasourceEvent(_) => Table::DatasourceEvent,
            Record::DatasetMetrics(_) => Table::DatasetMetrics,
            Record::Edit(_) => Table::Edit,
            Record::Package(_) => Table::Package,
            Record::Finding(_) => Table::Finding,
            Record::FindingData(_) => Table::FindingData,
            Record::FindingReporter(_) => Table::FindingReporter,
            Record::DatasourceMetrics(_) => Table::DatasourceMetrics,
            Record::DatasourceMetricsCurrent(_) => Table::DatasourceMetricsCurrent,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            Record::Dataset(row) => row.id,
            Record::Datasource(row) => row.id,
            Record::DatasourceEvent(row) => row.id,
            Record::DatasetMetrics(row) => row.id,
            Record::Edit(row) => row.id,
            Record::Package(row) => row.id,
            Record::Finding(row) => row.id,
            Record::FindingData(row) => row.id,
            Record::FindingReporter(row) => row.id,
            Record::DatasourceMetrics(row) | Record::DatasourceMetricsCurrent(row) => row.id,
        }
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::{FindingReporterRecord, PackageRecord, Record};
    use crate::registry::Table;

    #[test]
    fn serializes_camel_case_with_rfc3339_timestamps() {
        let record = PackageRecord {
            id: 3,
            purl: Some("pkg:npm/left-pad@1.3.0".to_string()),
            kind: Some("npm".to_string()),
            namespace: None,
            name: Some("left-pad".to_string()),
            version: Some("1.3.0".to_string()),
            number_versions_behind_head: 0,
            number_major_versions_behind_head: 0,
            number_minor_versions_behind_head: 0,
            number_patch_versions_behind_head: 0,
            most_recent_version: Some("1.3.0".to_string()),
            most_recent_version_published_at: None,
            this_version_published_at: Some(datetime!(2018-04-09 12:00 UTC)),
            updated_at: None,
        };
        let value = serde_json::to_value(&record).expect("json");
        assert_eq!(value["type"], "npm");
        assert_eq!(value["thisVersionPublishedAt"], "2018-04-09T12:00:00Z");
        assert!(value["mostRecentVersionPublishedAt"].is_null());
    }

    #[test]
    fn record_reports_table_and_id() {
        let record = Record::FindingReporter(FindingReporterRecord {
            id: 11,
            name: Some("osv".to_string()),
        });
        assert_eq!(record.table(), Table::FindingReporter);
        assert_eq!(record.id(), 11);
        let value = serde_json::to_value(&record).expect("json");
        assert_eq!(value["name"], "osv");
    }
}
