use serde::{Deserialize, Serialize};

use self::FieldType::*;
use crate::{SieveError, SieveResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Table {
    Dataset,
    Datasource,
    DatasourceEvent,
    DatasetMetrics,
    Edit,
    Package,
    Finding,
    FindingData,
    FindingReporter,
    DatasourceMetrics,
    DatasourceMetricsCurrent,
}

impl Table {
    pub const ALL: [Table; 11] = [
        Table::Dataset,
        Table::Datasource,
        Table::DatasourceEvent,
        Table::DatasetMetrics,
        Table::Edit,
        Table::Package,
        Table::Finding,
        Table::FindingData,
        Table::FindingReporter,
        Table::DatasourceMetrics,
        Table::DatasourceMetricsCurrent,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Table::Dataset => "dataset",
            Table::Datasource => "datasource",
            Table::DatasourceEvent => "datasourceEvent",
            Table::DatasetMetrics => "datasetMetrics",
            Table::Edit => "edit",
            Table::Package => "package",
            Table::Finding => "finding",
            Table::FindingData => "findingData",
            Table::FindingReporter => "findingReporter",
            Table::DatasourceMetrics => "datasourceMetrics",
            Table::DatasourceMetricsCurrent => "datasourceMetricsCurrent",
        }
    }

    pub fn from_name(name: &str) -> Option<Table> {
        let name = name.trim();
        Table::ALL
            .into_iter()
            .find(|table| table.as_str().eq_ignore_ascii_case(name))
    }

    pub fn descriptor(self) -> &'static EntityDescriptor {
        match self {
            Table::Dataset => &DATASET,
            Table::Datasource => &DATASOURCE,
            Table::DatasourceEvent => &DATASOURCE_EVENT,
            Table::DatasetMetrics => &DATASET_METRICS,
            Table::Edit => &EDIT,
            Table::Package => &PACKAGE,
            Table::Finding => &FINDING,
            Table::FindingData => &FINDING_DATA,
            Table::FindingReporter => &FINDING_REPORTER,
            Table::DatasourceMetrics => &DATASOURCE_METRICS,
            Table::DatasourceMetricsCurrent => &DATASOURCE_METRICS_CURRENT,
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldType {
    Str,
    Int,
    Long,
    Double,
    Bool,
    Timestamp,
    Uuid,
    Enum,
}

#[derive(Clone, Copy, Debug)]
pub struct FieldDef {
    pub name: &'static str,
    pub column: &'static str,
    pub field_type: FieldType,
}

#[derive(Debug)]
pub struct EntityDescriptor {
    pub table: Table,
    pub table_name: &'static str,
    pub alias: Option<&'static str>,
    pub fields: &'static [FieldDef],
}

impl EntityDescriptor {
    pub fn field(&self, name: &str) -> Option<&'static FieldDef> {
        if is_nested(name) {
            return None;
        }
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&'static str> {
        self.field(name).map(|field| field.column)
    }

    pub fn qualifier(&self) -> &'static str {
        self.alias.unwrap_or(self.table_name)
    }
}

pub fn descriptor(table_name: &str) -> SieveResult<&'static EntityDescriptor> {
    Table::from_name(table_name)
        .map(Table::descriptor)
        .ok_or_else(|| SieveError::unknown_table(table_name))
}

pub fn is_nested(name: &str) -> bool {
    name.contains('.')
}

const fn f(name: &'static str, column: &'static str, field_type: FieldType) -> FieldDef {
    FieldDef {
        name,
        column,
        field_type,
    }
}

static DATASET: EntityDescriptor = EntityDescriptor {
    table: Table::Dataset,
    table_name: "dataset",
    alias: None,
    fields: &[
        f("id", "id", Long),
        f("latestTxid", "latest_txid", Uuid),
        f("latestJobId", "latest_job_id", Uuid),
        f("name", "name", Str),
        f("updatedAt", "updated_at", Timestamp),
        f("status", "status", Enum),
    ],
};

// edits and package indexes stay out of reach
static DATASOURCE: EntityDescriptor = EntityDescriptor {
    table: Table::Datasource,
    table_name: "datasource",
    alias: None,
    fields: &[
        f("id", "id", Long),
        f("latestTxid", "latest_txid", Uuid),
        f("latestJobId", "latest_job_id", Uuid),
        f("purl", "purl", Str),
        f("domain", "domain", Str),
        f("name", "name", Str),
        f("commitBranch", "commit_branch", Str),
        f("type", "type", Enum),
        f("numberEventsReceived", "number_events_received", Double),
        f(
            "numberEventProcessingErrors",
            "number_event_processing_errors",
            Double,
        ),
        f("firstEventReceivedAt", "first_event_received_at", Timestamp),
        f("lastEventReceivedAt", "last_event_received_at", Timestamp),
        f("lastEventReceivedStatus", "last_event_received_status", Str),
        f("status", "status", Enum),
    ],
};

static DATASOURCE_EVENT: EntityDescriptor = EntityDescriptor {
    table: Table::DatasourceEvent,
    table_name: "datasource_event",
    alias: None,
    fields: &[
        f("id", "id", Long),
        f("purl", "purl", Str),
        f("txid", "txid", Uuid),
        f("jobId", "job_id", Uuid),
        f("commitHash", "commit_hash", Str),
        f("commitBranch", "commit_branch", Str),
        f("commitDateTime", "commit_date_time", Timestamp),
        f("eventDateTime", "event_date_time", Timestamp),
        f("status", "status", Enum),
        f("processingError", "processing_error", Str),
        f("ossEnriched", "oss_enriched", Bool),
        f("packageIndexEnriched", "package_index_enriched", Bool),
        f("analyzed", "analyzed", Bool),
        f("forecasted", "forecasted", Bool),
        f("recommended", "recommended", Bool),
        f("datasourceId", "datasource_id", Long),
    ],
};

static DATASET_METRICS: EntityDescriptor = EntityDescriptor {
    table: Table::DatasetMetrics,
    table_name: "dataset_metrics",
    alias: Some("dm"),
    fields: &[
        f("id", "id", Long),
        f("datasetId", "dataset_id", Long),
        f("txid", "txid", Uuid),
        f("jobId", "job_id", Uuid),
        f("commitDateTime", "commit_date_time", Timestamp),
        f("eventDateTime", "event_date_time", Timestamp),
        f("forecastMaturityDate", "forecast_maturity_date", Timestamp),
        f("datasourceCount", "datasource_count", Long),
        f("datasourceEventCount", "datasource_event_count", Long),
        f("isCurrent", "is_current", Bool),
        f("isForecastSameCourse", "is_forecast_same_course", Bool),
        f(
            "isForecastRecommendationsTaken",
            "is_forecast_recommendations_taken",
            Bool,
        ),
        f("recommendationType", "recommendation_type", Enum),
        f("recommendationHeadline", "recommendation_headline", Str),
        f("rpsScore", "rps_score", Double),
    ],
};

static EDIT: EntityDescriptor = EntityDescriptor {
    table: Table::Edit,
    table_name: "edit",
    alias: None,
    fields: &[
        f("id", "id", Long),
        f("datasetMetricsId", "dataset_metrics_id", Long),
        f("datasourceId", "datasource_id", Long),
        f("commitDateTime", "commit_date_time", Timestamp),
        f("eventDateTime", "event_date_time", Timestamp),
        f("editType", "edit_type", Enum),
        f("before", "before", Str),
        f("after", "after", Str),
        f("isSameEdit", "is_same_edit", Bool),
        f("sameEditCount", "same_edit_count", Int),
        f("isPfRecommendedEdit", "is_pf_recommended_edit", Bool),
        f("isUserEdit", "is_user_edit", Bool),
    ],
};

// findings and datasource events are the cascade edges, so they are not listed
static PACKAGE: EntityDescriptor = EntityDescriptor {
    table: Table::Package,
    table_name: "package",
    alias: None,
    fields: &[
        f("id", "id", Long),
        f("purl", "purl", Str),
        f("type", "type", Str),
        f("namespace", "namespace", Str),
        f("name", "name", Str),
        f("version", "version", Str),
        f("numberVersionsBehindHead", "number_versions_behind_head", Int),
        f(
            "numberMajorVersionsBehindHead",
            "number_major_versions_behind_head",
            Int,
        ),
        f(
            "numberMinorVersionsBehindHead",
            "number_minor_versions_behind_head",
            Int,
        ),
        f(
            "numberPatchVersionsBehindHead",
            "number_patch_versions_behind_head",
            Int,
        ),
        f("mostRecentVersion", "most_recent_version", Str),
        f(
            "mostRecentVersionPublishedAt",
            "most_recent_version_published_at",
            Timestamp,
        ),
        f("thisVersionPublishedAt", "this_version_published_at", Timestamp),
        f("updatedAt", "updated_at", Timestamp),
    ],
};

static FINDING: EntityDescriptor = EntityDescriptor {
    table: Table::Finding,
    table_name: "finding",
    alias: Some("f"),
    fields: &[f("id", "id", Long), f("identifier", "identifier", Str)],
};

static FINDING_DATA: EntityDescriptor = EntityDescriptor {
    table: Table::FindingData,
    table_name: "finding_data",
    alias: None,
    fields: &[
        f("id", "id", Long),
        f("findingId", "finding_id", Long),
        f("identifier", "identifier", Str),
        f("severity", "severity", Enum),
        f("description", "description", Str),
        f("reportedAt", "reported_at", Timestamp),
        f("publishedAt", "published_at", Timestamp),
    ],
};

static FINDING_REPORTER: EntityDescriptor = EntityDescriptor {
    table: Table::FindingReporter,
    table_name: "finding_reporter",
    alias: None,
    fields: &[f("id", "id", Long), f("name", "name", Str)],
};

static DATASOURCE_METRICS: EntityDescriptor = EntityDescriptor {
    table: Table::DatasourceMetrics,
    table_name: "datasource_metrics",
    alias: None,
    fields: &[
        f("id", "id", Long),
        f("datasourceEventCount", "datasource_event_count", Long),
        f("commitDateTime", "commit_date_time", Timestamp),
        f("eventDateTime", "event_date_time", Timestamp),
        f("txid", "txid", Uuid),
        f("jobId", "job_id", Uuid),
        f("purl", "purl", Str),
        f("totalFindings", "total_findings", Long),
        f("criticalFindings", "critical_findings", Long),
        f("highFindings", "high_findings", Long),
        f("mediumFindings", "medium_findings", Long),
        f("lowFindings", "low_findings", Long),
        f("packages", "packages", Long),
        f("packagesWithFindings", "packages_with_findings", Long),
        f("downlevelPackages", "downlevel_packages", Long),
        f("stalePackages", "stale_packages", Long),
        f("patches", "patches", Long),
        f("patchEfficacyScore", "patch_efficacy_score", Double),
    ],
};

static DATASOURCE_METRICS_CURRENT: EntityDescriptor = EntityDescriptor {
    table: Table::DatasourceMetricsCurrent,
    table_name: "datasource_metrics_current",
    alias: None,
    fields: &[
        f("id", "id", Long),
        f("datasourceEventCount", "datasource_event_count", Long),
        f("commitDateTime", "commit_date_time", Timestamp),
        f("eventDateTime", "event_date_time", Timestamp),
        f("txid", "txid", Uuid),
        f("jobId", "job_id", Uuid),
        f("purl", "purl", Str),
        f("totalFindings", "total_findings", Long),
        f("criticalFindings", "critical_findings", Long),
        f("highFindings", "high_findings", Long),
        f("mediumFindings", "medium_findings", Long),
        f("lowFindings", "low_findings", Long),
        f("packages", "packages", Long),
        f("packagesWithFindings", "packages_with_findings", Long),
        f("downlevelPackages", "downlevel_packages", Long),
        f("stalePackages", "stale_packages", Long),
        f("patches", "patches", Long),
    ],
};
