#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::Path;

use patchfox_sieve_store::{Decode, SieveConfig, SieveResult, SieveStore};
use sea_orm::{ConnectionTrait, Value};
use time::OffsetDateTime;

const SCHEMA: &str = r#"
CREATE TABLE dataset (
    id INTEGER PRIMARY KEY, latest_txid BLOB, latest_job_id BLOB, name TEXT,
    updated_at TEXT, status TEXT
);
CREATE TABLE datasource (
    id INTEGER PRIMARY KEY, latest_txid BLOB, latest_job_id BLOB, purl TEXT, domain TEXT,
    name TEXT, commit_branch TEXT, type TEXT, number_events_received REAL,
    number_event_processing_errors REAL, first_event_received_at TEXT,
    last_event_received_at TEXT, last_event_received_status TEXT, status TEXT
);
CREATE TABLE datasource_dataset (datasource_id INTEGER, dataset_id INTEGER);
CREATE TABLE datasource_event (
    id INTEGER PRIMARY KEY, purl TEXT, txid BLOB, job_id BLOB, commit_hash TEXT,
    commit_branch TEXT, commit_date_time TEXT, event_date_time TEXT, status TEXT,
    processing_error TEXT, oss_enriched BOOLEAN, package_index_enriched BOOLEAN,
    analyzed BOOLEAN, forecasted BOOLEAN, recommended BOOLEAN, datasource_id INTEGER,
    payload BLOB
);
CREATE TABLE datasource_event_package (datasource_event_id INTEGER, package_id INTEGER);
CREATE TABLE dataset_metrics (
    id INTEGER PRIMARY KEY, dataset_id INTEGER, txid BLOB, job_id BLOB,
    commit_date_time TEXT, event_date_time TEXT, forecast_maturity_date TEXT,
    datasource_count INTEGER, datasource_event_count INTEGER, is_current BOOLEAN,
    is_forecast_same_course BOOLEAN, is_forecast_recommendations_taken BOOLEAN,
    recommendation_type TEXT, recommendation_headline TEXT, rps_score REAL,
    total_findings INTEGER, critical_findings INTEGER, high_findings INTEGER,
    medium_findings INTEGER, low_findings INTEGER, packages INTEGER,
    packages_with_findings INTEGER, downlevel_packages INTEGER, stale_packages INTEGER,
    patches INTEGER, patch_efficacy_score REAL, patch_impact REAL, patch_effort REAL,
    package_indexes TEXT
);
CREATE TABLE edit (
    id INTEGER PRIMARY KEY, dataset_metrics_id INTEGER, datasource_id INTEGER,
    commit_date_time TEXT, event_date_time TEXT, edit_type TEXT, before TEXT, after TEXT,
    is_same_edit BOOLEAN, same_edit_count INTEGER, is_pf_recommended_edit BOOLEAN,
    is_user_edit BOOLEAN, critical_findings INTEGER, high_findings INTEGER,
    medium_findings INTEGER, low_findings INTEGER, reduce_cves_index INTEGER,
    reduce_cve_growth_index INTEGER, reduce_cve_backlog_index INTEGER,
    reduce_cve_backlog_growth_index INTEGER, reduce_stale_packages_index INTEGER,
    reduce_stale_packages_growth_index INTEGER, reduce_downlevel_packages_index INTEGER,
    reduce_downlevel_packages_growth_index INTEGER, grow_patch_efficacy_index INTEGER,
    remove_redundant_packages_index INTEGER, decrease_backlog_rank INTEGER,
    decrease_vulnerability_count_rank INTEGER, avoids_vulnerabilities_rank INTEGER,
    increase_impact_rank INTEGER
);
CREATE TABLE package (
    id INTEGER PRIMARY KEY, purl TEXT, type TEXT, namespace TEXT, name TEXT, version TEXT,
    number_versions_behind_head INTEGER, number_major_versions_behind_head INTEGER,
    number_minor_versions_behind_head INTEGER, number_patch_versions_behind_head INTEGER,
    most_recent_version TEXT, most_recent_version_published_at TEXT,
    this_version_published_at TEXT, updated_at TEXT
);
CREATE TABLE finding (id INTEGER PRIMARY KEY, identifier TEXT);
CREATE TABLE finding_data (
    id INTEGER PRIMARY KEY, finding_id INTEGER, identifier TEXT, severity TEXT,
    description TEXT, cpes TEXT, reported_at TEXT, published_at TEXT, patched_in TEXT
);
CREATE TABLE package_finding (package_id INTEGER, finding_id INTEGER);
CREATE TABLE finding_reporter (id INTEGER PRIMARY KEY, name TEXT);
CREATE TABLE datasource_metrics (
    id INTEGER PRIMARY KEY, datasource_event_count INTEGER, commit_date_time TEXT,
    event_date_time TEXT, txid BLOB, job_id BLOB, purl TEXT, total_findings INTEGER,
    critical_findings INTEGER, high_findings INTEGER, medium_findings INTEGER,
    low_findings INTEGER, packages INTEGER, packages_with_findings INTEGER,
    downlevel_packages INTEGER, stale_packages INTEGER, patches INTEGER,
    patch_efficacy_score REAL
);
CREATE TABLE datasource_metrics_current (
    id INTEGER PRIMARY KEY, datasource_event_count INTEGER, commit_date_time TEXT,
    event_date_time TEXT, txid BLOB, job_id BLOB, purl TEXT, total_findings INTEGER,
    critical_findings INTEGER, high_findings INTEGER, medium_findings INTEGER,
    low_findings INTEGER, packages INTEGER, packages_with_findings INTEGER,
    downlevel_packages INTEGER, stale_packages INTEGER, patches INTEGER
)
"#;

const SEED: &str = r#"
INSERT INTO dataset (id, name, status) VALUES (1, 'acme', 'READY'), (2, 'globex', 'READY');
INSERT INTO datasource (id, purl, name, type, number_events_received, status) VALUES
    (10, 'pkg:github/acme/api@main', 'api', 'GIT', 4, 'READY'),
    (11, 'pkg:github/acme/web@main', 'web', 'GIT', 2, 'READY'),
    (12, 'pkg:github/globex/core@main', 'core', 'GIT', 1, 'READY');
INSERT INTO datasource_dataset (datasource_id, dataset_id) VALUES (10, 1), (11, 1), (12, 2);
INSERT INTO dataset_metrics (id, dataset_id, commit_date_time, is_current, rps_score,
    total_findings, packages, package_indexes) VALUES
    (100, 1, '2024-01-01T00:00:00Z', 0, 1.5, 2, 3, '[1, 2]'),
    (101, 1, '2024-02-01T00:00:00Z', 1, 2.5, 4, 5, '[3, 1, 3, 4, 1]'),
    (102, 2, '2024-03-01T00:00:00Z', 1, 0.5, 0, 1, '[5]');
INSERT INTO edit (id, dataset_metrics_id, datasource_id, edit_type, before, after,
    is_same_edit, same_edit_count, is_pf_recommended_edit, is_user_edit) VALUES
    (1000, 100, 10, 'UPDATE', 'pkg:npm/lodash@4.17.20', 'pkg:npm/lodash@4.17.21', 0, 0, 0, 1),
    (1001, 101, 10, 'UPDATE', 'pkg:npm/axios@0.21.0', 'pkg:npm/axios@1.6.0', 0, 0, 1, 0),
    (1002, 101, 11, 'DELETE', 'pkg:npm/left-pad@1.3.0', NULL, 0, 0, 0, 1),
    (1003, 102, 12, 'CREATE', NULL, 'pkg:maven/org.slf4j/slf4j-api@2.0.9', 0, 0, 0, 1);
INSERT INTO package (id, purl, type, namespace, name, version, number_versions_behind_head)
    VALUES
    (1, 'pkg:npm/lodash@4.17.21', 'npm', NULL, 'lodash', '4.17.21', 0),
    (2, 'pkg:npm/axios@1.6.0', 'npm', NULL, 'axios', '1.6.0', 2),
    (3, 'pkg:npm/Lodash-ES@4.17.21', 'npm', NULL, 'Lodash-ES', '4.17.21', 1),
    (4, 'pkg:maven/org.slf4j/slf4j-api@2.0.9', 'maven', 'org.slf4j', 'slf4j-api', '2.0.9', 3),
    (5, 'pkg:pypi/requests@2.31.0', 'pypi', NULL, 'requests', '2.31.0', 0);
INSERT INTO finding (id, identifier) VALUES (50, 'CVE-2021-23337'), (51, 'CVE-2023-45857'),
    (52, 'CVE-2023-32681');
INSERT INTO finding_data (id, finding_id, identifier, severity, description, cpes, patched_in)
    VALUES
    (500, 50, 'CVE-2021-23337', 'HIGH', 'command injection', '["cpe:2.3:a:lodash:lodash"]',
        '["4.17.21"]'),
    (501, 51, 'CVE-2023-45857', 'MEDIUM', 'token exposure', NULL, '["1.6.0"]');
INSERT INTO package_finding (package_id, finding_id) VALUES (1, 50), (3, 50), (2, 51), (5, 52);
INSERT INTO finding_reporter (id, name) VALUES (1, 'OSV'), (2, 'GHSA');
INSERT INTO datasource_metrics (id, datasource_event_count, purl, total_findings, packages,
    patch_efficacy_score) VALUES (7, 3, 'pkg:github/acme/api@main', 2, 4, 0.75);
INSERT INTO datasource_metrics_current (id, datasource_event_count, purl, total_findings,
    packages) VALUES (8, 3, 'pkg:github/acme/api@main', 2, 4)
"#;

pub async fn seeded_store(base: &Path) -> SieveResult<SieveStore> {
    let config = SieveConfig::default_sqlite(base.join("sieve.sqlite").to_string_lossy());
    let store = SieveStore::connect(&config, base).await?;
    run_script(&store, SCHEMA).await?;
    run_script(&store, SEED).await?;
    Ok(store)
}

async fn run_script(store: &SieveStore, script: &str) -> SieveResult<()> {
    for statement in script.split(';') {
        if statement.trim().is_empty() {
            continue;
        }
        store.connection().execute_unprepared(statement).await?;
    }
    Ok(())
}

pub type MockRow = BTreeMap<&'static str, Value>;

pub fn count(total: i64) -> Vec<MockRow> {
    vec![BTreeMap::from([("total", Value::from(total))])]
}

fn null_time() -> Value {
    Value::from(None::<OffsetDateTime>)
}

fn null_text() -> Value {
    Value::from(None::<String>)
}

fn null_uuid() -> Value {
    Value::from(None::<uuid::Uuid>)
}

// Every selected column of `T` present, so decoding never trips over a missing key.
fn blank_row<T: Decode>() -> MockRow {
    T::COLUMNS.iter().map(|column| (*column, null_text())).collect()
}

pub fn dataset_metrics_row(
    id: i64,
    commit_date_time: OffsetDateTime,
    package_indexes: &[i64],
) -> MockRow {
    let mut row = blank_row::<patchfox_sieve_store::DatasetMetricsRecord>();
    row.insert("id", Value::from(id));
    row.insert("dataset_id", Value::from(1i64));
    row.insert("txid", null_uuid());
    row.insert("job_id", null_uuid());
    row.insert("commit_date_time", Value::from(commit_date_time));
    row.insert("event_date_time", null_time());
    row.insert("forecast_maturity_date", null_time());
    for column in [
        "datasource_count",
        "datasource_event_count",
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
    ] {
        row.insert(column, Value::from(0i64));
    }
    for column in [
        "is_current",
        "is_forecast_same_course",
        "is_forecast_recommendations_taken",
    ] {
        row.insert(column, Value::from(false));
    }
    for column in ["rps_score", "patch_efficacy_score", "patch_impact", "patch_effort"] {
        row.insert(column, Value::from(0.0f64));
    }
    let indexes = serde_json::to_string(package_indexes).unwrap_or_default();
    row.insert("package_indexes", Value::from(indexes));
    row
}

pub fn edit_row(id: i64, dataset_metrics_id: i64) -> MockRow {
    let mut row = blank_row::<patchfox_sieve_store::EditRecord>();
    row.insert("id", Value::from(id));
    row.insert("dataset_metrics_id", Value::from(dataset_metrics_id));
    row.insert("datasource_id", Value::from(10i64));
    row.insert("commit_date_time", null_time());
    row.insert("event_date_time", null_time());
    for column in ["is_same_edit", "is_pf_recommended_edit", "is_user_edit"] {
        row.insert(column, Value::from(false));
    }
    for column in patchfox_sieve_store::EditRecord::COLUMNS
        .iter()
        .copied()
        .filter(|column| column.ends_with("_findings") || column.ends_with("_index"))
        .chain(["same_edit_count", "decrease_backlog_rank"])
        .chain([
            "decrease_vulnerability_count_rank",
            "avoids_vulnerabilities_rank",
            "increase_impact_rank",
        ])
    {
        row.insert(column, Value::from(None::<i32>));
    }
    row.insert("same_edit_count", Value::from(0i32));
    row
}

pub fn package_row(id: i64, purl: &str) -> MockRow {
    let mut row = blank_row::<patchfox_sieve_store::PackageRecord>();
    row.insert("id", Value::from(id));
    row.insert("purl", Value::from(purl.to_string()));
    for column in [
        "number_versions_behind_head",
        "number_major_versions_behind_head",
        "number_minor_versions_behind_head",
        "number_patch_versions_behind_head",
    ] {
        row.insert(column, Value::from(0i32));
    }
    for column in [
        "most_recent_version_published_at",
        "this_version_published_at",
        "updated_at",
    ] {
        row.insert(column, null_time());
    }
    row
}

pub fn finding_row(id: i64, identifier: &str) -> MockRow {
    let mut row = BTreeMap::from([
        ("id", Value::from(id)),
        ("identifier", Value::from(identifier.to_string())),
        ("data_id", Value::from(None::<i64>)),
        ("reported_at", null_time()),
        ("published_at", null_time()),
    ]);
    for column in ["severity", "description", "cpes", "patched_in"] {
        row.insert(column, null_text());
    }
    row
}

pub fn datasource_event_row(id: i64, commit_date_time: OffsetDateTime) -> MockRow {
    let mut row = blank_row::<patchfox_sieve_store::DatasourceEventRecord>();
    row.insert("id", Value::from(id));
    row.insert("txid", null_uuid());
    row.insert("job_id", null_uuid());
    row.insert("commit_date_time", Value::from(commit_date_time));
    row.insert("event_date_time", null_time());
    for column in [
        "oss_enriched",
        "package_index_enriched",
        "analyzed",
        "forecasted",
        "recommended",
    ] {
        row.insert(column, Value::from(true));
    }
    row.insert("datasource_id", Value::from(10i64));
    row
}

pub fn datasource_edit_row(
    edit_id: i64,
    dataset_metrics_id: i64,
    commit_date_time: OffsetDateTime,
    datasource_purl: &str,
) -> MockRow {
    BTreeMap::from([
        ("edit_id", Value::from(edit_id)),
        ("dataset_metrics_id", Value::from(dataset_metrics_id)),
        ("commit_date_time", Value::from(Some(commit_date_time))),
        ("datasource_purl", Value::from(Some(datasource_purl.to_string()))),
    ])
}

pub fn single(column: &'static str, value: impl Into<Value>) -> MockRow {
    BTreeMap::from([(column, value.into())])
}
