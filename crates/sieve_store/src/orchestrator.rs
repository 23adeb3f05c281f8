use std::collections::HashSet;

use log::{debug, info};
use sea_orm::ConnectionTrait;

use patchfox_sieve_core::params::{
    COMMIT_DATE_TIME_KEY, DATASET_NAME_FIELD, DATASET_NAME_KEY, DATASOURCES_PURL_KEY,
    IS_CURRENT_KEY, IS_FORECAST_RECOMMENDATIONS_TAKEN_KEY, IS_FORECAST_SAME_COURSE_KEY,
    split_list,
};
use patchfox_sieve_core::{
    DatasetMetricsRecord, DatasourceEventRecord, EditRecord, FilterParams, FindingRecord, KeySet,
    Multiset, PackageRecord, PageRequest, PageResult, SieveError, SieveResult, SortOrder,
    paginate_multiset,
};

use crate::executor::{Executor, KeyScope};
use crate::lookups::DatasourceEdit;

const NO_MATCH_ID: i64 = -1;
const ANCHOR_FLAG_KEYS: [&str; 3] = [
    IS_CURRENT_KEY,
    IS_FORECAST_SAME_COURSE_KEY,
    IS_FORECAST_RECOMMENDATIONS_TAKEN_KEY,
];

#[derive(Clone, Debug, PartialEq)]
pub struct AnchorQuery {
    pub params: FilterParams,
    pub pinned: bool,
}

// A composite request split into its anchor scope and the filters meant for the target table.
#[derive(Clone, Debug)]
pub struct StagedRequest {
    pub anchor: Option<AnchorQuery>,
    pub datasource_purls: Option<Vec<String>>,
    pub params: FilterParams,
    pub page: PageRequest,
}

impl StagedRequest {
    pub fn split(mut params: FilterParams, page: PageRequest) -> SieveResult<Self> {
        let page = page.apply_params(&mut params)?;
        let anchor = take_anchor(&mut params);
        let datasource_purls = params
            .remove(DATASOURCES_PURL_KEY)
            .map(|raw| {
                split_list(&raw)
                    .into_iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
            })
            .filter(|purls| !purls.is_empty());
        params.strip_reserved();
        Ok(Self {
            anchor,
            datasource_purls,
            params,
            page,
        })
    }
}

fn take_anchor(params: &mut FilterParams) -> Option<AnchorQuery> {
    let short = params.remove(DATASET_NAME_KEY);
    let dotted = params.remove(DATASET_NAME_FIELD);
    let commit = params.remove(COMMIT_DATE_TIME_KEY);
    let flags = ANCHOR_FLAG_KEYS
        .iter()
        .filter_map(|key| params.remove(key).map(|value| (*key, value)))
        .collect::<Vec<_>>();
    let name = [short, dotted]
        .into_iter()
        .flatten()
        .find(|name| !name.trim().is_empty())?;

    let mut anchor = FilterParams::new();
    anchor.insert(DATASET_NAME_FIELD, name);
    let pinned = match commit {
        Some(commit) if !commit.trim().is_empty() => {
            anchor.insert(COMMIT_DATE_TIME_KEY, commit);
            true
        }
        _ => false,
    };
    for (key, value) in flags {
        anchor.insert(key, value);
    }
    Some(AnchorQuery {
        params: anchor,
        pinned,
    })
}

pub struct Orchestrator<'a, C> {
    exec: Executor<'a, C>,
}

impl<'a, C> Orchestrator<'a, C>
where
    C: ConnectionTrait,
{
    pub fn new(exec: Executor<'a, C>) -> Self {
        Self { exec }
    }

    pub async fn dataset_metrics_edits(
        &self,
        params: FilterParams,
        page: PageRequest,
    ) -> SieveResult<PageResult<EditRecord>> {
        let staged = StagedRequest::split(params, page)?;
        let anchors = self.scoped_anchors(&staged).await?;
        if anchors.is_empty() {
            return Ok(PageResult::empty(&staged.page));
        }
        let dataset_metrics_ids = KeySet::collect(anchors.iter().map(|row| row.id));
        let edit_ids = self
            .exec
            .edit_ids_for_dataset_metrics(&dataset_metrics_ids)
            .await?;
        info!(
            "sieve: {} anchor rows reference {} edits",
            dataset_metrics_ids.len(),
            edit_ids.len()
        );
        if edit_ids.is_empty() {
            return Ok(PageResult::empty(&staged.page));
        }
        self.exec
            .query_scoped::<EditRecord>(&staged.params, &KeyScope::Ids(edit_ids), &staged.page)
            .await
    }

    pub async fn datasource_edits(
        &self,
        params: FilterParams,
        page: PageRequest,
    ) -> SieveResult<PageResult<EditRecord>> {
        let staged = StagedRequest::split(params, page)?;
        let Some(purls) = staged.datasource_purls.as_deref() else {
            debug!("sieve: datasource edits requested without datasource purls");
            return Ok(PageResult::empty(&staged.page));
        };
        let anchors = self.anchors(&staged).await?;
        if anchors.is_empty() {
            return Ok(PageResult::empty(&staged.page));
        }
        let edits = self.datasource_scope(&anchors, purls).await?;
        let mut edit_ids = KeySet::collect(edits.iter().map(|edit| edit.edit_id));
        // no matching edits still runs the target query so the caller gets a well formed page
        if edit_ids.is_empty() {
            edit_ids = KeySet::collect([NO_MATCH_ID]);
        }
        self.exec
            .query_scoped::<EditRecord>(&staged.params, &KeyScope::Ids(edit_ids), &staged.page)
            .await
    }

    pub async fn dataset_metrics_packages(
        &self,
        params: FilterParams,
        page: PageRequest,
    ) -> SieveResult<PageResult<PackageRecord>> {
        let staged = StagedRequest::split(params, page)?;
        let anchors = self.scoped_anchors(&staged).await?;
        let multiset = Multiset::from_occurrences(
            anchors
                .iter()
                .flat_map(|row| row.package_indexes.iter().copied()),
        );
        if multiset.is_empty() {
            return Ok(PageResult::empty(&staged.page));
        }
        let distinct = multiset.distinct();
        info!(
            "sieve: {} package occurrences over {} distinct packages",
            multiset.total(),
            distinct.len()
        );
        let rows = self
            .exec
            .fetch_by_ids::<PackageRecord>(&staged.params, &distinct, &staged.page.sort)
            .await?;
        Ok(paginate_multiset(
            rows,
            |package| package.id,
            &multiset,
            &staged.page,
        ))
    }

    pub async fn dataset_metrics_package_types(
        &self,
        params: FilterParams,
        page: PageRequest,
    ) -> SieveResult<PageResult<PackageRecord>> {
        let staged = StagedRequest::split(params, page)?;
        let anchors = self.scoped_anchors(&staged).await?;
        let package_ids = distinct_package_ids(&anchors);
        if package_ids.is_empty() {
            return Ok(PageResult::empty(&staged.page));
        }
        self.exec
            .query_scoped::<PackageRecord>(
                &staged.params,
                &KeyScope::Ids(package_ids),
                &staged.page,
            )
            .await
    }

    pub async fn dataset_metrics_findings(
        &self,
        params: FilterParams,
        page: PageRequest,
    ) -> SieveResult<PageResult<FindingRecord>> {
        let staged = StagedRequest::split(params, page)?;
        let anchors = self.scoped_anchors(&staged).await?;
        let package_ids = distinct_package_ids(&anchors);
        if package_ids.is_empty() {
            return Ok(PageResult::empty(&staged.page));
        }
        self.exec
            .query_scoped::<FindingRecord>(
                &staged.params,
                &KeyScope::PackageIds(package_ids),
                &staged.page,
            )
            .await
    }

    pub async fn datasource_packages(
        &self,
        params: FilterParams,
        page: PageRequest,
    ) -> SieveResult<PageResult<PackageRecord>> {
        let staged = StagedRequest::split(params, page)?;
        let Some(event_ids) = self.datasource_event_ids(&staged).await? else {
            return Ok(PageResult::empty(&staged.page));
        };
        let purls = self.exec.package_purls_for_events(&event_ids).await?;
        info!(
            "sieve: {} datasource events carry {} package purls",
            event_ids.len(),
            purls.len()
        );
        if purls.is_empty() {
            return Ok(PageResult::empty(&staged.page));
        }
        self.exec
            .query_scoped::<PackageRecord>(&staged.params, &KeyScope::Purls(purls), &staged.page)
            .await
    }

    pub async fn datasource_findings(
        &self,
        params: FilterParams,
        page: PageRequest,
    ) -> SieveResult<PageResult<FindingRecord>> {
        let staged = StagedRequest::split(params, page)?;
        let Some(event_ids) = self.datasource_event_ids(&staged).await? else {
            return Ok(PageResult::empty(&staged.page));
        };
        let package_ids = self.exec.package_ids_for_events(&event_ids).await?;
        info!(
            "sieve: {} datasource events carry {} packages",
            event_ids.len(),
            package_ids.len()
        );
        if package_ids.is_empty() {
            return Ok(PageResult::empty(&staged.page));
        }
        self.exec
            .query_scoped::<FindingRecord>(
                &staged.params,
                &KeyScope::PackageIds(package_ids),
                &staged.page,
            )
            .await
    }

    pub async fn anchors(&self, staged: &StagedRequest) -> SieveResult<Vec<DatasetMetricsRecord>> {
        let Some(anchor) = &staged.anchor else {
            debug!("sieve: no dataset name supplied, nothing to anchor on");
            return Ok(Vec::new());
        };
        let sort = vec![SortOrder::desc(COMMIT_DATE_TIME_KEY)];
        if !anchor.pinned {
            let latest = PageRequest::new(0, 1).with_sort(sort);
            let result = self
                .exec
                .query::<DatasetMetricsRecord>(&anchor.params, &latest)
                .await?;
            info!("sieve: anchored on latest of {} rows", result.total_elements);
            return Ok(result.content);
        }

        let size = staged
            .page
            .size
            .unwrap_or(self.exec.limits.anchor_batch_size);
        let max_rows = self.exec.limits.max_anchor_rows;
        let mut rows = Vec::new();
        let mut number = 0;
        loop {
            let batch = PageRequest {
                number,
                size: Some(size),
                sort: sort.clone(),
            };
            let result = self
                .exec
                .query::<DatasetMetricsRecord>(&anchor.params, &batch)
                .await?;
            if result.content.is_empty() {
                break;
            }
            let has_next = result.has_next();
            rows.extend(result.content);
            if rows.len() > max_rows {
                return Err(SieveError::limit(format!(
                    "anchor resolution exceeded {max_rows} rows"
                )));
            }
            if !has_next {
                break;
            }
            number += 1;
        }
        info!("sieve: anchored on {} rows in {} batches", rows.len(), number + 1);
        Ok(rows)
    }

    // Keeps anchors that own at least one edit whose datasource purl matches, returns those edits.
    pub async fn datasource_scope(
        &self,
        anchors: &[DatasetMetricsRecord],
        purls: &[String],
    ) -> SieveResult<Vec<DatasourceEdit>> {
        let dataset_metrics_ids = KeySet::collect(anchors.iter().map(|row| row.id));
        let edits = self
            .exec
            .edits_with_datasource_purl(&dataset_metrics_ids)
            .await?;
        let total = edits.len();
        let matching = edits
            .into_iter()
            .filter(|edit| {
                edit.datasource_purl
                    .as_deref()
                    .is_some_and(|purl| purls.iter().any(|want| purl.contains(want.as_str())))
            })
            .collect::<Vec<_>>();
        info!(
            "sieve: {} of {} edits match datasource purls",
            matching.len(),
            total
        );
        Ok(matching)
    }

    async fn scoped_anchors(
        &self,
        staged: &StagedRequest,
    ) -> SieveResult<Vec<DatasetMetricsRecord>> {
        let anchors = self.anchors(staged).await?;
        let Some(purls) = staged.datasource_purls.as_deref() else {
            return Ok(anchors);
        };
        if anchors.is_empty() {
            return Ok(anchors);
        }
        let edits = self.datasource_scope(&anchors, purls).await?;
        let kept = edits
            .iter()
            .map(|edit| edit.dataset_metrics_id)
            .collect::<HashSet<_>>();
        Ok(anchors
            .into_iter()
            .filter(|row| kept.contains(&row.id))
            .collect())
    }

    // Two hops: matching edit commit times select datasource events for the target lookup.
    async fn datasource_event_ids(
        &self,
        staged: &StagedRequest,
    ) -> SieveResult<Option<KeySet<i64>>> {
        let Some(purls) = staged.datasource_purls.as_deref() else {
            debug!("sieve: datasource scope requested without datasource purls");
            return Ok(None);
        };
        let anchors = self.anchors(staged).await?;
        if anchors.is_empty() {
            return Ok(None);
        }
        let edits = self.datasource_scope(&anchors, purls).await?;
        let commit_times = KeySet::collect(edits.iter().filter_map(|edit| edit.commit_date_time));
        if commit_times.is_empty() {
            return Ok(None);
        }
        let scope = KeyScope::CommitTimes(commit_times);
        let events = self
            .exec
            .query_scoped::<DatasourceEventRecord>(&staged.params, &scope, &staged.page)
            .await?;
        let event_ids = KeySet::collect(events.content.iter().map(|event| event.id));
        info!(
            "sieve: {} commit times matched {} datasource events",
            scope.key_count(),
            events.total_elements
        );
        if event_ids.is_empty() {
            return Ok(None);
        }
        Ok(Some(event_ids))
    }
}

fn distinct_package_ids(anchors: &[DatasetMetricsRecord]) -> KeySet<i64> {
    KeySet::collect(
        anchors
            .iter()
            .flat_map(|row| row.package_indexes.iter().copied()),
    )
}
