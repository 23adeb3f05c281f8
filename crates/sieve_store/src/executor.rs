use std::hash::Hash;

use log::{info, warn};
use sea_orm::sea_query::extension::postgres::PgFunc;
use sea_orm::sea_query::{
    Alias, Expr, ExprTrait, JoinType, Order, Query, SelectStatement, Value as SeaValue,
};
use sea_orm::{ConnectionTrait, DatabaseBackend, QueryResult};
use time::OffsetDateTime;

use patchfox_sieve_core::params::{
    COMMIT_DATE_TIME_KEY, DATASET_NAME_FIELD, ID_KEY, PACKAGES_ID_FIELD, PURL_KEY,
};
use patchfox_sieve_core::predicate::{always_false, column_expr, dedup_tokens, eq_or_in};
use patchfox_sieve_core::{
    DatasetMetricsRecord, DatasetRecord, DatasourceEventRecord, DatasourceMetricsRecord,
    DatasourceRecord, EditRecord, EntityDescriptor, FilterParams, FindingDataRecord,
    FindingRecord, FindingReporterRecord, KeySet, PackageRecord, PageRequest, PageResult,
    PredicateBuilder, Record, SieveError, SieveResult, SortOrder, Table,
};

use crate::config::SieveLimits;
use crate::decode::{
    Decode, FINDING_DATA_JOIN_COLUMNS, datasource_metrics_columns, decode_count,
    decode_datasource_metrics,
};
use crate::sql::{query_all, query_one};

const DATASET_ALIAS: &str = "d";
const FINDING_DATA_ALIAS: &str = "fd";
pub const PACKAGE_FINDING_TABLE: &str = "package_finding";

// Keys extracted from earlier stages. They are bound as typed values and never pass through the
// caller's filter grammar or its in-list limit.
#[derive(Clone, Debug, PartialEq)]
pub enum KeyScope {
    Ids(KeySet<i64>),
    PackageIds(KeySet<i64>),
    Purls(KeySet<String>),
    CommitTimes(KeySet<OffsetDateTime>),
}

impl KeyScope {
    pub fn field(&self) -> &'static str {
        match self {
            KeyScope::Ids(_) => ID_KEY,
            KeyScope::PackageIds(_) => PACKAGES_ID_FIELD,
            KeyScope::Purls(_) => PURL_KEY,
            KeyScope::CommitTimes(_) => COMMIT_DATE_TIME_KEY,
        }
    }

    pub fn key_count(&self) -> usize {
        match self {
            KeyScope::Ids(keys) | KeyScope::PackageIds(keys) => keys.len(),
            KeyScope::Purls(keys) => keys.len(),
            KeyScope::CommitTimes(keys) => keys.len(),
        }
    }

    fn condition(
        &self,
        backend: DatabaseBackend,
        desc: &'static EntityDescriptor,
    ) -> SieveResult<Expr> {
        match self {
            KeyScope::Ids(ids) => Ok(match_keys(backend, scoped_column(desc, ID_KEY)?, ids)),
            KeyScope::Purls(purls) => Ok(match_keys(
                backend,
                scoped_column(desc, PURL_KEY)?,
                purls,
            )),
            KeyScope::CommitTimes(times) => Ok(eq_or_in(
                scoped_column(desc, COMMIT_DATE_TIME_KEY)?,
                times.keys().iter().copied().map(SeaValue::from).collect(),
            )),
            KeyScope::PackageIds(ids) => {
                if desc.table != Table::Finding {
                    return Err(unscoped(PACKAGES_ID_FIELD, desc));
                }
                let linked = match_keys(backend, linked_package_id(), ids);
                Ok(column_expr(desc, "id").in_subquery(findings_linked_to(linked)))
            }
        }
    }
}

fn scoped_column(desc: &'static EntityDescriptor, field: &str) -> SieveResult<Expr> {
    desc.column(field)
        .map(|column| column_expr(desc, column))
        .ok_or_else(|| unscoped(field, desc))
}

fn unscoped(field: &str, desc: &'static EntityDescriptor) -> SieveError {
    SieveError::invalid(format!("{field} cannot scope table {}", desc.table_name))
}

// postgres takes the whole key set as one array parameter
fn match_keys<T>(backend: DatabaseBackend, column: Expr, keys: &KeySet<T>) -> Expr
where
    T: Clone + Eq + Hash + Into<SeaValue>,
    Vec<T>: Into<SeaValue>,
{
    if keys.is_empty() {
        return always_false();
    }
    match backend {
        DatabaseBackend::Postgres => column.eq(PgFunc::any(Expr::val(keys.keys().to_vec()))),
        _ => column.is_in(
            keys.keys()
                .iter()
                .cloned()
                .map(Into::<SeaValue>::into)
                .collect::<Vec<_>>(),
        ),
    }
}

pub struct Executor<'a, C> {
    pub(crate) conn: &'a C,
    pub(crate) limits: SieveLimits,
}

impl<'a, C> Executor<'a, C>
where
    C: ConnectionTrait,
{
    pub fn new(conn: &'a C, limits: SieveLimits) -> Self {
        Self { conn, limits }
    }

    pub fn backend(&self) -> DatabaseBackend {
        self.conn.get_database_backend()
    }

    pub async fn query_record(
        &self,
        table: Table,
        params: &FilterParams,
        page: &PageRequest,
    ) -> SieveResult<PageResult<Record>> {
        let result = match table {
            Table::Dataset => self.query_datasets(params, page).await?.map(Record::Dataset),
            Table::Datasource => self
                .query::<DatasourceRecord>(params, page)
                .await?
                .map(Record::Datasource),
            Table::DatasourceEvent => self
                .query::<DatasourceEventRecord>(params, page)
                .await?
                .map(Record::DatasourceEvent),
            Table::DatasetMetrics => self
                .query::<DatasetMetricsRecord>(params, page)
                .await?
                .map(Record::DatasetMetrics),
            Table::Edit => self.query::<EditRecord>(params, page).await?.map(Record::Edit),
            Table::Package => self
                .query::<PackageRecord>(params, page)
                .await?
                .map(Record::Package),
            Table::Finding => self
                .query::<FindingRecord>(params, page)
                .await?
                .map(Record::Finding),
            Table::FindingData => self
                .query::<FindingDataRecord>(params, page)
                .await?
                .map(Record::FindingData),
            Table::FindingReporter => self
                .query::<FindingReporterRecord>(params, page)
                .await?
                .map(Record::FindingReporter),
            Table::DatasourceMetrics => self
                .query_datasource_metrics(table, params, page)
                .await?
                .map(Record::DatasourceMetrics),
            Table::DatasourceMetricsCurrent => self
                .query_datasource_metrics(table, params, page)
                .await?
                .map(Record::DatasourceMetricsCurrent),
        };
        info!(
            "sieve: {} query matched {} rows, returning {}",
            table,
            result.total_elements,
            result.content.len()
        );
        Ok(result)
    }

    pub async fn query<T: Decode>(
        &self,
        params: &FilterParams,
        page: &PageRequest,
    ) -> SieveResult<PageResult<T>> {
        self.fetch_page(T::TABLE.descriptor(), T::COLUMNS, params, None, page, T::decode)
            .await
    }

    pub async fn query_scoped<T: Decode>(
        &self,
        params: &FilterParams,
        scope: &KeyScope,
        page: &PageRequest,
    ) -> SieveResult<PageResult<T>> {
        // the extracted keys replace any caller filter on the same field
        let mut params = params.clone();
        params.remove(scope.field());
        info!(
            "sieve: {} query scoped to {} {} keys",
            T::TABLE,
            scope.key_count(),
            scope.field()
        );
        self.fetch_page(
            T::TABLE.descriptor(),
            T::COLUMNS,
            &params,
            Some(scope),
            page,
            T::decode,
        )
        .await
    }

    pub async fn query_datasets(
        &self,
        params: &FilterParams,
        page: &PageRequest,
    ) -> SieveResult<PageResult<DatasetRecord>> {
        let mut result = self.query::<DatasetRecord>(params, page).await?;
        if result.content.is_empty() {
            return Ok(result);
        }
        let ids = KeySet::collect(result.content.iter().map(|dataset| dataset.id));
        let mut by_dataset = self.datasources_for_datasets(&ids).await?;
        for dataset in &mut result.content {
            if let Some(datasources) = by_dataset.remove(&dataset.id) {
                dataset.datasources = datasources;
            }
        }
        Ok(result)
    }

    pub async fn query_datasource_metrics(
        &self,
        table: Table,
        params: &FilterParams,
        page: &PageRequest,
    ) -> SieveResult<PageResult<DatasourceMetricsRecord>> {
        let columns = datasource_metrics_columns(table);
        self.fetch_page(table.descriptor(), &columns, params, None, page, |row| {
            decode_datasource_metrics(row, table)
        })
        .await
    }

    // Unpaged fetch of every row whose id is in `ids`, one statement per chunk.
    pub async fn fetch_by_ids<T: Decode>(
        &self,
        params: &FilterParams,
        ids: &KeySet<i64>,
        sort: &[SortOrder],
    ) -> SieveResult<Vec<T>> {
        let mut rows = Vec::new();
        let page = PageRequest::unpaged().with_sort(sort.to_vec());
        for chunk in ids.chunks(self.limits.max_in_list) {
            let result = self
                .query_scoped::<T>(params, &KeyScope::Ids(chunk), &page)
                .await?;
            rows.extend(result.content);
        }
        Ok(rows)
    }

    async fn fetch_page<T>(
        &self,
        desc: &'static EntityDescriptor,
        columns: &[&'static str],
        params: &FilterParams,
        scope: Option<&KeyScope>,
        page: &PageRequest,
        decode: impl Fn(&QueryResult) -> SieveResult<T>,
    ) -> SieveResult<PageResult<T>> {
        let backend = self.backend();
        let max_in_list = self.limits.max_in_list;
        let count = build_count_statement(backend, desc, params, scope, max_in_list)?;
        let total = decode_count(query_one(self.conn, &count).await?)?;
        if total == 0 {
            return Ok(PageResult::empty(page));
        }
        let data =
            build_data_statement(backend, desc, columns, params, scope, page, max_in_list)?;
        let rows = query_all(self.conn, &data).await?;
        let content = rows.iter().map(&decode).collect::<SieveResult<Vec<_>>>()?;
        Ok(PageResult::new(content, total, page))
    }
}

pub fn build_count_statement(
    backend: DatabaseBackend,
    desc: &'static EntityDescriptor,
    params: &FilterParams,
    scope: Option<&KeyScope>,
    max_in_list: usize,
) -> SieveResult<SelectStatement> {
    let mut stmt = filtered_select(backend, desc, params, scope, max_in_list)?;
    stmt.expr_as(Expr::cust("COUNT(*)"), Alias::new("total"));
    Ok(stmt)
}

pub fn build_data_statement(
    backend: DatabaseBackend,
    desc: &'static EntityDescriptor,
    columns: &[&'static str],
    params: &FilterParams,
    scope: Option<&KeyScope>,
    page: &PageRequest,
    max_in_list: usize,
) -> SieveResult<SelectStatement> {
    let mut stmt = filtered_select(backend, desc, params, scope, max_in_list)?;
    let source = desc.qualifier();
    for column in columns {
        stmt.column((Alias::new(source), Alias::new(*column)));
    }
    if desc.table == Table::Finding {
        stmt.join_as(
            JoinType::LeftJoin,
            Alias::new("finding_data"),
            Alias::new(FINDING_DATA_ALIAS),
            Expr::col((Alias::new(source), Alias::new("id")))
                .equals((Alias::new(FINDING_DATA_ALIAS), Alias::new("finding_id"))),
        );
        stmt.expr_as(
            Expr::col((Alias::new(FINDING_DATA_ALIAS), Alias::new("id"))),
            Alias::new("data_id"),
        );
        for column in FINDING_DATA_JOIN_COLUMNS {
            stmt.column((Alias::new(FINDING_DATA_ALIAS), Alias::new(*column)));
        }
    }
    apply_sort(&mut stmt, desc, &page.sort);
    if let Some(size) = page.size {
        stmt.limit(size).offset(page.offset());
    }
    Ok(stmt)
}

fn filtered_select(
    backend: DatabaseBackend,
    desc: &'static EntityDescriptor,
    params: &FilterParams,
    scope: Option<&KeyScope>,
    max_in_list: usize,
) -> SieveResult<SelectStatement> {
    let mut stmt = Query::select();
    match desc.alias {
        Some(alias) => stmt.from_as(Alias::new(desc.table_name), Alias::new(alias)),
        None => stmt.from(Alias::new(desc.table_name)),
    };
    let mut predicate = PredicateBuilder::new(desc, backend)
        .with_max_in_list(max_in_list)
        .build(params)?;
    for expr in relation_filters(desc, params, &mut stmt, max_in_list)? {
        predicate = predicate.and(expr);
    }
    if let Some(scope) = scope {
        predicate = predicate.and(scope.condition(backend, desc)?);
    }
    if !predicate.is_empty() {
        stmt.cond_where(predicate.into_condition());
    }
    Ok(stmt)
}

// Dotted filters the field registry cannot resolve on its own.
fn relation_filters(
    desc: &'static EntityDescriptor,
    params: &FilterParams,
    stmt: &mut SelectStatement,
    max_in_list: usize,
) -> SieveResult<Vec<Expr>> {
    let mut exprs = Vec::new();
    match desc.table {
        Table::DatasetMetrics => {
            if let Some(raw) = params.get(DATASET_NAME_FIELD)
                && !raw.trim().is_empty()
            {
                let names = dedup_tokens(raw);
                check_in_list(DATASET_NAME_FIELD, names.len(), max_in_list)?;
                stmt.join_as(
                    JoinType::InnerJoin,
                    Alias::new("dataset"),
                    Alias::new(DATASET_ALIAS),
                    Expr::col((Alias::new(desc.qualifier()), Alias::new("dataset_id")))
                        .equals((Alias::new(DATASET_ALIAS), Alias::new("id"))),
                );
                let values = names
                    .into_iter()
                    .map(|name| SeaValue::from(name.to_string()))
                    .collect();
                exprs.push(eq_or_in(
                    Expr::col((Alias::new(DATASET_ALIAS), Alias::new("name"))),
                    values,
                ));
            }
        }
        Table::Finding => {
            if let Some(raw) = params.get(PACKAGES_ID_FIELD)
                && !raw.trim().is_empty()
            {
                let tokens = dedup_tokens(raw);
                check_in_list(PACKAGES_ID_FIELD, tokens.len(), max_in_list)?;
                let ids = tokens
                    .into_iter()
                    .map(|token| {
                        token.parse::<i64>().map(SeaValue::from).map_err(|err| {
                            SieveError::invalid_value(PACKAGES_ID_FIELD, raw, err.to_string())
                        })
                    })
                    .collect::<SieveResult<Vec<_>>>()?;
                let linked = eq_or_in(linked_package_id(), ids);
                exprs.push(column_expr(desc, "id").in_subquery(findings_linked_to(linked)));
            }
        }
        _ => {}
    }
    Ok(exprs)
}

fn linked_package_id() -> Expr {
    Expr::col((Alias::new(PACKAGE_FINDING_TABLE), Alias::new("package_id")))
}

fn findings_linked_to(package_condition: Expr) -> SelectStatement {
    Query::select()
        .column((Alias::new(PACKAGE_FINDING_TABLE), Alias::new("finding_id")))
        .from(Alias::new(PACKAGE_FINDING_TABLE))
        .and_where(package_condition)
        .to_owned()
}

fn check_in_list(field: &str, len: usize, max_in_list: usize) -> SieveResult<()> {
    if len > max_in_list {
        return Err(SieveError::limit(format!(
            "{len} values for field {field} exceeds the in-list limit of {max_in_list}"
        )));
    }
    Ok(())
}

fn apply_sort(stmt: &mut SelectStatement, desc: &'static EntityDescriptor, sort: &[SortOrder]) {
    for order in sort {
        let Some(column) = desc.column(&order.field) else {
            warn!(
                "sieve: unknown sort field {} for table {}, skipping",
                order.field, desc.table_name
            );
            continue;
        };
        let direction = if order.ascending {
            Order::Asc
        } else {
            Order::Desc
        };
        stmt.order_by((Alias::new(desc.qualifier()), Alias::new(column)), direction);
    }
}
