use std::collections::HashMap;

use sea_orm::sea_query::{Alias, Expr, ExprTrait, JoinType, Order, Query};
use sea_orm::{ConnectionTrait, QueryResult};
use time::OffsetDateTime;

use patchfox_sieve_core::{DatasourceRecord, KeySet, SieveError, SieveResult};

use crate::decode::Decode;
use crate::executor::Executor;
use crate::sql::query_all;

const DATASOURCE_ALIAS: &str = "ds";
const LINK_ALIAS: &str = "link";

#[derive(Clone, Debug, PartialEq)]
pub struct DatasourceEdit {
    pub edit_id: i64,
    pub dataset_metrics_id: i64,
    pub commit_date_time: Option<OffsetDateTime>,
    pub datasource_purl: Option<String>,
}

fn get<T: sea_orm::TryGetable>(row: &QueryResult, col: &str) -> SieveResult<T> {
    row.try_get::<T>("", col).map_err(SieveError::from)
}

impl<C> Executor<'_, C>
where
    C: ConnectionTrait,
{
    pub async fn datasources_for_datasets(
        &self,
        dataset_ids: &KeySet<i64>,
    ) -> SieveResult<HashMap<i64, Vec<DatasourceRecord>>> {
        let mut by_dataset: HashMap<i64, Vec<DatasourceRecord>> = HashMap::new();
        for chunk in dataset_ids.chunks(self.limits.max_in_list) {
            let mut stmt = Query::select();
            for column in DatasourceRecord::COLUMNS {
                stmt.column((Alias::new(DATASOURCE_ALIAS), Alias::new(*column)));
            }
            stmt.expr_as(
                Expr::col((Alias::new(LINK_ALIAS), Alias::new("dataset_id"))),
                Alias::new("owner_dataset_id"),
            )
            .from_as(Alias::new("datasource"), Alias::new(DATASOURCE_ALIAS))
            .join_as(
                JoinType::InnerJoin,
                Alias::new("datasource_dataset"),
                Alias::new(LINK_ALIAS),
                Expr::col((Alias::new(DATASOURCE_ALIAS), Alias::new("id")))
                    .equals((Alias::new(LINK_ALIAS), Alias::new("datasource_id"))),
            )
            .and_where(
                Expr::col((Alias::new(LINK_ALIAS), Alias::new("dataset_id")))
                    .is_in(chunk.keys().iter().copied()),
            )
            .order_by((Alias::new(DATASOURCE_ALIAS), Alias::new("id")), Order::Asc);
            for row in query_all(self.conn, &stmt).await? {
                let owner: i64 = get(&row, "owner_dataset_id")?;
                by_dataset
                    .entry(owner)
                    .or_default()
                    .push(DatasourceRecord::decode(&row)?);
            }
        }
        Ok(by_dataset)
    }

    pub async fn edit_ids_for_dataset_metrics(
        &self,
        dataset_metrics_ids: &KeySet<i64>,
    ) -> SieveResult<KeySet<i64>> {
        let mut ids = Vec::new();
        for chunk in dataset_metrics_ids.chunks(self.limits.max_in_list) {
            let stmt = Query::select()
                .column(Alias::new("id"))
                .from(Alias::new("edit"))
                .and_where(
                    Expr::col(Alias::new("dataset_metrics_id"))
                        .is_in(chunk.keys().iter().copied()),
                )
                .order_by(Alias::new("id"), Order::Asc)
                .to_owned();
            for row in query_all(self.conn, &stmt).await? {
                ids.push(get::<i64>(&row, "id")?);
            }
        }
        Ok(KeySet::collect(ids))
    }

    pub async fn edits_with_datasource_purl(
        &self,
        dataset_metrics_ids: &KeySet<i64>,
    ) -> SieveResult<Vec<DatasourceEdit>> {
        let mut edits = Vec::new();
        for chunk in dataset_metrics_ids.chunks(self.limits.max_in_list) {
            let stmt = Query::select()
                .expr_as(
                    Expr::col((Alias::new("e"), Alias::new("id"))),
                    Alias::new("edit_id"),
                )
                .column((Alias::new("e"), Alias::new("dataset_metrics_id")))
                .column((Alias::new("e"), Alias::new("commit_date_time")))
                .expr_as(
                    Expr::col((Alias::new(DATASOURCE_ALIAS), Alias::new("purl"))),
                    Alias::new("datasource_purl"),
                )
                .from_as(Alias::new("edit"), Alias::new("e"))
                .join_as(
                    JoinType::LeftJoin,
                    Alias::new("datasource"),
                    Alias::new(DATASOURCE_ALIAS),
                    Expr::col((Alias::new("e"), Alias::new("datasource_id")))
                        .equals((Alias::new(DATASOURCE_ALIAS), Alias::new("id"))),
                )
                .and_where(
                    Expr::col((Alias::new("e"), Alias::new("dataset_metrics_id")))
                        .is_in(chunk.keys().iter().copied()),
                )
                .order_by((Alias::new("e"), Alias::new("id")), Order::Asc)
                .to_owned();
            for row in query_all(self.conn, &stmt).await? {
                edits.push(DatasourceEdit {
                    edit_id: get(&row, "edit_id")?,
                    dataset_metrics_id: get(&row, "dataset_metrics_id")?,
                    commit_date_time: get(&row, "commit_date_time")?,
                    datasource_purl: get(&row, "datasource_purl")?,
                });
            }
        }
        Ok(edits)
    }

    pub async fn package_ids_for_events(&self, event_ids: &KeySet<i64>) -> SieveResult<KeySet<i64>> {
        let mut ids = Vec::new();
        for chunk in event_ids.chunks(self.limits.max_in_list) {
            let stmt = Query::select()
                .column(Alias::new("package_id"))
                .from(Alias::new("datasource_event_package"))
                .and_where(
                    Expr::col(Alias::new("datasource_event_id"))
                        .is_in(chunk.keys().iter().copied()),
                )
                .order_by(Alias::new("package_id"), Order::Asc)
                .to_owned();
            for row in query_all(self.conn, &stmt).await? {
                ids.push(get::<i64>(&row, "package_id")?);
            }
        }
        Ok(KeySet::collect(ids))
    }

    pub async fn package_purls_for_events(
        &self,
        event_ids: &KeySet<i64>,
    ) -> SieveResult<KeySet<String>> {
        let mut purls = Vec::new();
        for chunk in event_ids.chunks(self.limits.max_in_list) {
            let stmt = Query::select()
                .column((Alias::new("p"), Alias::new("purl")))
                .from_as(Alias::new("datasource_event_package"), Alias::new(LINK_ALIAS))
                .join_as(
                    JoinType::InnerJoin,
                    Alias::new("package"),
                    Alias::new("p"),
                    Expr::col((Alias::new(LINK_ALIAS), Alias::new("package_id")))
                        .equals((Alias::new("p"), Alias::new("id"))),
                )
                .and_where(
                    Expr::col((Alias::new(LINK_ALIAS), Alias::new("datasource_event_id")))
                        .is_in(chunk.keys().iter().copied()),
                )
                .order_by((Alias::new("p"), Alias::new("purl")), Order::Asc)
                .to_owned();
            for row in query_all(self.conn, &stmt).await? {
                if let Some(purl) = get::<Option<String>>(&row, "purl")? {
                    purls.push(purl);
                }
            }
        }
        Ok(KeySet::collect(purls))
    }
}
