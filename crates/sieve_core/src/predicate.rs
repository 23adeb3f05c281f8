use std::collections::HashSet;

use log::{debug, warn};
use sea_orm::DatabaseBackend;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::sea_query::{Alias, Condition, Expr, ExprTrait, Value as SeaValue};
use time::format_description::well_known::{Iso8601, Rfc3339};
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};
use uuid::Uuid;

use crate::params::{FilterParams, is_paging_key, split_list};
use crate::registry::{EntityDescriptor, FieldDef, FieldType, is_nested};
use crate::{SieveError, SieveResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    pub fn split(raw: &str) -> (Option<CompareOp>, &str) {
        const PREFIXES: [(&str, CompareOp); 5] = [
            ("gte.", CompareOp::Gte),
            ("gt.", CompareOp::Gt),
            ("lte.", CompareOp::Lte),
            ("lt.", CompareOp::Lt),
            ("eq.", CompareOp::Eq),
        ];
        for (prefix, op) in PREFIXES {
            if let Some(rest) = raw.strip_prefix(prefix) {
                return (Some(op), rest);
            }
        }
        (None, raw)
    }
}

#[derive(Clone, Debug, Default)]
pub struct Predicate {
    conditions: Vec<Expr>,
}

impl Predicate {
    pub fn and(mut self, expr: Expr) -> Self {
        self.conditions.push(expr);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn into_condition(self) -> Condition {
        self.conditions
            .into_iter()
            .fold(Condition::all(), |cond, expr| cond.add(expr))
    }
}

pub struct PredicateBuilder<'a> {
    desc: &'a EntityDescriptor,
    backend: DatabaseBackend,
    max_in_list: Option<usize>,
}

impl<'a> PredicateBuilder<'a> {
    pub fn new(desc: &'a EntityDescriptor, backend: DatabaseBackend) -> Self {
        Self {
            desc,
            backend,
            max_in_list: None,
        }
    }

    pub fn with_max_in_list(mut self, max_in_list: usize) -> Self {
        self.max_in_list = Some(max_in_list);
        self
    }

    pub fn build(&self, params: &FilterParams) -> SieveResult<Predicate> {
        let mut predicate = Predicate::default();
        for (name, value) in params.iter() {
            if is_paging_key(name) || value.trim().is_empty() {
                continue;
            }
            if is_nested(name) {
                debug!(
                    "sieve: skipping nested field {} for table {}",
                    name, self.desc.table_name
                );
                continue;
            }
            let Some(field) = self.desc.field(name) else {
                warn!(
                    "sieve: unknown field {} for table {}, skipping",
                    name, self.desc.table_name
                );
                continue;
            };
            let expr = if value.contains(',') {
                self.in_list(field, value)?
            } else {
                self.single(field, value)?
            };
            predicate = predicate.and(expr);
        }
        Ok(predicate)
    }

    fn in_list(&self, field: &FieldDef, raw: &str) -> SieveResult<Expr> {
        let tokens = dedup_tokens(raw);
        if let Some(max) = self.max_in_list
            && tokens.len() > max
        {
            return Err(SieveError::limit(format!(
                "{} values for field {} exceeds the in-list limit of {max}",
                tokens.len(),
                field.name
            )));
        }
        let values = tokens
            .into_iter()
            .map(|token| literal(field, token))
            .collect::<SieveResult<Vec<_>>>()?;
        Ok(eq_or_in(column_expr(self.desc, field.column), values))
    }

    fn single(&self, field: &FieldDef, raw: &str) -> SieveResult<Expr> {
        let (op, value) = CompareOp::split(raw);
        let column = column_expr(self.desc, field.column);
        if field.field_type == FieldType::Str && op.is_none() {
            let pattern = format!("%{value}%");
            return Ok(match self.backend {
                DatabaseBackend::Postgres => column.ilike(pattern),
                _ => column.like(pattern),
            });
        }
        let literal = literal(field, value)?;
        Ok(match op.unwrap_or(CompareOp::Eq) {
            CompareOp::Eq => column.eq(literal),
            CompareOp::Gt => column.gt(literal),
            CompareOp::Gte => column.gte(literal),
            CompareOp::Lt => column.lt(literal),
            CompareOp::Lte => column.lte(literal),
        })
    }
}

pub fn column_expr(desc: &EntityDescriptor, column: &'static str) -> Expr {
    Expr::col((Alias::new(desc.qualifier()), Alias::new(column)))
}

pub fn always_false() -> Expr {
    Expr::cust("1 = 0")
}

pub fn eq_or_in(column: Expr, mut values: Vec<SeaValue>) -> Expr {
    match values.len() {
        0 => always_false(),
        1 => column.eq(values.remove(0)),
        _ => column.is_in(values),
    }
}

pub fn dedup_tokens(raw: &str) -> Vec<&str> {
    let mut seen = HashSet::new();
    split_list(raw)
        .into_iter()
        .map(|token| token.strip_prefix("eq.").unwrap_or(token).trim())
        .filter(|token| !token.is_empty() && seen.insert(*token))
        .collect()
}

pub fn literal(field: &FieldDef, raw: &str) -> SieveResult<SeaValue> {
    let invalid = |reason: String| SieveError::invalid_value(field.name, raw, reason);
    let value = match field.field_type {
        FieldType::Str | FieldType::Enum => SeaValue::from(raw.to_string()),
        FieldType::Int => SeaValue::from(
            raw.trim()
                .parse::<i32>()
                .map_err(|err| invalid(err.to_string()))?,
        ),
        FieldType::Long => SeaValue::from(
            raw.trim()
                .parse::<i64>()
                .map_err(|err| invalid(err.to_string()))?,
        ),
        FieldType::Double => SeaValue::from(
            raw.trim()
                .parse::<f64>()
                .map_err(|err| invalid(err.to_string()))?,
        ),
        FieldType::Bool => SeaValue::from(parse_bool(raw).ok_or_else(|| {
            invalid("expected true or false".to_string())
        })?),
        FieldType::Timestamp => SeaValue::from(
            parse_timestamp(raw).ok_or_else(|| invalid("expected an RFC 3339 timestamp".to_string()))?,
        ),
        FieldType::Uuid => SeaValue::from(
            Uuid::parse_str(raw.trim()).map_err(|err| invalid(err.to_string()))?,
        ),
    };
    Ok(value)
}

pub fn parse_bool(raw: &str) -> Option<bool> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("true") {
        Some(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

pub fn parse_timestamp(raw: &str) -> Option<OffsetDateTime> {
    let raw = raw.trim();
    if let Ok(value) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(value);
    }
    if let Ok(value) = OffsetDateTime::parse(raw, &Iso8601::DEFAULT) {
        return Some(value);
    }
    if let Ok(value) = PrimitiveDateTime::parse(raw, &Iso8601::DEFAULT) {
        return Some(value.assume_utc());
    }
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .ok()
        .map(|date| date.midnight().assume_utc())
}

#[cfg(test)]
mod tests {
    use sea_orm::DatabaseBackend;
    use sea_orm::sea_query::{Alias, Asterisk, PostgresQueryBuilder, Query, SqliteQueryBuilder};
    use sea_orm::sea_query::{QueryStatementWriter, Value as SeaValue};
    use time::macros::datetime;
    use uuid::Uuid;

    use super::{Predicate, PredicateBuilder, parse_timestamp};
    use crate::SieveError;
    use crate::params::FilterParams;
    use crate::registry::Table;

    fn params(pairs: &[(&str, &str)]) -> FilterParams {
        pairs.iter().copied().collect()
    }

    fn build(table: Table, pairs: &[(&str, &str)]) -> Predicate {
        PredicateBuilder::new(table.descriptor(), DatabaseBackend::Postgres)
            .build(&params(pairs))
            .expect("predicate")
    }

    fn render(table: Table, predicate: Predicate) -> (String, Vec<SeaValue>) {
        let desc = table.descriptor();
        let (sql, values) = Query::select()
            .column(Asterisk)
            .from(Alias::new(desc.table_name))
            .cond_where(predicate.into_condition())
            .build(PostgresQueryBuilder);
        (sql, values.0)
    }

    #[test]
    fn bare_string_is_case_insensitive_contains() {
        let (sql, values) = render(Table::Package, build(Table::Package, &[("name", "fox")]));
        assert!(sql.contains(r#""package"."name" ILIKE $1"#), "{sql}");
        assert_eq!(values, vec![SeaValue::from("%fox%".to_string())]);
    }

    #[test]
    fn eq_prefix_switches_string_to_exact() {
        let (sql, values) = render(Table::Package, build(Table::Package, &[("name", "eq.fox")]));
        assert!(sql.contains(r#""package"."name" = $1"#), "{sql}");
        assert_eq!(values, vec![SeaValue::from("fox".to_string())]);
    }

    #[test]
    fn enum_fields_default_to_equality() {
        let (sql, values) = render(Table::Dataset, build(Table::Dataset, &[("status", "READY")]));
        assert!(sql.contains(r#""dataset"."status" = $1"#), "{sql}");
        assert_eq!(values, vec![SeaValue::from("READY".to_string())]);
    }

    #[test]
    fn sqlite_contains_uses_like() {
        let predicate = PredicateBuilder::new(Table::Package.descriptor(), DatabaseBackend::Sqlite)
            .build(&params(&[("name", "fox")]))
            .expect("predicate");
        let (sql, _) = Query::select()
            .column(Asterisk)
            .from(Alias::new("package"))
            .cond_where(predicate.into_condition())
            .build(SqliteQueryBuilder);
        assert!(sql.contains(r#""package"."name" LIKE ?"#), "{sql}");
    }

    #[test]
    fn comma_list_becomes_deduplicated_in_list() {
        let (sql, values) = render(Table::Package, build(Table::Package, &[("id", "7,7,7,9")]));
        assert!(sql.contains(r#""package"."id" IN ($1, $2)"#), "{sql}");
        assert_eq!(values, vec![SeaValue::from(7i64), SeaValue::from(9i64)]);
    }

    #[test]
    fn list_tokens_strip_eq_prefix_and_match_exactly() {
        let (sql, values) = render(
            Table::Package,
            build(Table::Package, &[("purl", "eq.pkg:npm/a@1, pkg:npm/b@2")]),
        );
        assert!(sql.contains(r#""package"."purl" IN ($1, $2)"#), "{sql}");
        assert_eq!(
            values,
            vec![
                SeaValue::from("pkg:npm/a@1".to_string()),
                SeaValue::from("pkg:npm/b@2".to_string()),
            ]
        );
    }

    #[test]
    fn list_that_reduces_to_nothing_is_always_false() {
        let (sql, values) = render(Table::Edit, build(Table::Edit, &[("id", " , eq.,")]));
        assert!(sql.contains("1 = 0"), "{sql}");
        assert!(values.is_empty());
    }

    #[test]
    fn in_list_matches_union_of_single_values() {
        let (_, listed) = render(Table::Edit, build(Table::Edit, &[("sameEditCount", "1,2,3")]));
        let mut singles = Vec::new();
        for value in ["1", "2", "3"] {
            let (_, mut values) = render(Table::Edit, build(Table::Edit, &[("sameEditCount", value)]));
            singles.append(&mut values);
        }
        assert_eq!(listed, singles);
    }

    #[test]
    fn operator_prefixes_map_to_comparisons() {
        let predicate = build(
            Table::Edit,
            &[
                ("sameEditCount", "gt.1"),
                ("datasourceId", "gte.2"),
                ("datasetMetricsId", "lt.30"),
                ("id", "lte.40"),
            ],
        );
        assert_eq!(predicate.len(), 4);
        let (sql, values) = render(Table::Edit, predicate);
        assert!(sql.contains(r#""edit"."same_edit_count" > $1"#), "{sql}");
        assert!(sql.contains(r#""edit"."datasource_id" >= $2"#), "{sql}");
        assert!(sql.contains(r#""edit"."dataset_metrics_id" < $3"#), "{sql}");
        assert!(sql.contains(r#""edit"."id" <= $4"#), "{sql}");
        assert_eq!(
            values,
            vec![
                SeaValue::from(1i32),
                SeaValue::from(2i64),
                SeaValue::from(30i64),
                SeaValue::from(40i64),
            ]
        );
    }

    #[test]
    fn typed_literals_are_parsed() {
        let txid = Uuid::new_v4();
        let txid_raw = txid.to_string();
        let (sql, values) = render(
            Table::DatasourceEvent,
            build(
                Table::DatasourceEvent,
                &[
                    ("commitDateTime", "gte.2024-05-01T00:00:00Z"),
                    ("txid", txid_raw.as_str()),
                    ("analyzed", "TRUE"),
                ],
            ),
        );
        assert!(sql.contains(" AND "), "{sql}");
        assert_eq!(
            values,
            vec![
                SeaValue::from(datetime!(2024-05-01 0:00 UTC)),
                SeaValue::from(txid),
                SeaValue::from(true),
            ]
        );
    }

    #[test]
    fn aliased_table_columns_are_qualified() {
        let (sql, _) = render(Table::Finding, build(Table::Finding, &[("identifier", "CVE-2024")]));
        assert!(sql.contains(r#""f"."identifier" ILIKE $1"#), "{sql}");
    }

    #[test]
    fn skips_paging_blank_nested_and_unknown_fields() {
        let predicate = build(
            Table::Package,
            &[
                ("sort", "name"),
                ("size", "10"),
                ("page", "2"),
                ("select", "id"),
                ("name", "   "),
                ("dataset.name", "acme"),
                ("datasources.purl", "github.com/acme"),
                ("commitDateTime", "2024-01-01"),
                ("findings", "1"),
            ],
        );
        assert!(predicate.is_empty());
    }

    #[test]
    fn unparseable_values_fail_loudly() {
        let err = PredicateBuilder::new(Table::Edit.descriptor(), DatabaseBackend::Postgres)
            .build(&params(&[("sameEditCount", "gt.many")]))
            .expect_err("invalid");
        assert!(matches!(
            err,
            SieveError::InvalidFilterValue { ref field, ref value, .. }
                if field == "sameEditCount" && value == "gt.many"
        ));
        for (field, value) in [
            ("isUserEdit", "yes"),
            ("commitDateTime", "yesterday"),
            ("id", "1,two"),
        ] {
            let err = PredicateBuilder::new(Table::Edit.descriptor(), DatabaseBackend::Postgres)
                .build(&params(&[(field, value)]))
                .expect_err("invalid");
            assert!(err.is_client_error(), "{field}");
        }
    }

    #[test]
    fn in_list_limit_is_enforced() {
        let err = PredicateBuilder::new(Table::Package.descriptor(), DatabaseBackend::Postgres)
            .with_max_in_list(2)
            .build(&params(&[("id", "1,2,3")]))
            .expect_err("limit");
        assert!(matches!(err, SieveError::LimitExceeded { .. }));
        let ok = PredicateBuilder::new(Table::Package.descriptor(), DatabaseBackend::Postgres)
            .with_max_in_list(2)
            .build(&params(&[("id", "1,1,2")]))
            .expect("deduplicated list fits");
        assert_eq!(ok.len(), 1);
    }

    #[test]
    fn timestamp_forms() {
        assert_eq!(
            parse_timestamp("2024-05-01T10:30:00+02:00"),
            Some(datetime!(2024-05-01 10:30 +2))
        );
        assert_eq!(
            parse_timestamp("2024-05-01T10:30:00"),
            Some(datetime!(2024-05-01 10:30 UTC))
        );
        assert_eq!(
            parse_timestamp("2024-05-01"),
            Some(datetime!(2024-05-01 0:00 UTC))
        );
        assert_eq!(parse_timestamp("May 1st"), None);
    }
}
