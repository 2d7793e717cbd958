//! Renders validated charity filters and projections into PostgreSQL.

use core_types::{BoundValue, CharityColumn, CharityFilter};
use sqlx::{Postgres, QueryBuilder};

/// The fixed projection of every charity search, aliased to `Charity`'s fields.
pub const CHARITY_SELECT: &str =
    "SELECT CharityID AS charity_id, Name AS name, Address AS address FROM Charities";

/// Builds `SELECT .. FROM Charities [WHERE c1 op $1 {AND|OR} c2 op $2 ..]`.
///
/// Column names and operators come from closed enums; every value is a bound
/// parameter, numbered in condition order.
pub fn charity_search_query(filter: &CharityFilter) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new(CHARITY_SELECT);

    for (connector, condition) in filter.clauses() {
        match connector {
            None => query.push(" WHERE "),
            Some(connector) => query.push(format!(" {} ", connector.as_sql())),
        };
        query.push(format!(
            "{} {} ",
            condition.column.as_sql(),
            condition.op.as_sql()
        ));
        match &condition.value {
            BoundValue::Integer(n) => query.push_bind(*n),
            BoundValue::Text(s) => query.push_bind(s.clone()),
        };
    }

    query.push(" ORDER BY CharityID");
    query
}

/// `SELECT <columns> FROM Charities`, columns in the order requested.
pub fn projection_sql(columns: &[CharityColumn]) -> String {
    let list = columns
        .iter()
        .map(CharityColumn::as_sql)
        .collect::<Vec<_>>()
        .join(", ");
    format!("SELECT {list} FROM Charities ORDER BY CharityID")
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::{ConditionValue, RawCondition};

    fn raw(attribute: &str, operator: &str, value: &str) -> RawCondition {
        RawCondition {
            attribute: attribute.to_string(),
            operator: operator.to_string(),
            value: ConditionValue::Text(value.to_string()),
        }
    }

    fn sql_for(conditions: &[RawCondition], connectors: &[&str]) -> String {
        let filter = CharityFilter::parse(conditions, connectors).unwrap();
        charity_search_query(&filter).sql().to_string()
    }

    #[test]
    fn empty_filter_selects_every_row() {
        assert_eq!(
            sql_for(&[], &[]),
            "SELECT CharityID AS charity_id, Name AS name, Address AS address FROM Charities ORDER BY CharityID"
        );
    }

    #[test]
    fn single_condition_binds_its_value() {
        assert_eq!(
            sql_for(&[raw("Name", "=", "RedCross")], &[]),
            format!("{CHARITY_SELECT} WHERE Name = $1 ORDER BY CharityID")
        );
    }

    #[test]
    fn connectors_are_emitted_between_clauses_in_order() {
        let sql = sql_for(
            &[
                raw("Name", "=", "A"),
                raw("Address", "!=", "X"),
                raw("CharityID", ">", "3"),
                raw("name", "<", "M"),
            ],
            &["OR", "and", "OR"],
        );
        assert_eq!(
            sql,
            format!(
                "{CHARITY_SELECT} WHERE Name = $1 OR Address != $2 AND CharityID > $3 OR Name < $4 ORDER BY CharityID"
            )
        );
    }

    #[test]
    fn clause_and_connector_counts_track_conditions() {
        for n in 1..6 {
            let conditions: Vec<_> = (0..n).map(|i| raw("Name", "=", &i.to_string())).collect();
            let connectors = vec!["AND"; n - 1];
            let sql = sql_for(&conditions, &connectors);
            let placeholders = (1..=n).filter(|i| sql.contains(&format!("${i}"))).count();
            assert_eq!(placeholders, n);
            assert!(!sql.contains(&format!("${}", n + 1)));
            assert_eq!(sql.matches(" AND ").count(), n - 1);
        }
    }

    #[test]
    fn client_text_never_reaches_the_query() {
        let sql = sql_for(&[raw("Name", "=", "x' OR '1'='1")], &[]);
        assert!(!sql.contains("'1'='1"));
    }

    #[test]
    fn projection_keeps_requested_order() {
        assert_eq!(
            projection_sql(&[CharityColumn::Address, CharityColumn::CharityId]),
            "SELECT Address, CharityID FROM Charities ORDER BY CharityID"
        );
    }
}
