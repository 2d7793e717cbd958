use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// The comparison operators accepted by the charity search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonOp {
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
}

impl ComparisonOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            ComparisonOp::Lt => "<",
            ComparisonOp::Gt => ">",
            ComparisonOp::Eq => "=",
            ComparisonOp::Ne => "!=",
        }
    }

    /// Applies the operator to an already computed `lhs.cmp(rhs)`.
    pub fn holds(&self, ordering: Ordering) -> bool {
        match self {
            ComparisonOp::Lt => ordering == Ordering::Less,
            ComparisonOp::Gt => ordering == Ordering::Greater,
            ComparisonOp::Eq => ordering == Ordering::Equal,
            ComparisonOp::Ne => ordering != Ordering::Equal,
        }
    }
}

impl FromStr for ComparisonOp {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "<" => Ok(ComparisonOp::Lt),
            ">" => Ok(ComparisonOp::Gt),
            "=" => Ok(ComparisonOp::Eq),
            "!=" => Ok(ComparisonOp::Ne),
            other => Err(CoreError::InvalidOperator(other.to_string())),
        }
    }
}

/// A logical connector joining two adjacent search clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connector {
    And,
    Or,
}

impl Connector {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Connector::And => "AND",
            Connector::Or => "OR",
        }
    }
}

impl FromStr for Connector {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("AND") {
            Ok(Connector::And)
        } else if trimmed.eq_ignore_ascii_case("OR") {
            Ok(Connector::Or)
        } else {
            Err(CoreError::InvalidConnector(trimmed.to_string()))
        }
    }
}

/// How a column's values are bound and compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Text,
}

/// The allow-list of `Charities` columns that may appear in generated SQL.
///
/// Client-supplied attribute names are only ever mapped onto one of these
/// variants; the text spliced into a query always comes from [`CharityColumn::as_sql`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CharityColumn {
    CharityId,
    Name,
    Address,
}

impl CharityColumn {
    pub const ALL: [CharityColumn; 3] = [
        CharityColumn::CharityId,
        CharityColumn::Name,
        CharityColumn::Address,
    ];

    pub fn as_sql(&self) -> &'static str {
        match self {
            CharityColumn::CharityId => "CharityID",
            CharityColumn::Name => "Name",
            CharityColumn::Address => "Address",
        }
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            CharityColumn::CharityId => ColumnKind::Integer,
            CharityColumn::Name | CharityColumn::Address => ColumnKind::Text,
        }
    }

    /// Parses a projection list. The order (and any repetition) is preserved.
    pub fn parse_list<S: AsRef<str>>(names: &[S]) -> Result<Vec<CharityColumn>, CoreError> {
        if names.is_empty() {
            return Err(CoreError::EmptyProjection);
        }
        names.iter().map(|name| name.as_ref().parse()).collect()
    }
}

impl FromStr for CharityColumn {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        CharityColumn::ALL
            .into_iter()
            .find(|column| column.as_sql().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| CoreError::InvalidAttribute(trimmed.to_string()))
    }
}

impl fmt::Display for CharityColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operators_outside_the_supported_set_are_rejected() {
        for op in ["<=", ">=", "<>", "LIKE", ""] {
            assert_eq!(
                op.parse::<ComparisonOp>(),
                Err(CoreError::InvalidOperator(op.to_string()))
            );
        }
        assert_eq!("!=".parse::<ComparisonOp>(), Ok(ComparisonOp::Ne));
    }

    #[test]
    fn connectors_are_case_insensitive() {
        assert_eq!("and".parse::<Connector>(), Ok(Connector::And));
        assert_eq!(" OR ".parse::<Connector>(), Ok(Connector::Or));
        assert!(matches!(
            "XOR".parse::<Connector>(),
            Err(CoreError::InvalidConnector(_))
        ));
    }

    #[test]
    fn column_names_resolve_to_canonical_sql() {
        assert_eq!("charityid".parse::<CharityColumn>(), Ok(CharityColumn::CharityId));
        assert_eq!("NAME".parse::<CharityColumn>().map(|c| c.as_sql()), Ok("Name"));
        assert_eq!(
            "Name; DROP TABLE Charities".parse::<CharityColumn>(),
            Err(CoreError::InvalidAttribute(
                "Name; DROP TABLE Charities".to_string()
            ))
        );
    }

    #[test]
    fn projection_list_keeps_order_and_rejects_empty() {
        let columns = CharityColumn::parse_list(&["Address", "CharityID"]).unwrap();
        assert_eq!(columns, vec![CharityColumn::Address, CharityColumn::CharityId]);

        let empty: [&str; 0] = [];
        assert_eq!(
            CharityColumn::parse_list(&empty),
            Err(CoreError::EmptyProjection)
        );
    }

    #[test]
    fn operator_semantics_follow_ordering() {
        assert!(ComparisonOp::Lt.holds(1.cmp(&2)));
        assert!(!ComparisonOp::Gt.holds(1.cmp(&2)));
        assert!(ComparisonOp::Ne.holds("a".cmp("b")));
        assert!(ComparisonOp::Eq.holds("a".cmp("a")));
    }
}
