//! Validation of the charity search request.
//!
//! A request is a list of `{attribute, operator, value}` conditions plus one
//! connector per gap between consecutive conditions. Parsing turns it into a
//! [`CharityFilter`] whose columns and operators come from closed enums, so
//! rendering it to SQL never splices client text into the query.

use crate::enums::{CharityColumn, ColumnKind, ComparisonOp, Connector};
use crate::error::CoreError;
use crate::structs::Charity;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A condition value as posted by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionValue {
    Integer(i64),
    Text(String),
}

impl fmt::Display for ConditionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionValue::Integer(n) => write!(f, "{n}"),
            ConditionValue::Text(s) => f.write_str(s),
        }
    }
}

/// One unvalidated condition from the request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCondition {
    pub attribute: String,
    pub operator: String,
    pub value: ConditionValue,
}

/// Body of `POST /search-charities`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[serde(default)]
    pub conditions: Vec<RawCondition>,
    #[serde(default)]
    pub logical_operators: Vec<String>,
}

/// A value coerced to the kind of the column it is compared against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoundValue {
    Integer(i64),
    Text(String),
}

/// A validated `column op value` comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub column: CharityColumn,
    pub op: ComparisonOp,
    pub value: BoundValue,
}

impl Condition {
    pub fn new(column: CharityColumn, op: ComparisonOp, value: BoundValue) -> Self {
        Self { column, op, value }
    }

    /// Validates a raw condition. The operator is checked first, then the
    /// attribute, then the value against the column's kind.
    pub fn parse(raw: &RawCondition) -> Result<Self, CoreError> {
        let op: ComparisonOp = raw.operator.parse()?;
        let column: CharityColumn = raw.attribute.parse()?;
        let value = match (column.kind(), &raw.value) {
            (ColumnKind::Integer, ConditionValue::Integer(n)) => BoundValue::Integer(*n),
            (ColumnKind::Integer, ConditionValue::Text(s)) => s
                .trim()
                .parse()
                .map(BoundValue::Integer)
                .map_err(|_| CoreError::InvalidValue {
                    attribute: column.to_string(),
                    value: s.clone(),
                })?,
            (ColumnKind::Text, value) => BoundValue::Text(value.to_string()),
        };
        Ok(Self { column, op, value })
    }

    /// Text is compared by bytes (uppercase sorts before lowercase), which
    /// differs from a PostgreSQL collation for mixed-case `<` and `>`.
    pub fn matches(&self, charity: &Charity) -> bool {
        let ordering = match (&self.column, &self.value) {
            (CharityColumn::CharityId, BoundValue::Integer(n)) => {
                i64::from(charity.charity_id).cmp(n)
            }
            (CharityColumn::Name, BoundValue::Text(s)) => charity.name.as_str().cmp(s.as_str()),
            (CharityColumn::Address, BoundValue::Text(s)) => {
                charity.address.as_str().cmp(s.as_str())
            }
            // `parse` never produces a mismatched pair.
            _ => return false,
        };
        self.op.holds(ordering)
    }
}

/// An ordered list of conditions joined by gap-indexed connectors:
/// `connectors[i - 1]` joins `conditions[i - 1]` and `conditions[i]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CharityFilter {
    conditions: Vec<Condition>,
    connectors: Vec<Connector>,
}

impl CharityFilter {
    /// A filter that matches every charity.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new(conditions: Vec<Condition>, connectors: Vec<Connector>) -> Result<Self, CoreError> {
        let expected = conditions.len().saturating_sub(1);
        if connectors.len() != expected {
            return Err(CoreError::InvalidConnectorCount {
                expected,
                actual: connectors.len(),
            });
        }
        Ok(Self {
            conditions,
            connectors,
        })
    }

    /// Every condition is validated (in order) before the connector count and
    /// the connectors themselves are checked.
    pub fn parse<S: AsRef<str>>(conditions: &[RawCondition], connectors: &[S]) -> Result<Self, CoreError> {
        let conditions = conditions
            .iter()
            .map(Condition::parse)
            .collect::<Result<Vec<_>, _>>()?;

        let expected = conditions.len().saturating_sub(1);
        if connectors.len() != expected {
            return Err(CoreError::InvalidConnectorCount {
                expected,
                actual: connectors.len(),
            });
        }

        let connectors = connectors
            .iter()
            .map(|c| c.as_ref().parse())
            .collect::<Result<Vec<Connector>, _>>()?;

        Self::new(conditions, connectors)
    }

    pub fn from_request(request: &SearchRequest) -> Result<Self, CoreError> {
        Self::parse(&request.conditions, &request.logical_operators)
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn connectors(&self) -> &[Connector] {
        &self.connectors
    }

    /// Yields each condition with the connector that precedes it (`None` for the first).
    pub fn clauses(&self) -> impl Iterator<Item = (Option<Connector>, &Condition)> + '_ {
        self.conditions.iter().enumerate().map(move |(i, condition)| {
            let connector = i.checked_sub(1).map(|gap| self.connectors[gap]);
            (connector, condition)
        })
    }

    /// Evaluates the filter with SQL precedence: AND binds tighter than OR.
    pub fn matches(&self, charity: &Charity) -> bool {
        if self.is_empty() {
            return true;
        }
        let mut disjuncts: Vec<bool> = Vec::new();
        for (connector, condition) in self.clauses() {
            let hit = condition.matches(charity);
            match (connector, disjuncts.last_mut()) {
                (Some(Connector::And), Some(last)) => *last = *last && hit,
                _ => disjuncts.push(hit),
            }
        }
        disjuncts.into_iter().any(|d| d)
    }
}
