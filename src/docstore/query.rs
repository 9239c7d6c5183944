//! Structured queries over a single collection
//!
//! Supported predicates mirror what a hosted document database offers:
//! equality, inclusive range bounds, array membership, ordering, limit and a
//! start-after cursor. Evaluation is done here so every [`DocumentStore`]
//! implementation orders and pages results the same way.
//!
//! [`DocumentStore`]: super::DocumentStore

use std::cmp::Ordering;

use serde_json::Value;

use super::document::DocumentSnapshot;
use super::error::{Result, StoreError};
use super::value::{compare_values, same_type};

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    Gte(String, Value),
    Lte(String, Value),
    ArrayContains(String, Value),
}

impl Filter {
    pub fn field(&self) -> &str {
        match self {
            Filter::Eq(field, _)
            | Filter::Gte(field, _)
            | Filter::Lte(field, _)
            | Filter::ArrayContains(field, _) => field,
        }
    }

    fn is_range(&self) -> bool {
        matches!(self, Filter::Gte(..) | Filter::Lte(..))
    }

    fn matches(&self, doc: &DocumentSnapshot) -> bool {
        let Some(actual) = doc.get(self.field()) else {
            return false;
        };

        match self {
            Filter::Eq(_, expected) => compare_values(actual, expected).is_eq(),
            Filter::Gte(_, bound) => {
                same_type(actual, bound) && compare_values(actual, bound).is_ge()
            }
            Filter::Lte(_, bound) => {
                same_type(actual, bound) && compare_values(actual, bound).is_le()
            }
            Filter::ArrayContains(_, needle) => actual
                .as_array()
                .is_some_and(|items| items.iter().any(|item| compare_values(item, needle).is_eq())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Direction::Ascending => ordering,
            Direction::Descending => ordering.reverse(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<usize>,
    pub start_after: Option<DocumentSnapshot>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq(field.to_string(), value.into()));
        self
    }

    pub fn where_gte(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Gte(field.to_string(), value.into()));
        self
    }

    pub fn where_lte(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Lte(field.to_string(), value.into()));
        self
    }

    pub fn where_array_contains(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters
            .push(Filter::ArrayContains(field.to_string(), value.into()));
        self
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by.push(OrderBy {
            field: field.to_string(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Resume strictly after `cursor` in this query's order.
    pub fn start_after(mut self, cursor: DocumentSnapshot) -> Self {
        self.start_after = Some(cursor);
        self
    }

    /// Reject shapes a hosted store could not serve: a range filter must be on
    /// the first ordered field, and all range filters must share one field.
    pub fn validate(&self) -> Result<()> {
        let mut range_fields = self.filters.iter().filter(|f| f.is_range()).map(Filter::field);

        if let Some(range_field) = range_fields.next() {
            if let Some(other) = range_fields.find(|f| *f != range_field) {
                return Err(StoreError::InvalidQuery(format!(
                    "range filters on different fields '{}' and '{}'",
                    range_field, other
                )));
            }

            match self.order_by.first() {
                Some(first) if first.field == range_field => {}
                Some(first) => {
                    return Err(StoreError::InvalidQuery(format!(
                        "range filter on '{}' requires it as first order-by, found '{}'",
                        range_field, first.field
                    )));
                }
                None => {}
            }
        }

        Ok(())
    }

    pub fn matches(&self, doc: &DocumentSnapshot) -> bool {
        self.filters.iter().all(|f| f.matches(doc))
            && self.order_by.iter().all(|o| doc.get(&o.field).is_some())
    }

    /// Order two documents by the order-by fields, then by id.
    ///
    /// The id tie-break follows the direction of the last order-by field.
    pub fn compare(&self, a: &DocumentSnapshot, b: &DocumentSnapshot) -> Ordering {
        for order in &self.order_by {
            let ordering = match (a.get(&order.field), b.get(&order.field)) {
                (Some(x), Some(y)) => compare_values(x, y),
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            let ordering = order.direction.apply(ordering);
            if ordering.is_ne() {
                return ordering;
            }
        }

        let tie_break = self
            .order_by
            .last()
            .map(|o| o.direction)
            .unwrap_or(Direction::Ascending);
        tie_break.apply(a.id.cmp(&b.id))
    }

    /// Filter, sort, skip past the cursor and truncate.
    pub fn execute<I>(&self, docs: I) -> Vec<DocumentSnapshot>
    where
        I: IntoIterator<Item = DocumentSnapshot>,
    {
        let mut rows: Vec<DocumentSnapshot> =
            docs.into_iter().filter(|d| self.matches(d)).collect();
        rows.sort_by(|a, b| self.compare(a, b));

        if let Some(cursor) = &self.start_after {
            rows.retain(|d| self.compare(d, cursor).is_gt());
        }

        if let Some(limit) = self.limit {
            rows.truncate(limit);
        }

        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: &str, fields: Value) -> DocumentSnapshot {
        DocumentSnapshot {
            id: id.to_string(),
            fields: fields.as_object().cloned().unwrap(),
        }
    }

    fn sample() -> Vec<DocumentSnapshot> {
        vec![
            doc("a", json!({"title": "Bangladesh", "tags": ["flag"], "createdAt": 1})),
            doc("b", json!({"title": "Banff", "tags": ["tourist"], "createdAt": 2})),
            doc("c", json!({"title": "Bhutan", "tags": ["flag", "asia"], "createdAt": 3})),
            doc("d", json!({"title": "Angkor Wat", "tags": ["tourist", "asia"], "createdAt": 4})),
            doc("e", json!({"title": "No timestamp", "tags": ["flag"]})),
        ]
    }

    fn ids(rows: &[DocumentSnapshot]) -> Vec<&str> {
        rows.iter().map(|d| d.id.as_str()).collect()
    }

    #[test]
    fn test_prefix_range() {
        let query = Query::new()
            .where_gte("title", "Ban")
            .where_lte("title", format!("Ban{}", '\u{f8ff}'))
            .order_by("title", Direction::Ascending);

        assert!(query.validate().is_ok());
        assert_eq!(ids(&query.execute(sample())), vec!["b", "a"]);
    }

    #[test]
    fn test_array_contains_with_order() {
        let query = Query::new()
            .where_array_contains("tags", "flag")
            .order_by("createdAt", Direction::Descending);

        // "e" lacks createdAt and is excluded by the order-by.
        assert_eq!(ids(&query.execute(sample())), vec!["c", "a"]);
    }

    #[test]
    fn test_array_contains_without_order() {
        let query = Query::new().where_array_contains("tags", "asia");
        assert_eq!(ids(&query.execute(sample())), vec!["c", "d"]);
    }

    #[test]
    fn test_eq() {
        let query = Query::new().where_eq("title", "Banff");
        assert_eq!(ids(&query.execute(sample())), vec!["b"]);
    }

    #[test]
    fn test_range_requires_same_type() {
        let rows = vec![doc("n", json!({"title": 42})), doc("s", json!({"title": "B"}))];
        let query = Query::new().where_gte("title", "A").order_by("title", Direction::Ascending);
        assert_eq!(ids(&query.execute(rows)), vec!["s"]);
    }

    #[test]
    fn test_start_after_and_limit() {
        let all = sample();
        let query = Query::new().order_by("createdAt", Direction::Descending).limit(2);

        let first = query.execute(all.clone());
        assert_eq!(ids(&first), vec!["d", "c"]);

        let second = query
            .clone()
            .start_after(first.last().cloned().unwrap())
            .execute(all.clone());
        assert_eq!(ids(&second), vec!["b", "a"]);

        let third = query.start_after(second.last().cloned().unwrap()).execute(all);
        assert!(third.is_empty());
    }

    #[test]
    fn test_ties_broken_by_id() {
        let rows = vec![
            doc("z", json!({"createdAt": 5})),
            doc("m", json!({"createdAt": 5})),
            doc("a", json!({"createdAt": 5})),
        ];
        let asc = Query::new().order_by("createdAt", Direction::Ascending);
        assert_eq!(ids(&asc.execute(rows.clone())), vec!["a", "m", "z"]);

        let desc = Query::new().order_by("createdAt", Direction::Descending);
        let page = desc.clone().limit(1).execute(rows.clone());
        assert_eq!(ids(&page), vec!["z"]);
        let rest = desc.start_after(page[0].clone()).execute(rows);
        assert_eq!(ids(&rest), vec!["m", "a"]);
    }

    #[test]
    fn test_range_must_lead_order_by() {
        let query = Query::new()
            .where_gte("title", "A")
            .order_by("createdAt", Direction::Descending);
        assert!(matches!(query.validate(), Err(StoreError::InvalidQuery(_))));

        let query = Query::new().where_gte("title", "A").where_lte("createdAt", 5);
        assert!(matches!(query.validate(), Err(StoreError::InvalidQuery(_))));
    }
}
