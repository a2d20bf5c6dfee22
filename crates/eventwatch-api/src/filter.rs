// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Filter options for event listings.
//!
//! Filters travel in the `X-Filter` request header as a JSON object, e.g.
//!
//! ```text
//! {"seen": false, "+order_by": "created", "+order": "desc"}
//! {"created": {"+gte": "2018-12-03T22:34:09"}, "+order_by": "created", "+order": "desc"}
//! {"+or": [{"created": {"+gte": "..."}}, {"id": 42}], "+order_by": "created", "+order": "desc"}
//! ```

use chrono::{DateTime, Utc};
use serde_json::{Map, Value, json};

use crate::types::format_api_datetime;

/// Timestamp field a bound applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeField {
    Created,
    Updated,
}

impl TimeField {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeField::Created => "created",
            TimeField::Updated => "updated",
        }
    }
}

/// Comparison operator of a time bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    /// Strictly after (`+gt`).
    After,
    /// At or after (`+gte`).
    AtOrAfter,
    /// Strictly before (`+lt`).
    Before,
}

impl Comparison {
    pub fn operator(&self) -> &'static str {
        match self {
            Comparison::After => "+gt",
            Comparison::AtOrAfter => "+gte",
            Comparison::Before => "+lt",
        }
    }
}

/// One time-range comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBound {
    pub field: TimeField,
    pub comparison: Comparison,
    pub at: DateTime<Utc>,
}

impl TimeBound {
    /// Whether a timestamp satisfies this bound.
    pub fn admits(&self, value: DateTime<Utc>) -> bool {
        match self.comparison {
            Comparison::After => value > self.at,
            Comparison::AtOrAfter => value >= self.at,
            Comparison::Before => value < self.at,
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Filter for listing events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOptions {
    /// Restrict to seen (`Some(true)`) or unseen (`Some(false)`) events.
    pub seen: Option<bool>,
    /// Time-range comparisons, all of which must hold.
    pub bounds: Vec<TimeBound>,
    /// Events returned regardless of the other conditions.
    pub include_ids: Vec<u64>,
    /// Sort field.
    pub order_by: TimeField,
    /// Sort direction.
    pub order: SortOrder,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            seen: None,
            bounds: Vec::new(),
            include_ids: Vec::new(),
            order_by: TimeField::Created,
            order: SortOrder::Desc,
        }
    }
}

impl FilterOptions {
    /// No conditions, newest first.
    pub fn new() -> Self {
        Self::default()
    }

    /// All events the user has not seen yet.
    pub fn unseen() -> Self {
        Self::new().with_seen(false)
    }

    /// Events created at or after `at` (used while polling).
    pub fn created_since(at: DateTime<Utc>) -> Self {
        Self::new().with_bound(TimeField::Created, Comparison::AtOrAfter, at)
    }

    /// Events created strictly before `at` (used for "show more").
    pub fn created_before(at: DateTime<Utc>) -> Self {
        Self::new().with_bound(TimeField::Created, Comparison::Before, at)
    }

    /// Restrict on the seen flag.
    pub fn with_seen(mut self, seen: bool) -> Self {
        self.seen = Some(seen);
        self
    }

    /// Add a time-range comparison.
    pub fn with_bound(mut self, field: TimeField, comparison: Comparison, at: DateTime<Utc>) -> Self {
        self.bounds.push(TimeBound {
            field,
            comparison,
            at,
        });
        self
    }

    /// Always include these event ids (e.g. events still in progress).
    pub fn including_ids(mut self, ids: impl IntoIterator<Item = u64>) -> Self {
        for id in ids {
            if !self.include_ids.contains(&id) {
                self.include_ids.push(id);
            }
        }
        self
    }

    /// Set the sort order.
    pub fn ordered_by(mut self, field: TimeField, order: SortOrder) -> Self {
        self.order_by = field;
        self.order = order;
        self
    }

    /// Lower bound on `created`, if any.
    pub fn created_lower_bound(&self) -> Option<DateTime<Utc>> {
        self.bounds
            .iter()
            .filter(|b| b.field == TimeField::Created)
            .filter(|b| matches!(b.comparison, Comparison::After | Comparison::AtOrAfter))
            .map(|b| b.at)
            .max()
    }

    /// Build the `X-Filter` JSON value.
    pub fn to_x_filter(&self) -> Value {
        let mut conditions = Map::new();
        if let Some(seen) = self.seen {
            conditions.insert("seen".to_string(), Value::Bool(seen));
        }
        for bound in &self.bounds {
            let entry = conditions
                .entry(bound.field.as_str().to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(ops) = entry {
                ops.insert(
                    bound.comparison.operator().to_string(),
                    Value::String(format_api_datetime(&bound.at)),
                );
            }
        }

        let mut filter = if self.include_ids.is_empty() {
            conditions
        } else {
            let mut alternatives: Vec<Value> = Vec::with_capacity(self.include_ids.len() + 1);
            if !conditions.is_empty() {
                alternatives.push(Value::Object(conditions));
            }
            alternatives.extend(self.include_ids.iter().map(|id| json!({ "id": id })));
            let mut wrapped = Map::new();
            wrapped.insert("+or".to_string(), Value::Array(alternatives));
            wrapped
        };

        filter.insert(
            "+order_by".to_string(),
            Value::String(self.order_by.as_str().to_string()),
        );
        filter.insert(
            "+order".to_string(),
            Value::String(self.order.as_str().to_string()),
        );
        Value::Object(filter)
    }

    /// The `X-Filter` header value.
    pub fn to_header_value(&self) -> String {
        self.to_x_filter().to_string()
    }
}
