//! Data query parameters as received from a caller
//!
//! `from` and `to` are optional millisecond bounds; `group` is whatever the
//! caller sent as grouping directive (string, number or absent).

use crate::query::error::QueryResult;
use crate::query::grouping::GroupBy;
use crate::storage::TimeFilter;
use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DataQuery {
    #[serde(default)]
    pub from: Option<i64>,
    #[serde(default)]
    pub to: Option<i64>,
    #[serde(default, alias = "groupBy", alias = "group_by")]
    pub group: serde_json::Value,
}

impl DataQuery {
    pub fn filter(&self) -> TimeFilter {
        TimeFilter::new(self.from, self.to)
    }

    pub fn group_by(&self) -> QueryResult<GroupBy> {
        GroupBy::from_json(&self.group)
    }
}
