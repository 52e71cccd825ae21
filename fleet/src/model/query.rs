// FleetDocs
// Copyright 2023 Julio Merino
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! Validators for the query strings of listing and reporting requests.

use fleetdocs_core::model::validation::{Fields, Patch, Violations};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::{Duration, OffsetDateTime};

/// Page returned when the client does not ask for one.
const DEFAULT_PAGE: u64 = 1;

/// Page size used when the client does not ask for one.
const DEFAULT_LIMIT: u64 = 10;

/// Look-ahead window for expiring documents when the client does not ask for one.
pub(crate) const DEFAULT_WITHIN_DAYS: u64 = 30;

/// Extracts the positive integer in field `name`, falling back to `default` when absent.
fn positive(fields: &mut Fields<'_>, name: &str, message: &str, default: u64) -> Option<u64> {
    match fields.digits(name, message) {
        Patch::Set(0) => {
            fields.reject(name, message);
            None
        }
        Patch::Set(n) => Some(n),
        Patch::Keep | Patch::Clear => Some(default),
    }
}

/// Parameters of a bus listing.
#[derive(Clone, Debug, PartialEq)]
pub struct BusQuery {
    /// 1-based page number.
    pub page: u64,

    /// Maximum number of buses per page.
    pub limit: u64,

    /// Case-insensitive text to look for in the registration number, model, manufacturer and
    /// owner name of each bus.
    pub search: Option<String>,
}

impl Default for BusQuery {
    fn default() -> Self {
        Self { page: DEFAULT_PAGE, limit: DEFAULT_LIMIT, search: None }
    }
}

impl BusQuery {
    /// Validates the raw query parameters of a listing request.
    pub fn from_query(input: &Value) -> Result<Self, Violations> {
        let mut fields = Fields::new(input);
        let page = positive(&mut fields, "page", "Page must be a positive integer", DEFAULT_PAGE);
        let limit =
            positive(&mut fields, "limit", "Limit must be a positive integer", DEFAULT_LIMIT);
        let search = fields.string("search").into_option().filter(|s| !s.is_empty());
        fields.finish(|| Some(Self { page: page?, limit: limit?, search }))
    }

    /// Number of buses to skip to reach the requested page.
    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

/// Position of a page within a listing.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct Pagination {
    /// 1-based page number.
    pub page: u64,

    /// Maximum number of items per page.
    pub limit: u64,

    /// Total number of items across all pages.
    pub total: u64,

    /// Total number of pages.
    pub pages: u64,
}

impl Pagination {
    /// Describes the page requested by `query` over a listing of `total` items.
    pub fn new(query: &BusQuery, total: u64) -> Self {
        Self { page: query.page, limit: query.limit, total, pages: total.div_ceil(query.limit) }
    }
}

/// Parameters of an expiring documents report.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExpiringQuery {
    /// Number of days to look ahead of now.
    pub within_days: u64,
}

impl Default for ExpiringQuery {
    fn default() -> Self {
        Self { within_days: DEFAULT_WITHIN_DAYS }
    }
}

impl ExpiringQuery {
    /// Validates the raw query parameters of an expiring documents request.
    pub fn from_query(input: &Value) -> Result<Self, Violations> {
        let mut fields = Fields::new(input);
        let within_days = fields
            .digits("withinDays", "withinDays must be a non-negative integer")
            .apply(Some(DEFAULT_WITHIN_DAYS));
        fields.finish(|| Some(Self { within_days: within_days? }))
    }

    /// Computes the latest expiry date that falls within the window starting at `now`.
    ///
    /// Returns none if the window reaches beyond the representable dates, in which case every
    /// document with an expiry date matches.
    pub fn cutoff(&self, now: OffsetDateTime) -> Option<OffsetDateTime> {
        let days = i32::try_from(self.within_days).ok()?;
        now.checked_add(Duration::DAY.checked_mul(days)?)
    }
}

/// Parameters of a missing required documents report.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MissingRequiredQuery {
    /// Names of the document types every bus must hold.  If none, all known types are required.
    pub types: Option<Vec<String>>,
}

impl MissingRequiredQuery {
    /// Validates the raw query parameters of a missing required documents request.
    ///
    /// `types` is a comma-separated list of document type names.  Names are trimmed and empty
    /// entries are ignored, so a list without any name is the same as no list at all.
    pub fn from_query(input: &Value) -> Result<Self, Violations> {
        let mut fields = Fields::new(input);
        let types = fields.string("types").into_option().and_then(|raw| {
            let names: Vec<String> = raw
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_owned)
                .collect();
            if names.is_empty() { None } else { Some(names) }
        });
        fields.finish(|| Some(Self { types }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetdocs_core::clocks::testutils::utc_datetime;
    use fleetdocs_core::model::validation::query_object;
    use std::collections::HashMap;

    /// Builds a query object out of literal key/value pairs.
    fn query(pairs: &[(&str, &str)]) -> Value {
        let pairs: HashMap<String, String> =
            pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
        query_object(pairs)
    }

    #[test]
    fn test_bus_query_defaults() {
        assert_eq!(BusQuery::default(), BusQuery::from_query(&query(&[])).unwrap());
        assert_eq!(BusQuery::default(), BusQuery::from_query(&query(&[("search", "")])).unwrap());
    }

    #[test]
    fn test_bus_query_ok() {
        let q = BusQuery::from_query(&query(&[("page", "3"), ("limit", "25"), ("search", "volvo")]))
            .unwrap();
        assert_eq!(BusQuery { page: 3, limit: 25, search: Some("volvo".to_owned()) }, q);
        assert_eq!(50, q.offset());
    }

    #[test]
    fn test_bus_query_invalid() {
        let err = BusQuery::from_query(&query(&[("page", "0"), ("limit", "ten")])).unwrap_err();
        assert_eq!(
            vec!["Page must be a positive integer", "Limit must be a positive integer"],
            err.as_slice().iter().map(|v| v.message.as_str()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_bus_query_offset_saturates() {
        let q = BusQuery { page: u64::MAX, limit: u64::MAX, search: None };
        assert_eq!(u64::MAX, q.offset());
    }

    #[test]
    fn test_pagination() {
        let q = BusQuery { page: 2, limit: 10, search: None };
        assert_eq!(Pagination { page: 2, limit: 10, total: 25, pages: 3 }, Pagination::new(&q, 25));
        assert_eq!(0, Pagination::new(&q, 0).pages);
        assert_eq!(1, Pagination::new(&q, 10).pages);
    }

    #[test]
    fn test_expiring_query() {
        assert_eq!(30, ExpiringQuery::from_query(&query(&[])).unwrap().within_days);
        assert_eq!(
            0,
            ExpiringQuery::from_query(&query(&[("withinDays", "0")])).unwrap().within_days
        );
        assert_eq!(
            Violations::single("withinDays", "withinDays must be a non-negative integer"),
            ExpiringQuery::from_query(&query(&[("withinDays", "-3")])).unwrap_err()
        );
    }

    #[test]
    fn test_expiring_query_cutoff() {
        let now = utc_datetime(2024, 1, 15, 9, 0, 0);
        assert_eq!(
            Some(utc_datetime(2024, 2, 14, 9, 0, 0)),
            ExpiringQuery { within_days: 30 }.cutoff(now)
        );
        assert_eq!(None, ExpiringQuery { within_days: 10_000_000 }.cutoff(now));
        assert_eq!(None, ExpiringQuery { within_days: u64::MAX }.cutoff(now));
    }

    #[test]
    fn test_missing_required_query() {
        assert_eq!(None, MissingRequiredQuery::from_query(&query(&[])).unwrap().types);
        assert_eq!(
            None,
            MissingRequiredQuery::from_query(&query(&[("types", " , ")])).unwrap().types
        );
        assert_eq!(
            Some(vec!["Insurance".to_owned(), "Permit".to_owned()]),
            MissingRequiredQuery::from_query(&query(&[("types", " Insurance,,Permit ")]))
                .unwrap()
                .types
        );
    }
}
