//! Filter criteria applied to equipment tiles.

use serde::{Deserialize, Serialize};

/// Base used only to borrow `reqwest::Url`'s form encoder.
const QUERY_BASE: &str = "http://localhost/";

/// Optional equality filters on equipment attributes.
///
/// Absent fields (and empty strings, which normalize to absent) do not filter.
/// Present fields combine conjunctively. Two criteria are equal when all four
/// fields are equal, which is what drives the tile source rebuild decision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// Equipment type; `type` on the wire.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warehouse: Option<String>,
}

impl FilterCriteria {
    /// Criteria that match everything.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = non_empty(status.into());
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = non_empty(kind.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = non_empty(region.into());
        self
    }

    pub fn with_warehouse(mut self, warehouse: impl Into<String>) -> Self {
        self.warehouse = non_empty(warehouse.into());
        self
    }

    /// Collapse empty strings to `None`.
    ///
    /// Query-string extraction produces `Some("")` for `?status=`, which must
    /// mean "no filter" rather than "status equals the empty string".
    pub fn normalized(self) -> Self {
        Self {
            status: self.status.and_then(non_empty),
            kind: self.kind.and_then(non_empty),
            region: self.region.and_then(non_empty),
            warehouse: self.warehouse.and_then(non_empty),
        }
    }

    /// True when no field filters.
    pub fn is_empty(&self) -> bool {
        self.pairs().is_empty()
    }

    /// Present fields as wire-name/value pairs, in stable field order.
    pub fn pairs(&self) -> Vec<(&'static str, &str)> {
        [
            ("status", self.status.as_deref()),
            ("type", self.kind.as_deref()),
            ("region", self.region.as_deref()),
            ("warehouse", self.warehouse.as_deref()),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.filter(|v| !v.is_empty()).map(|v| (name, v)))
        .collect()
    }

    /// Form-encoded query string without the leading `?`.
    ///
    /// Empty when no field filters.
    pub fn to_query_string(&self) -> String {
        let pairs = self.pairs();
        if pairs.is_empty() {
            return String::new();
        }

        let Ok(mut url) = reqwest::Url::parse(QUERY_BASE) else {
            return String::new();
        };
        url.query_pairs_mut().extend_pairs(pairs);
        url.query().unwrap_or_default().to_string()
    }

    /// Exact, case-sensitive match of every present field.
    pub fn matches(
        &self,
        status: Option<&str>,
        kind: Option<&str>,
        region: Option<&str>,
        warehouse: Option<&str>,
    ) -> bool {
        field_matches(self.status.as_deref(), status)
            && field_matches(self.kind.as_deref(), kind)
            && field_matches(self.region.as_deref(), region)
            && field_matches(self.warehouse.as_deref(), warehouse)
    }
}

fn field_matches(wanted: Option<&str>, actual: Option<&str>) -> bool {
    match wanted {
        None | Some("") => true,
        Some(w) => actual == Some(w),
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}
