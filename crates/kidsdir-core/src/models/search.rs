use serde::{Deserialize, Serialize};

use super::{Activity, Location, Organization, Pricing, PricingType, Schedule};
use crate::api::pagination::query_cache_key;

/// One row of the public activity search: an activity joined with where,
/// when and for how much it runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ActivitySearchResult {
    pub activity: Activity,
    pub organization: Organization,
    pub location: Location,
    #[serde(default)]
    pub pricing: Option<Pricing>,
    #[serde(default)]
    pub schedule: Option<Schedule>,
}

/// Public search filters. Every field is optional; unset fields are not
/// sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActivitySearch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pricing_type: Option<PricingType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day_of_week_utc: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

impl ActivitySearch {
    /// Query-string pairs in a stable order.
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(age) = self.age {
            query.push(("age", age.to_string()));
        }
        if let Some(ref area) = self.area_id {
            query.push(("area_id", area.clone()));
        }
        if let Some(ref category) = self.category_id {
            query.push(("category_id", category.clone()));
        }
        if let Some(pricing) = self.pricing_type {
            query.push(("pricing_type", pricing.as_str().to_string()));
        }
        if let Some(day) = self.day_of_week_utc {
            query.push(("day_of_week_utc", day.to_string()));
        }
        if let Some(ref language) = self.language {
            query.push(("language", language.clone()));
        }
        if let Some(limit) = self.limit {
            query.push(("limit", limit.to_string()));
        }
        if let Some(ref cursor) = self.cursor {
            query.push(("cursor", cursor.clone()));
        }
        query
    }

    /// Stable cache key; two searches with the same filters share an entry.
    pub fn cache_key(&self) -> String {
        query_cache_key("search", self.to_query())
    }
}
