use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An organization that runs activities.
///
/// `manager_id` is the Cognito `sub` of the user who manages the
/// organization; manager-scoped listings only return organizations whose
/// `manager_id` matches the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Organization {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub manager_id: Option<String>,
    #[serde(default)]
    pub phone_country_code: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub media_urls: Vec<String>,
    #[serde(default)]
    pub logo_media_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Organization {
    /// Phone number with its country code, if both are present
    pub fn phone_display(&self) -> Option<String> {
        match (&self.phone_country_code, &self.phone_number) {
            (Some(cc), Some(num)) => Some(format!("+{} {}", cc.trim_start_matches('+'), num)),
            (None, Some(num)) => Some(num.clone()),
            _ => None,
        }
    }

    pub fn is_managed_by(&self, sub: &str) -> bool {
        self.manager_id.as_deref() == Some(sub)
    }
}
