use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Activity {
    pub id: String,
    pub org_id: String,
    #[serde(default)]
    pub category_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub age_min: i32,
    pub age_max: i32,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Activity {
    /// Whether a child of the given age falls in this activity's range.
    /// The upper bound is exclusive, matching how the backend filters.
    pub fn accepts_age(&self, age: i32) -> bool {
        age >= self.age_min && age < self.age_max
    }

    /// Age range for display, e.g. "3-6 yrs"
    pub fn age_range_display(&self) -> String {
        format!("{}-{} yrs", self.age_min, self.age_max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Activity {
        serde_json::from_str(
            r#"{"id": "a1", "org_id": "o1", "name": "Junior Swim", "age_min": 4, "age_max": 8}"#,
        )
        .expect("parse activity")
    }

    #[test]
    fn test_accepts_age_upper_bound_exclusive() {
        let activity = sample();
        assert!(!activity.accepts_age(3));
        assert!(activity.accepts_age(4));
        assert!(activity.accepts_age(7));
        assert!(!activity.accepts_age(8));
    }

    #[test]
    fn test_age_range_display() {
        assert_eq!(sample().age_range_display(), "4-8 yrs");
    }
}
