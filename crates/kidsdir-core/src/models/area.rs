use serde::{Deserialize, Serialize};

use super::tree::TreeRecord;

/// Country / region / district hierarchy used to filter search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct GeographicArea {
    pub id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub display_order: i32,
}

fn default_active() -> bool {
    true
}

impl TreeRecord for GeographicArea {
    fn id(&self) -> &str {
        &self.id
    }

    fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }

    fn display_order(&self) -> i32 {
        self.display_order
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_area_defaults_to_active() {
        let area: GeographicArea =
            serde_json::from_str(r#"{"id": "hk", "name": "Hong Kong", "level": "country"}"#)
                .expect("parse area");
        assert!(area.active);
        assert_eq!(area.display_order, 0);
        assert_eq!(area.level.as_deref(), Some("country"));
    }
}
