use serde::{Deserialize, Serialize};

use super::tree::TreeRecord;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ActivityCategory {
    pub id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub display_order: i32,
}

impl TreeRecord for ActivityCategory {
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
