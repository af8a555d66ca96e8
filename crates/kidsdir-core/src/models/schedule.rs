use serde::{Deserialize, Serialize};

/// Minutes in a day; schedule times are minutes past midnight UTC.
pub const MINUTES_PER_DAY: u32 = 24 * 60;

const DAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// One weekly slot. Day 0 is Sunday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ScheduleEntry {
    pub day_of_week_utc: u8,
    pub start_minutes_utc: u32,
    pub end_minutes_utc: u32,
}

impl ScheduleEntry {
    pub fn duration_minutes(&self) -> u32 {
        self.end_minutes_utc.saturating_sub(self.start_minutes_utc)
    }

    /// "Sat 09:30-11:00"
    pub fn display(&self) -> String {
        let day = DAY_NAMES
            .get(self.day_of_week_utc as usize)
            .copied()
            .unwrap_or("?");
        format!(
            "{} {}-{}",
            day,
            format_minutes(self.start_minutes_utc),
            format_minutes(self.end_minutes_utc)
        )
    }
}

fn format_minutes(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Schedule {
    pub id: String,
    pub activity_id: String,
    pub location_id: String,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub entries: Vec<ScheduleEntry>,
}

impl Schedule {
    pub fn runs_on(&self, day_of_week_utc: u8) -> bool {
        self.entries.iter().any(|e| e.day_of_week_utc == day_of_week_utc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_display() {
        let entry = ScheduleEntry {
            day_of_week_utc: 6,
            start_minutes_utc: 570,
            end_minutes_utc: 660,
        };
        assert_eq!(entry.display(), "Sat 09:30-11:00");
        assert_eq!(entry.duration_minutes(), 90);
    }

    #[test]
    fn test_runs_on() {
        let schedule: Schedule = serde_json::from_str(
            r#"{"id": "s", "activity_id": "a", "location_id": "l",
                "entries": [{"day_of_week_utc": 2, "start_minutes_utc": 600, "end_minutes_utc": 660}]}"#,
        )
        .expect("parse schedule");
        assert!(schedule.runs_on(2));
        assert!(!schedule.runs_on(3));
        assert!(schedule.languages.is_empty());
    }
}
