use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use kidsdir_core::cache::{CachedData, Fetched, Freshness};
use kidsdir_core::models::{
    Activity, ActivityCategory, CognitoUser, GeographicArea, Location, Organization, Pricing,
    Schedule, Ticket, TreeNode, TreeRecord,
};
use kidsdir_core::utils::{format_date, format_optional, truncate};
use kidsdir_core::Resource;

/// Longest name printed in a tree row
const MAX_TREE_NAME: usize = 60;

/// Longest summary printed by `list --brief`
const MAX_LINE: usize = 120;

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Note on stderr when data did not come straight from the server
pub fn report_freshness<T>(fetched: &Fetched<T>) {
    match fetched.freshness {
        Freshness::Fresh => {}
        Freshness::Cached => {
            eprintln!("(cached {})", age_display(fetched));
        }
        Freshness::Stale => {
            eprintln!("(cached {}, refreshing in the background)", age_display(fetched));
        }
    }
}

fn age_display<T>(fetched: &Fetched<T>) -> String {
    CachedData {
        data: (),
        cached_at: fetched.cached_at,
    }
    .age_display()
}

/// One line per record for `list --brief`. Records that do not match
/// the expected shape fall back to their id.
pub fn summary_line(resource: Resource, record: &Value) -> String {
    let line = match resource {
        Resource::Organizations => typed(record, |o: Organization| {
            let phone = o.phone_display().unwrap_or_else(|| "-".to_string());
            format!("{}  {}  {}", o.name, phone, format_optional(&o.website, "-"))
        }),
        Resource::Activities => typed(record, |a: Activity| {
            format!("{}  {}  {}", a.name, a.age_range_display(), format_optional(&a.language, "-"))
        }),
        Resource::Locations => typed(record, |l: Location| {
            let coordinates = l
                .coordinates()
                .map(|(lat, lng)| format!("{:.5},{:.5}", lat, lng))
                .unwrap_or_else(|| "-".to_string());
            format!("{}  {}  {}", format_optional(&l.address, "-"), l.area_id, coordinates)
        }),
        Resource::Pricing => typed(record, |p: Pricing| {
            let trial = if p.free_trial_class_offered { "  free trial" } else { "" };
            format!("{}{}", p.price_display(), trial)
        }),
        Resource::Schedules => typed(record, |s: Schedule| {
            let slots: Vec<String> = s.entries.iter().map(|e| e.display()).collect();
            slots.join(", ")
        }),
        Resource::Categories => typed(record, |c: ActivityCategory| c.name),
        Resource::Areas => typed(record, |a: GeographicArea| {
            format!("{}  {}", a.name, format_optional(&a.level, "-"))
        }),
        Resource::Tickets => typed(record, |t: Ticket| {
            format!(
                "{}  {}  {}",
                t.status(),
                t.summary(),
                format_date(&t.common().created_at)
            )
        }),
        Resource::Users => typed(record, |u: CognitoUser| {
            let state = if u.enabled { "" } else { "  (disabled)" };
            format!("{}  [{}]{}", u.display_name(), u.groups.join(","), state)
        }),
    };
    let id = record
        .get("id")
        .or_else(|| record.get("username"))
        .and_then(Value::as_str)
        .unwrap_or("?");
    match line {
        Some(line) => format!("{}  {}", id, truncate(&line, MAX_LINE)),
        None => id.to_string(),
    }
}

fn typed<T: DeserializeOwned>(record: &Value, render: impl FnOnce(T) -> String) -> Option<String> {
    serde_json::from_value(record.clone()).ok().map(render)
}

/// Indented outline, one record per line: `name  [id]`
pub fn render_tree<T: TreeRecord>(nodes: &[TreeNode<T>]) -> String {
    let mut out = String::new();
    for root in nodes {
        for (depth, item) in root.walk() {
            out.push_str(&"  ".repeat(depth));
            out.push_str(&truncate(item.name(), MAX_TREE_NAME));
            out.push_str(&format!("  [{}]\n", item.id()));
        }
    }
    out
}
