use serde::{Deserialize, Serialize};
use url::form_urlencoded;

/// One page of a cursor-paginated listing.
///
/// `next_cursor` is opaque. It is handed back to the server exactly as
/// received; an absent or empty cursor means this was the last page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

impl<T> Page<T> {
    pub fn has_more(&self) -> bool {
        self.next_cursor().is_some()
    }

    pub fn next_cursor(&self) -> Option<&str> {
        self.next_cursor.as_deref().filter(|c| !c.is_empty())
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            next_cursor: self.next_cursor,
        }
    }
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            next_cursor: None,
        }
    }
}

/// Query for a listing call: page size, cursor and resource-specific filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub limit: Option<u32>,
    pub cursor: Option<String>,
    pub filters: Vec<(String, String)>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }

    pub fn filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((key.into(), value.into()));
        self
    }

    /// Query-string pairs; filters first, then `limit` and `cursor`.
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = self.filters.clone();
        if let Some(limit) = self.limit {
            query.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(ref cursor) = self.cursor {
            query.push(("cursor".to_string(), cursor.clone()));
        }
        query
    }

    /// Cache key for this query under a given path prefix
    pub fn cache_key(&self, prefix: &str) -> String {
        query_cache_key(prefix, self.to_query())
    }
}

/// `prefix?k=v&...` with form-encoded pairs, so a value holding `&` or `=`
/// cannot pose as a second filter.
pub(crate) fn query_cache_key<I, K, V>(prefix: &str, pairs: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    serializer.extend_pairs(pairs);
    let query = serializer.finish();
    if query.is_empty() {
        prefix.to_string()
    } else {
        format!("{}?{}", prefix, query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_envelope_parsing() {
        let page: Page<u32> =
            serde_json::from_str(r#"{"items": [1, 2], "next_cursor": "eyJpZCI6IDJ9"}"#).expect("parse");
        assert_eq!(page.items, vec![1, 2]);
        assert!(page.has_more());
        assert_eq!(page.next_cursor(), Some("eyJpZCI6IDJ9"));

        let last: Page<u32> = serde_json::from_str(r#"{"items": []}"#).expect("parse");
        assert!(!last.has_more());

        let empty_cursor: Page<u32> =
            serde_json::from_str(r#"{"items": [], "next_cursor": ""}"#).expect("parse");
        assert!(!empty_cursor.has_more());
    }

    #[test]
    fn test_query_keeps_cursor_verbatim() {
        let query = ListQuery::new()
            .filter("org_id", "o1")
            .with_limit(25)
            .with_cursor("a+b/c==");
        assert_eq!(
            query.to_query(),
            vec![
                ("org_id".to_string(), "o1".to_string()),
                ("limit".to_string(), "25".to_string()),
                ("cursor".to_string(), "a+b/c==".to_string()),
            ]
        );
        assert_eq!(
            query.cache_key("activities"),
            "activities?org_id=o1&limit=25&cursor=a%2Bb%2Fc%3D%3D"
        );
        assert_eq!(ListQuery::new().cache_key("activities"), "activities");
    }

    #[test]
    fn test_cache_key_escapes_values() {
        let smuggled = ListQuery::new().filter("org_id", "o1&limit=5");
        let separate = ListQuery::new().filter("org_id", "o1").with_limit(5);
        assert_ne!(smuggled.cache_key("activities"), separate.cache_key("activities"));
        assert_eq!(smuggled.cache_key("activities"), "activities?org_id=o1%26limit%3D5");
    }

    #[test]
    fn test_page_map() {
        let page = Page {
            items: vec![1, 2, 3],
            next_cursor: Some("n".to_string()),
        };
        let mapped = page.map(|x| x * 10);
        assert_eq!(mapped.items, vec![10, 20, 30]);
        assert_eq!(mapped.next_cursor.as_deref(), Some("n"));
    }
}
