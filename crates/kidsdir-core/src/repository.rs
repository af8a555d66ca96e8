//! Cached read side of the public directory.
//!
//! `ActivityRepository` serves the consumer screens (search, activity
//! detail, category and area pickers) from the user-mode API through a
//! [`MemoryCache`]. Each read is keyed by what was asked for, so two
//! searches with the same filters share one entry.

use crate::api::{ApiClient, ApiError, ApiMode, ListQuery, Page, Resource};
use crate::cache::{CachePolicy, Fetched, MemoryCache};
use crate::models::tree::{ancestors, build_tree, descendant_ids};
use crate::models::{
    Activity, ActivityCategory, ActivitySearch, ActivitySearchResult, GeographicArea,
    Organization, TreeNode,
};
use crate::utils::{cmp_ignore_case, contains_ignore_case};

const CATEGORIES_KEY: &str = "categories";
const AREAS_KEY: &str = "areas";

#[derive(Clone)]
pub struct ActivityRepository {
    api: ApiClient,
    cache: MemoryCache,
    policy: CachePolicy,
}

impl ActivityRepository {
    pub fn new(api: ApiClient, cache: MemoryCache, policy: CachePolicy) -> Self {
        Self { api, cache, policy }
    }

    pub fn cache(&self) -> &MemoryCache {
        &self.cache
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: CachePolicy) {
        self.policy = policy;
    }

    pub async fn search(
        &self,
        search: &ActivitySearch,
    ) -> Result<Fetched<Page<ActivitySearchResult>>, ApiError> {
        let api = self.api.clone();
        let search = search.clone();
        let key = search.cache_key();
        self.cache
            .fetch(&key, self.policy, move || async move {
                api.search_activities(&search).await
            })
            .await
    }

    pub async fn activity(&self, id: &str) -> Result<Fetched<Activity>, ApiError> {
        self.get_one(Resource::Activities, id).await
    }

    pub async fn organization(&self, id: &str) -> Result<Fetched<Organization>, ApiError> {
        self.get_one(Resource::Organizations, id).await
    }

    /// Flat category list, every page
    pub async fn category_list(&self) -> Result<Fetched<Vec<ActivityCategory>>, ApiError> {
        self.get_all(CATEGORIES_KEY, Resource::Categories).await
    }

    pub async fn categories(&self) -> Result<Fetched<Vec<TreeNode<ActivityCategory>>>, ApiError> {
        let fetched = self.category_list().await?;
        Ok(Fetched {
            data: build_tree(&fetched.data),
            freshness: fetched.freshness,
            cached_at: fetched.cached_at,
        })
    }

    /// A category id plus all of its descendants, for "anything under
    /// Sports" style filters. Unknown ids yield just themselves.
    pub async fn category_with_descendants(&self, id: &str) -> Result<Vec<String>, ApiError> {
        let fetched = self.category_list().await?;
        Ok(descendant_ids(&fetched.data, id))
    }

    /// Categories whose name contains `needle` (any case), each paired
    /// with its breadcrumb, e.g. `Sport > Water > Swimming`.
    pub async fn find_categories(
        &self,
        needle: &str,
    ) -> Result<Vec<(ActivityCategory, String)>, ApiError> {
        let fetched = self.category_list().await?;
        let all = &fetched.data;
        let mut found: Vec<(ActivityCategory, String)> = all
            .iter()
            .filter(|c| contains_ignore_case(&c.name, needle))
            .map(|c| {
                let mut path: Vec<&str> = ancestors(all, &c.id)
                    .into_iter()
                    .rev()
                    .map(|a| a.name.as_str())
                    .collect();
                path.push(&c.name);
                (c.clone(), path.join(" > "))
            })
            .collect();
        found.sort_by(|a, b| cmp_ignore_case(&a.1, &b.1));
        Ok(found)
    }

    pub async fn area_list(&self) -> Result<Fetched<Vec<GeographicArea>>, ApiError> {
        self.get_all(AREAS_KEY, Resource::Areas).await
    }

    /// Active areas as a tree
    pub async fn areas(&self) -> Result<Fetched<Vec<TreeNode<GeographicArea>>>, ApiError> {
        let fetched = self.area_list().await?;
        let active: Vec<GeographicArea> = fetched.data.into_iter().filter(|a| a.active).collect();
        Ok(Fetched {
            data: build_tree(&active),
            freshness: fetched.freshness,
            cached_at: fetched.cached_at,
        })
    }

    /// Drop cached reads touched by a write to `resource`
    pub fn invalidate(&self, resource: Resource) {
        match resource {
            Resource::Categories => self.cache.invalidate(CATEGORIES_KEY),
            Resource::Areas => self.cache.invalidate(AREAS_KEY),
            Resource::Activities => self.cache.invalidate_prefix(&item_key(resource, "")),
            Resource::Organizations => self.cache.invalidate_prefix(&item_key(resource, "")),
            Resource::Tickets | Resource::Users => return,
            _ => {}
        }
        // Search rows embed every public entity
        self.cache.invalidate_prefix("search");
    }

    pub fn clear(&self) {
        self.cache.clear();
    }

    async fn get_one<T>(&self, resource: Resource, id: &str) -> Result<Fetched<T>, ApiError>
    where
        T: serde::Serialize + serde::de::DeserializeOwned + Send + 'static,
    {
        let api = self.api.clone();
        let owned_id = id.to_string();
        self.cache
            .fetch(&item_key(resource, id), self.policy, move || async move {
                api.get(ApiMode::User, resource, &owned_id).await
            })
            .await
    }

    async fn get_all<T>(&self, key: &str, resource: Resource) -> Result<Fetched<Vec<T>>, ApiError>
    where
        T: serde::Serialize + serde::de::DeserializeOwned + Send + 'static,
    {
        let api = self.api.clone();
        self.cache
            .fetch(key, self.policy, move || async move {
                api.list_all_vec(ApiMode::User, resource, ListQuery::new()).await
            })
            .await
    }
}

fn item_key(resource: Resource, id: &str) -> String {
    format!("{}/{}", resource.path(), id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheManager;

    fn repository() -> ActivityRepository {
        let api = ApiClient::new("http://127.0.0.1:9").expect("client");
        ActivityRepository::new(api, MemoryCache::new(), CachePolicy::default())
    }

    fn category(id: &str, parent: Option<&str>, name: &str, order: i32) -> ActivityCategory {
        ActivityCategory {
            id: id.to_string(),
            parent_id: parent.map(str::to_string),
            name: name.to_string(),
            display_order: order,
        }
    }

    #[tokio::test]
    async fn test_categories_built_from_cached_list() {
        let repo = repository();
        repo.cache().put(
            CATEGORIES_KEY,
            &vec![
                category("swim", Some("sport"), "Swimming", 1),
                category("sport", None, "Sport", 0),
                category("ball", Some("sport"), "Ball games", 0),
            ],
        );

        let tree = repo.categories().await.expect("cached");
        assert_eq!(tree.data.len(), 1);
        let names: Vec<&str> = tree.data[0].children.iter().map(|c| c.item.name.as_str()).collect();
        assert_eq!(names, vec!["Ball games", "Swimming"]);

        let ids = repo.category_with_descendants("sport").await.expect("ids");
        assert_eq!(ids.len(), 3);
        assert_eq!(ids[0], "sport");
    }

    #[tokio::test]
    async fn test_find_categories_with_breadcrumbs() {
        let repo = repository();
        repo.cache().put(
            CATEGORIES_KEY,
            &vec![
                category("sport", None, "Sport", 0),
                category("water", Some("sport"), "Water", 0),
                category("swim", Some("water"), "Swimming", 0),
                category("art", None, "Art", 1),
            ],
        );

        let found = repo.find_categories("SWIM").await.expect("cached");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0.id, "swim");
        assert_eq!(found[0].1, "Sport > Water > Swimming");

        let found = repo.find_categories("a").await.expect("cached");
        let paths: Vec<&str> = found.iter().map(|(_, p)| p.as_str()).collect();
        assert_eq!(paths, vec!["Art", "Sport > Water"]);
    }

    #[tokio::test]
    async fn test_inactive_areas_hidden() {
        let repo = repository();
        let areas = serde_json::json!([
            {"id": "hk", "name": "Hong Kong Island", "level": "region"},
            {"id": "old", "name": "Retired", "level": "region", "active": false}
        ]);
        repo.cache().put(AREAS_KEY, &areas);

        let tree = repo.areas().await.expect("cached");
        assert_eq!(tree.data.len(), 1);
        assert_eq!(tree.data[0].item.id, "hk");
    }

    #[test]
    fn test_invalidate_drops_search_and_items() {
        let repo = repository();
        repo.cache().put("search?age=5", &1);
        repo.cache().put("activities/a1", &2);
        repo.cache().put("organizations/o1", &3);
        repo.cache().put(CATEGORIES_KEY, &4);

        repo.invalidate(Resource::Activities);
        assert!(repo.cache().get::<i32>("search?age=5").is_none());
        assert!(repo.cache().get::<i32>("activities/a1").is_none());
        assert!(repo.cache().get::<i32>("organizations/o1").is_some());
        assert!(repo.cache().get::<i32>(CATEGORIES_KEY).is_some());

        repo.invalidate(Resource::Tickets);
        assert_eq!(repo.cache().len(), 2);
    }

    #[test]
    fn test_invalidate_after_restart_clears_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let disk = CacheManager::new(dir.path().to_path_buf()).expect("disk");
        let api = ApiClient::new("http://127.0.0.1:9").expect("client");
        let open = || {
            ActivityRepository::new(
                api.clone(),
                MemoryCache::with_disk(disk.clone()),
                CachePolicy::default(),
            )
        };

        let first = open();
        first.cache().put("search?age=5", &vec!["old row"]);
        first.cache().put("activities/a1", &"old activity");

        open().invalidate(Resource::Activities);

        let third = open();
        assert!(third.cache().get::<Vec<String>>("search?age=5").is_none());
        assert!(third.cache().get::<String>("activities/a1").is_none());
    }
}
