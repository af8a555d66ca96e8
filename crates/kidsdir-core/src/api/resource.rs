//! Resource collections and the API modes that expose them.
//!
//! The backend serves the same logical resource under several path
//! prefixes: `/v1/admin/...` with full access, `/v1/manager/...` (and the
//! older `/v1/owner/...`) scoped to the caller's organizations, and
//! `/v1/user/...` for public reads and ticket submission. Which operations
//! exist under which prefix is decided here, before any request is built.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiMode {
    Admin,
    Manager,
    /// Legacy name for `Manager`; same capabilities, own path prefix.
    Owner,
    User,
}

impl ApiMode {
    pub const ALL: [ApiMode; 4] = [ApiMode::Admin, ApiMode::Manager, ApiMode::Owner, ApiMode::User];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApiMode::Admin => "admin",
            ApiMode::Manager => "manager",
            ApiMode::Owner => "owner",
            ApiMode::User => "user",
        }
    }

    /// Whether `access` to `resource` exists under this mode
    pub fn supports(&self, resource: Resource, access: Access) -> bool {
        use Resource::*;
        match self {
            ApiMode::Admin => true,
            ApiMode::Manager | ApiMode::Owner => match resource {
                Organizations | Locations | Activities | Pricing | Schedules => true,
                Categories | Areas => access == Access::Read,
                Tickets => true,
                Users => false,
            },
            ApiMode::User => match resource {
                Organizations | Locations | Activities | Pricing | Schedules | Categories | Areas => {
                    access == Access::Read
                }
                Tickets => true,
                Users => false,
            },
        }
    }

    /// Resources readable under this mode, in display order
    pub fn resources(&self) -> Vec<Resource> {
        Resource::ALL
            .iter()
            .copied()
            .filter(|r| self.supports(*r, Access::Read))
            .collect()
    }
}

impl std::fmt::Display for ApiMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ApiMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(ApiMode::Admin),
            "manager" => Ok(ApiMode::Manager),
            "owner" => Ok(ApiMode::Owner),
            "user" | "public" => Ok(ApiMode::User),
            other => Err(format!("unknown API mode: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Organizations,
    Locations,
    Activities,
    Pricing,
    Schedules,
    Categories,
    Areas,
    Tickets,
    Users,
}

impl Resource {
    pub const ALL: [Resource; 9] = [
        Resource::Organizations,
        Resource::Locations,
        Resource::Activities,
        Resource::Pricing,
        Resource::Schedules,
        Resource::Categories,
        Resource::Areas,
        Resource::Tickets,
        Resource::Users,
    ];

    /// Path segment under `/v1/{mode}/`
    pub fn path(&self) -> &'static str {
        match self {
            Resource::Organizations => "organizations",
            Resource::Locations => "locations",
            Resource::Activities => "activities",
            Resource::Pricing => "pricing",
            Resource::Schedules => "schedules",
            Resource::Categories => "activity-categories",
            Resource::Areas => "areas",
            Resource::Tickets => "tickets",
            Resource::Users => "users",
        }
    }

    /// Whether the admin import/export endpoints exist for this resource
    pub fn supports_bulk(&self) -> bool {
        !matches!(self, Resource::Tickets | Resource::Users)
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

impl std::str::FromStr for Resource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "organizations" | "organization" | "orgs" => Ok(Resource::Organizations),
            "locations" | "location" => Ok(Resource::Locations),
            "activities" | "activity" => Ok(Resource::Activities),
            "pricing" | "prices" => Ok(Resource::Pricing),
            "schedules" | "schedule" => Ok(Resource::Schedules),
            "categories" | "category" | "activity-categories" => Ok(Resource::Categories),
            "areas" | "area" | "geographic-areas" => Ok(Resource::Areas),
            "tickets" | "ticket" => Ok(Resource::Tickets),
            "users" | "user" => Ok(Resource::Users),
            other => Err(format!("unknown resource: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    Read,
    Write,
}

impl std::fmt::Display for Access {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Access::Read => write!(f, "read"),
            Access::Write => write!(f, "write"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_supports_everything() {
        for resource in Resource::ALL {
            assert!(ApiMode::Admin.supports(resource, Access::Read));
            assert!(ApiMode::Admin.supports(resource, Access::Write));
        }
    }

    #[test]
    fn test_manager_and_owner_share_capabilities() {
        for resource in Resource::ALL {
            for access in [Access::Read, Access::Write] {
                assert_eq!(
                    ApiMode::Manager.supports(resource, access),
                    ApiMode::Owner.supports(resource, access),
                    "{} {}",
                    resource,
                    access
                );
            }
        }
        assert!(!ApiMode::Manager.supports(Resource::Users, Access::Read));
        assert!(!ApiMode::Manager.supports(Resource::Categories, Access::Write));
        assert!(ApiMode::Manager.supports(Resource::Activities, Access::Write));
    }

    #[test]
    fn test_user_mode_is_read_only_except_tickets() {
        assert!(ApiMode::User.supports(Resource::Activities, Access::Read));
        assert!(!ApiMode::User.supports(Resource::Activities, Access::Write));
        assert!(ApiMode::User.supports(Resource::Tickets, Access::Write));
        assert!(!ApiMode::User.resources().contains(&Resource::Users));
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("Owner".parse::<ApiMode>(), Ok(ApiMode::Owner));
        assert_eq!("category".parse::<Resource>(), Ok(Resource::Categories));
        assert_eq!(Resource::Categories.path(), "activity-categories");
        assert!("widgets".parse::<Resource>().is_err());
    }
}
