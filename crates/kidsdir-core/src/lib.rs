//! Client core for the kids-activities directory.
//!
//! - [`api`]: mode-scoped REST client (`admin`, `manager`, `owner`, `user`)
//! - [`auth`]: hosted-UI OAuth2 with PKCE, token refresh and storage
//! - [`cache`] and [`repository`]: stale-while-revalidate reads
//! - [`models`]: directory entities as the backend sends them
//! - [`validation`]: form checks run before writes
//! - [`config`]: file and environment configuration

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod models;
pub mod repository;
pub mod utils;
pub mod validation;

pub use api::{ApiClient, ApiError, ApiMode, ListQuery, Page, Resource};
pub use auth::{AuthError, AuthManager, Role};
pub use config::Config;
pub use repository::ActivityRepository;
pub use validation::ValidationError;
