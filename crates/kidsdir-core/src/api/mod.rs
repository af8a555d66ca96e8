//! REST API client module for the directory backend.
//!
//! This module provides the `ApiClient` for the versioned, mode-scoped
//! resource endpoints (`/v1/{admin|manager|owner|user}/{resource}`), the
//! cursor pagination types, and the typed `ApiError` raised for every
//! non-2xx response.
//!
//! Requests carry an `Authorization: Bearer` token obtained from the
//! [`crate::auth`] module.

pub mod client;
pub mod error;
pub mod pagination;
pub mod resource;

pub use client::{ApiClient, TokenSource};
pub use error::{ApiError, ErrorBody};
pub use pagination::{ListQuery, Page};
pub use resource::{Access, ApiMode, Resource};
