//! Data models for directory entities.
//!
//! Every type here mirrors the backend JSON one-to-one. Records are flat;
//! the only structure the client builds on top of them is the category and
//! geographic-area trees (see [`tree`]).
//!
//! - `Organization`, `Location`, `Activity`: the directory itself
//! - `Pricing`, `Schedule`: what an activity costs and when it runs
//! - `ActivityCategory`, `GeographicArea`: taxonomy trees
//! - `CognitoUser`: admin-side user management
//! - `Ticket`: access requests, organization suggestions and feedback
//! - `ActivitySearchResult`: the public search row

pub mod activity;
pub mod area;
pub mod category;
pub mod location;
pub mod media;
pub mod organization;
pub mod pricing;
pub mod schedule;
pub mod search;
pub mod ticket;
pub mod tree;
pub mod user;

pub use activity::Activity;
pub use area::GeographicArea;
pub use category::ActivityCategory;
pub use location::Location;
pub use media::{ImportRowError, ImportSummary, MediaUpload, MediaUploadRequest};
pub use organization::Organization;
pub use pricing::{Pricing, PricingType};
pub use schedule::{Schedule, ScheduleEntry};
pub use search::{ActivitySearch, ActivitySearchResult};
pub use ticket::{
    AccessRequest, Feedback, OrganizationSuggestion, ReviewAction, Ticket, TicketCommon,
    TicketReview, TicketStatus,
};
pub use tree::{TreeNode, TreeRecord};
pub use user::CognitoUser;
