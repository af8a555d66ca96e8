use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum TicketStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TicketStatus::Pending => write!(f, "pending"),
            TicketStatus::Approved => write!(f, "approved"),
            TicketStatus::Rejected => write!(f, "rejected"),
        }
    }
}

/// Fields every ticket carries regardless of its subtype.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct TicketCommon {
    pub id: String,
    pub submitter_id: String,
    #[serde(default)]
    pub submitter_email: Option<String>,
    #[serde(default)]
    pub status: TicketStatus,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reviewed_by: Option<String>,
    #[serde(default)]
    pub admin_notes: Option<String>,
}

/// A user asking to manage an organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct AccessRequest {
    #[serde(flatten)]
    pub common: TicketCommon,
    pub organization_name: String,
    #[serde(default)]
    pub organization_id: Option<String>,
}

/// A user proposing a new organization for the directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct OrganizationSuggestion {
    #[serde(flatten)]
    pub common: TicketCommon,
    pub organization_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub suggested_district: Option<String>,
    #[serde(default)]
    pub suggested_address: Option<String>,
    #[serde(default)]
    pub suggested_lat: Option<f64>,
    #[serde(default)]
    pub suggested_lng: Option<f64>,
}

/// Feedback about an existing organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Feedback {
    #[serde(flatten)]
    pub common: TicketCommon,
    #[serde(default)]
    pub organization_id: Option<String>,
    #[serde(default)]
    pub feedback_stars: Option<u8>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Polymorphic ticket, discriminated by `ticket_type` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "ticket_type", rename_all = "snake_case")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum Ticket {
    AccessRequest(AccessRequest),
    OrganizationSuggestion(OrganizationSuggestion),
    Feedback(Feedback),
}

impl Ticket {
    pub fn common(&self) -> &TicketCommon {
        match self {
            Ticket::AccessRequest(t) => &t.common,
            Ticket::OrganizationSuggestion(t) => &t.common,
            Ticket::Feedback(t) => &t.common,
        }
    }

    pub fn id(&self) -> &str {
        &self.common().id
    }

    pub fn status(&self) -> TicketStatus {
        self.common().status
    }

    pub fn is_pending(&self) -> bool {
        self.status() == TicketStatus::Pending
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Ticket::AccessRequest(_) => "access_request",
            Ticket::OrganizationSuggestion(_) => "organization_suggestion",
            Ticket::Feedback(_) => "feedback",
        }
    }

    /// One-line summary for listings
    pub fn summary(&self) -> String {
        match self {
            Ticket::AccessRequest(t) => format!("access to {}", t.organization_name),
            Ticket::OrganizationSuggestion(t) => format!("suggests {}", t.organization_name),
            Ticket::Feedback(t) => match t.feedback_stars {
                Some(stars) => format!("feedback ({}/5)", stars),
                None => "feedback".to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum ReviewAction {
    Approve,
    Reject,
}

impl std::str::FromStr for ReviewAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "approve" | "approved" => Ok(ReviewAction::Approve),
            "reject" | "rejected" => Ok(ReviewAction::Reject),
            other => Err(format!("unknown review action: {}", other)),
        }
    }
}

/// Body of an admin ticket review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct TicketReview {
    pub action: ReviewAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_notes: Option<String>,
    /// For suggestions: create the organization on approval.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_organization: Option<bool>,
}
