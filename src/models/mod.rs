use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Caller role resolved from the session. Stored as lowercase text in the
/// accounts table and in session cookies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Officer,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Officer => "officer",
            Role::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "member" => Some(Role::Member),
            "officer" => Some(Role::Officer),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// An account row from the accounts database. The password hash never
/// leaves the db_operations layer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub membership_number: Option<String>,
    pub phone: Option<String>,
    pub active: bool,
    pub joined_date: String,
    pub last_login_time: Option<String>,
}

// ====================================================================
// ========================= ANNOUNCEMENTS ============================
// ====================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

/// Which roles an announcement is addressed to. `All` is visible to
/// everyone including unauthenticated visitors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
    All,
    Members,
    Officers,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    pub id: String,
    pub title: String,
    pub content: String,
    pub priority: Priority,
    pub target_audience: Audience,
    pub pinned: bool,
    pub expiry_date: Option<DateTime<Utc>>,
    pub created_by: i64,
    pub created_by_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ====================================================================
// =========================== BLOG POSTS =============================
// ====================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: String,
    pub author: i64,
    pub author_name: String,
    pub tags: Vec<String>,
    pub published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub views: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// List view of a post, without the full content body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPostSummary {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub author_name: String,
    pub tags: Vec<String>,
    pub published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub views: u64,
    pub created_at: DateTime<Utc>,
}

impl From<&BlogPost> for BlogPostSummary {
    fn from(post: &BlogPost) -> Self {
        BlogPostSummary {
            id: post.id.clone(),
            title: post.title.clone(),
            slug: post.slug.clone(),
            excerpt: post.excerpt.clone(),
            author_name: post.author_name.clone(),
            tags: post.tags.clone(),
            published: post.published,
            published_at: post.published_at,
            views: post.views,
            created_at: post.created_at,
        }
    }
}

// ====================================================================
// ========================== SERVICE HOURS ===========================
// ====================================================================

/// One-shot review lifecycle for logged service hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Approved => "approved",
            ReviewStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceHour {
    pub id: String,
    pub user_id: i64,
    pub user_name: String,
    pub project_id: Option<String>,
    pub project_name: String,
    pub date: NaiveDate,
    pub hours: f64,
    pub description: String,
    pub status: ReviewStatus,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub user_id: i64,
    pub user_name: String,
    pub total_hours: f64,
    pub entries: u32,
}

// ====================================================================
// ======================= PROJECT SUGGESTIONS ========================
// ====================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SuggestionStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "under-review")]
    UnderReview,
    #[serde(rename = "approved")]
    Approved,
    #[serde(rename = "rejected")]
    Rejected,
}

impl SuggestionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionStatus::Pending => "pending",
            SuggestionStatus::UnderReview => "under-review",
            SuggestionStatus::Approved => "approved",
            SuggestionStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<SuggestionStatus> {
        match s {
            "pending" => Some(SuggestionStatus::Pending),
            "under-review" => Some(SuggestionStatus::UnderReview),
            "approved" => Some(SuggestionStatus::Approved),
            "rejected" => Some(SuggestionStatus::Rejected),
            _ => None,
        }
    }
}

/// Suggestions may be submitted in either of the club's two languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionLanguage {
    En,
    Si,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestedBy {
    pub id: i64,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSuggestion {
    pub id: String,
    pub title: String,
    pub description: String,
    pub language: SuggestionLanguage,
    pub category: String,
    pub estimated_budget: Option<f64>,
    pub proposed_dates: Vec<NaiveDate>,
    pub beneficiaries: Option<String>,
    pub location: Option<String>,
    pub expected_outcome: Option<String>,
    pub resources: Vec<String>,
    pub suggested_by: SuggestedBy,
    pub status: SuggestionStatus,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_notes: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

// ====================================================================
// ====================== MEMBERSHIP APPLICATIONS =====================
// ====================================================================

/// Applications are created with a fixed `pending` status. No operation
/// in the system advances it; see DESIGN.md.
pub const APPLICATION_STATUS_PENDING: &str = "pending";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipApplication {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub date_of_birth: NaiveDate,
    pub address: String,
    pub school_or_university: Option<String>,
    pub grade_or_year: Option<String>,
    pub motivation: String,
    pub experience: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

// ====================================================================
// ============================= EVENTS ===============================
// ====================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeetingType {
    General,
    Board,
    Event,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RsvpStatus {
    Going,
    Maybe,
    Notgoing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rsvp {
    pub user_id: i64,
    pub user_name: String,
    pub user_email: String,
    pub status: RsvpStatus,
    pub responded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub user_id: i64,
    pub user_name: String,
    pub user_email: String,
    pub status: AttendanceStatus,
    pub marked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub title: String,
    pub description: String,
    pub date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub location: String,
    pub category: String,
    pub max_attendees: Option<u32>,
    pub registration_deadline: Option<DateTime<Utc>>,
    pub meeting_type: MeetingType,
    pub rsvps: Vec<Rsvp>,
    #[serde(default)]
    pub attendance: Vec<AttendanceRecord>,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Number of confirmed attendees, checked against `max_attendees`.
    pub fn going_count(&self) -> usize {
        self.rsvps
            .iter()
            .filter(|r| r.status == RsvpStatus::Going)
            .count()
    }
}

// ====================================================================
// ========================== INTAKE RECORDS ==========================
// ====================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactStatus {
    New,
    Read,
    Replied,
}

impl ContactStatus {
    pub fn parse(s: &str) -> Option<ContactStatus> {
        match s {
            "new" => Some(ContactStatus::New),
            "read" => Some(ContactStatus::Read),
            "replied" => Some(ContactStatus::Replied),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactMessage {
    pub id: String,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub status: ContactStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: String,
    pub payer_name: String,
    pub payer_email: String,
    pub amount_cents: i64,
    pub currency: String,
    pub purpose: String,
    pub reference: Option<String>,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

// ====================================================================
// ============================ ROLLUPS ===============================
// ====================================================================

/// Admin dashboard counters. `total_hours` sums every logged entry
/// regardless of review status, while the leaderboard sums approved
/// entries only; both behaviors are preserved as observed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClubStats {
    pub members: u32,
    pub total_hours: f64,
    pub suggestions: u32,
    pub upcoming_events: u32,
}

pub mod db_operations;
