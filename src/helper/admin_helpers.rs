use chrono::{DateTime, Datelike, Utc};
use rand::Rng;
use redb::Database;
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::ApiError;
use crate::helper::{sanitization_helpers, validation_helpers};
use crate::middleware::Caller;
use crate::models::db_operations::{
    accounts_db_operations, announcements_db_operations, applications_db_operations,
    blog_db_operations, events_db_operations, intake_db_operations,
    service_hours_db_operations, suggestions_db_operations,
};
use crate::models::{
    Account, Announcement, Audience, BlogPost, ClubStats, ContactMessage, ContactStatus, Event,
    MeetingType, MembershipApplication, Payment, Priority, ProjectSuggestion, Role, ServiceHour,
    SuggestionStatus,
};
use crate::policy::workflow::{self, ReviewAction};
use crate::policy::{self, Operation, ResourceKind};
use crate::DbPool;

// ====================================================================
// ============================ ACCOUNTS ==============================
// ====================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterAccountRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub phone: Option<String>,
}

fn generate_membership_number(now: DateTime<Utc>) -> String {
    let serial: u16 = rand::thread_rng().gen_range(0..10000);
    format!("MBR-{}-{:04}", now.year(), serial)
}

/// Creates an account on behalf of the caller. Admins may assign any
/// role; officers may only create plain member accounts.
pub fn create_account(
    pool: &DbPool,
    caller: &Caller,
    request: &RegisterAccountRequest,
) -> Result<Account, ApiError> {
    policy::can_perform(Some(caller.role), Operation::Create, ResourceKind::Account)?;
    policy::can_create_account(caller.role, request.role)?;

    let name =
        validation_helpers::require_trimmed(&request.name, "name").map_err(ApiError::Validation)?;
    if !validation_helpers::is_plausible_email(&request.email) {
        return Err(ApiError::Validation("A valid email is required.".to_string()));
    }
    if request.password.len() < 8 {
        return Err(ApiError::Validation(
            "Password must be at least 8 characters.".to_string(),
        ));
    }

    let membership_number = generate_membership_number(Utc::now());
    let conn = pool.get()?;
    let id = accounts_db_operations::create_account(
        &conn,
        &sanitization_helpers::strip_all_html(&name),
        request.email.trim(),
        &request.password,
        request.role,
        Some(&membership_number),
        request.phone.as_deref(),
    )?;

    accounts_db_operations::read_account_by_id(&conn, id).ok_or_else(|| {
        log::error!("Account {} vanished right after creation.", id);
        ApiError::Database
    })
}

pub fn fetch_all_accounts(pool: &DbPool, caller: &Caller) -> Result<Vec<Account>, ApiError> {
    policy::can_perform(Some(caller.role), Operation::ReadAll, ResourceKind::Account)?;
    let conn = pool.get()?;
    Ok(accounts_db_operations::read_all_accounts(&conn)?)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountRequest {
    pub role: Role,
    pub active: bool,
    pub new_password: Option<String>,
}

/// Admin-only mutation of role, active flag and credentials. Accounts
/// are never hard-deleted; deactivation is the retirement path.
pub fn update_account(
    pool: &DbPool,
    caller: &Caller,
    account_id: i64,
    request: &UpdateAccountRequest,
) -> Result<Account, ApiError> {
    policy::can_perform(Some(caller.role), Operation::Transition, ResourceKind::Account)?;

    let conn = pool.get()?;
    let updated = accounts_db_operations::update_account(
        &conn,
        account_id,
        request.role,
        request.active,
        request.new_password.as_deref(),
    )?;
    if updated == 0 {
        return Err(ApiError::NotFound("Account not found.".to_string()));
    }
    accounts_db_operations::read_account_by_id(&conn, account_id)
        .ok_or_else(|| ApiError::NotFound("Account not found.".to_string()))
}

// ====================================================================
// ========================= ANNOUNCEMENTS ============================
// ====================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementRequest {
    pub title: String,
    pub content: String,
    pub priority: Priority,
    pub target_audience: Audience,
    #[serde(default)]
    pub pinned: bool,
    pub expiry_date: Option<DateTime<Utc>>,
}

pub fn create_announcement(
    db: &Database,
    caller: &Caller,
    request: &AnnouncementRequest,
) -> Result<Announcement, ApiError> {
    policy::can_perform(Some(caller.role), Operation::Create, ResourceKind::Announcement)?;

    let title = validation_helpers::require_trimmed(&request.title, "title")
        .map_err(ApiError::Validation)?;
    let content = validation_helpers::require_trimmed(&request.content, "content")
        .map_err(ApiError::Validation)?;

    let now = Utc::now();
    let announcement = Announcement {
        id: Uuid::new_v4().to_string(),
        title: sanitization_helpers::strip_all_html(&title),
        content: sanitization_helpers::sanitize_markdown_content(&content),
        priority: request.priority,
        target_audience: request.target_audience,
        pinned: request.pinned,
        expiry_date: request.expiry_date,
        created_by: caller.id,
        created_by_name: caller.name.clone(),
        created_at: now,
        updated_at: now,
    };
    announcements_db_operations::create_announcement(db, &announcement)?;
    Ok(announcement)
}

pub fn update_announcement(
    db: &Database,
    caller: &Caller,
    announcement_id: &str,
    request: &AnnouncementRequest,
) -> Result<Announcement, ApiError> {
    policy::can_perform(
        Some(caller.role),
        Operation::Transition,
        ResourceKind::Announcement,
    )?;

    let mut announcement = announcements_db_operations::read_announcement(db, announcement_id)?
        .ok_or_else(|| ApiError::NotFound("Announcement not found.".to_string()))?;

    let title = validation_helpers::require_trimmed(&request.title, "title")
        .map_err(ApiError::Validation)?;
    let content = validation_helpers::require_trimmed(&request.content, "content")
        .map_err(ApiError::Validation)?;

    announcement.title = sanitization_helpers::strip_all_html(&title);
    announcement.content = sanitization_helpers::sanitize_markdown_content(&content);
    announcement.priority = request.priority;
    announcement.target_audience = request.target_audience;
    announcement.pinned = request.pinned;
    announcement.expiry_date = request.expiry_date;
    announcement.updated_at = Utc::now();

    announcements_db_operations::update_announcement(db, &announcement)?;
    Ok(announcement)
}

pub fn delete_announcement(
    db: &Database,
    caller: &Caller,
    announcement_id: &str,
) -> Result<(), ApiError> {
    policy::can_perform(Some(caller.role), Operation::Delete, ResourceKind::Announcement)?;
    if announcements_db_operations::delete_announcement(db, announcement_id)? {
        Ok(())
    } else {
        Err(ApiError::NotFound("Announcement not found.".to_string()))
    }
}

// ====================================================================
// =========================== BLOG POSTS =============================
// ====================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishToggleRequest {
    pub post_id: String,
    pub published: bool,
}

/// The publish/unpublish toggle, the one bidirectional transition in
/// the model.
pub fn set_post_published(
    db: &Database,
    caller: &Caller,
    request: &PublishToggleRequest,
) -> Result<BlogPost, ApiError> {
    policy::can_perform(Some(caller.role), Operation::Transition, ResourceKind::BlogPost)?;
    Ok(blog_db_operations::set_published(
        db,
        &request.post_id,
        request.published,
    )?)
}

// ====================================================================
// ========================== SERVICE HOURS ===========================
// ====================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewHoursRequest {
    pub action: String,
    pub rejection_reason: Option<String>,
}

/// Approves or rejects a pending entry. Rejection needs a reason, and
/// reviewed entries are terminal; both rules come from the workflow
/// transition table.
pub fn review_service_hours(
    db: &Database,
    caller: &Caller,
    entry_id: &str,
    request: &ReviewHoursRequest,
) -> Result<ServiceHour, ApiError> {
    policy::can_perform(
        Some(caller.role),
        Operation::Transition,
        ResourceKind::ServiceHour,
    )?;

    let action = ReviewAction::from_request(&request.action, request.rejection_reason.as_deref())?;

    let mut entry = service_hours_db_operations::read_service_hour(db, entry_id)?
        .ok_or_else(|| ApiError::NotFound("Service hour entry not found.".to_string()))?;

    entry.status = workflow::review_transition(entry.status, &action)?;
    let now = Utc::now();
    match &action {
        ReviewAction::Approve => {
            entry.approved_by = Some(caller.name.clone());
            entry.approved_at = Some(now);
        }
        ReviewAction::Reject { reason } => {
            entry.rejection_reason = Some(reason.clone());
        }
    }
    entry.updated_at = now;

    service_hours_db_operations::update_service_hour(db, &entry)?;
    Ok(entry)
}

// ====================================================================
// ======================= PROJECT SUGGESTIONS ========================
// ====================================================================

pub fn list_suggestions(
    db: &Database,
    caller: &Caller,
    status_filter: Option<SuggestionStatus>,
) -> Result<Vec<ProjectSuggestion>, ApiError> {
    policy::can_perform(
        Some(caller.role),
        Operation::ReadAll,
        ResourceKind::ProjectSuggestion,
    )?;
    Ok(suggestions_db_operations::list_suggestions(db, status_filter)?)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSuggestionRequest {
    pub suggestion_id: String,
    pub status: SuggestionStatus,
    pub review_notes: Option<String>,
}

/// One-shot suggestion review by an officer or admin.
pub fn review_suggestion(
    db: &Database,
    caller: &Caller,
    request: &ReviewSuggestionRequest,
) -> Result<ProjectSuggestion, ApiError> {
    policy::can_perform(
        Some(caller.role),
        Operation::Transition,
        ResourceKind::ProjectSuggestion,
    )?;

    let mut suggestion = suggestions_db_operations::read_suggestion(db, &request.suggestion_id)?
        .ok_or_else(|| ApiError::NotFound("Suggestion not found.".to_string()))?;

    suggestion.status = workflow::suggestion_transition(suggestion.status, request.status)?;
    suggestion.reviewed_by = Some(caller.name.clone());
    suggestion.reviewed_at = Some(Utc::now());
    suggestion.review_notes = request
        .review_notes
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(String::from);

    suggestions_db_operations::update_suggestion(db, &suggestion)?;
    Ok(suggestion)
}

pub fn delete_suggestion(db: &Database, caller: &Caller, suggestion_id: &str) -> Result<(), ApiError> {
    policy::can_perform(
        Some(caller.role),
        Operation::Delete,
        ResourceKind::ProjectSuggestion,
    )?;
    if suggestions_db_operations::delete_suggestion(db, suggestion_id)? {
        Ok(())
    } else {
        Err(ApiError::NotFound("Suggestion not found.".to_string()))
    }
}

// ====================================================================
// ====================== MEMBERSHIP APPLICATIONS =====================
// ====================================================================

pub fn list_applications(
    db: &Database,
    caller: &Caller,
) -> Result<Vec<MembershipApplication>, ApiError> {
    policy::can_perform(
        Some(caller.role),
        Operation::ReadAll,
        ResourceKind::MembershipApplication,
    )?;
    Ok(applications_db_operations::list_applications(db)?)
}

// ====================================================================
// ============================= EVENTS ===============================
// ====================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRequest {
    pub title: String,
    pub description: String,
    pub date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub location: String,
    pub category: String,
    pub max_attendees: Option<u32>,
    pub registration_deadline: Option<DateTime<Utc>>,
    pub meeting_type: MeetingType,
}

fn validated_event_fields(request: &EventRequest) -> Result<(String, String, String), ApiError> {
    let title = validation_helpers::require_trimmed(&request.title, "title")
        .map_err(ApiError::Validation)?;
    let description = validation_helpers::require_trimmed(&request.description, "description")
        .map_err(ApiError::Validation)?;
    let location = validation_helpers::require_trimmed(&request.location, "location")
        .map_err(ApiError::Validation)?;
    if let Some(end) = request.end_date {
        if end < request.date {
            return Err(ApiError::Validation(
                "End date must not be before the start date.".to_string(),
            ));
        }
    }
    Ok((
        sanitization_helpers::strip_all_html(&title),
        sanitization_helpers::strip_all_html(&description),
        sanitization_helpers::strip_all_html(&location),
    ))
}

pub fn create_event(
    db: &Database,
    caller: &Caller,
    request: &EventRequest,
) -> Result<Event, ApiError> {
    policy::can_perform(Some(caller.role), Operation::Create, ResourceKind::Event)?;
    let (title, description, location) = validated_event_fields(request)?;

    let now = Utc::now();
    let event = Event {
        id: Uuid::new_v4().to_string(),
        title,
        description,
        date: request.date,
        end_date: request.end_date,
        location,
        category: sanitization_helpers::strip_all_html(request.category.trim()),
        max_attendees: request.max_attendees,
        registration_deadline: request.registration_deadline,
        meeting_type: request.meeting_type,
        rsvps: vec![],
        attendance: vec![],
        created_by: caller.id,
        created_at: now,
        updated_at: now,
    };
    events_db_operations::create_event(db, &event)?;
    Ok(event)
}

/// Admin update of the event description fields. RSVPs and attendance
/// records already collected are carried over untouched.
pub fn update_event(
    db: &Database,
    caller: &Caller,
    event_id: &str,
    request: &EventRequest,
) -> Result<Event, ApiError> {
    policy::can_perform(Some(caller.role), Operation::Transition, ResourceKind::Event)?;
    let (title, description, location) = validated_event_fields(request)?;

    let mut event = events_db_operations::read_event(db, event_id)?
        .ok_or_else(|| ApiError::NotFound("Event not found.".to_string()))?;

    event.title = title;
    event.description = description;
    event.date = request.date;
    event.end_date = request.end_date;
    event.location = location;
    event.category = sanitization_helpers::strip_all_html(request.category.trim());
    event.max_attendees = request.max_attendees;
    event.registration_deadline = request.registration_deadline;
    event.meeting_type = request.meeting_type;
    event.updated_at = Utc::now();

    events_db_operations::update_event(db, &event)?;
    Ok(event)
}

pub fn delete_event(db: &Database, caller: &Caller, event_id: &str) -> Result<(), ApiError> {
    policy::can_perform(Some(caller.role), Operation::Delete, ResourceKind::Event)?;
    if events_db_operations::delete_event(db, event_id)? {
        Ok(())
    } else {
        Err(ApiError::NotFound("Event not found.".to_string()))
    }
}

// ====================================================================
// ========================== INTAKE QUEUES ===========================
// ====================================================================

pub fn list_contact_messages(
    db: &Database,
    caller: &Caller,
    status_filter: Option<ContactStatus>,
) -> Result<Vec<ContactMessage>, ApiError> {
    policy::can_perform(
        Some(caller.role),
        Operation::ReadAll,
        ResourceKind::ContactMessage,
    )?;
    Ok(intake_db_operations::list_contact_messages(db, status_filter)?)
}

pub fn list_payments(db: &Database, caller: &Caller) -> Result<Vec<Payment>, ApiError> {
    policy::can_perform(Some(caller.role), Operation::ReadAll, ResourceKind::Payment)?;
    Ok(intake_db_operations::list_payments(db)?)
}

// ====================================================================
// ============================== STATS ===============================
// ====================================================================

/// Dashboard rollup. Note the hours figure sums every logged entry
/// regardless of review status, unlike the leaderboard.
pub fn club_stats(pool: &DbPool, db: &Database, caller: &Caller) -> Result<ClubStats, ApiError> {
    if caller.role != Role::Admin {
        return Err(ApiError::Forbidden("Admin role required.".to_string()));
    }

    let conn = pool.get()?;
    Ok(ClubStats {
        members: accounts_db_operations::count_active_accounts(&conn)?,
        total_hours: service_hours_db_operations::total_hours(db)?,
        suggestions: suggestions_db_operations::count_suggestions(db)?,
        upcoming_events: events_db_operations::count_upcoming_events(db, Utc::now())?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helper::member_helpers::{self, SubmitServiceHoursRequest};
    use crate::models::ReviewStatus;
    use crate::setup::db_setup;
    use chrono::NaiveDate;
    use r2d2_sqlite::SqliteConnectionManager;
    use redb::backends::InMemoryBackend;

    fn test_db() -> Database {
        let db = Database::builder()
            .create_with_backend(InMemoryBackend::new())
            .expect("in-memory redb");
        db_setup::setup_documents_db(&db).expect("document tables");
        db
    }

    fn test_pool() -> DbPool {
        // A single connection keeps every pool checkout on the same
        // in-memory database.
        let manager = SqliteConnectionManager::memory();
        let pool = r2d2::Pool::builder().max_size(1).build(manager).unwrap();
        {
            let mut conn = pool.get().unwrap();
            db_setup::setup_accounts_db(&mut conn).unwrap();
        }
        pool
    }

    fn caller(id: i64, role: Role) -> Caller {
        Caller {
            id,
            name: format!("User {}", id),
            email: format!("user{}@example.org", id),
            role,
        }
    }

    fn register(role: Role) -> RegisterAccountRequest {
        RegisterAccountRequest {
            name: "Nimal Silva".to_string(),
            email: format!("nimal+{}@example.org", role.as_str()),
            password: "longenoughpassword".to_string(),
            role,
            phone: None,
        }
    }

    #[test]
    fn officers_may_only_register_members() {
        let pool = test_pool();
        let admin = caller(1, Role::Admin);
        let officer = caller(2, Role::Officer);

        // Admin creates an officer account.
        let created = create_account(&pool, &admin, &register(Role::Officer)).unwrap();
        assert_eq!(created.role, Role::Officer);
        assert!(created.membership_number.is_some());

        // The officer can create a member but not another officer.
        assert!(create_account(&pool, &officer, &register(Role::Member)).is_ok());
        let err = create_account(
            &pool,
            &officer,
            &RegisterAccountRequest {
                email: "second-officer@example.org".to_string(),
                ..register(Role::Officer)
            },
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        let member = caller(3, Role::Member);
        assert!(matches!(
            create_account(&pool, &member, &register(Role::Member)),
            Err(ApiError::Forbidden(_))
        ));
    }

    fn pending_entry(db: &Database, user_id: i64) -> ServiceHour {
        member_helpers::submit_service_hours(
            db,
            &caller(user_id, Role::Member),
            &SubmitServiceHoursRequest {
                project_id: None,
                project_name: "Beach Cleanup".to_string(),
                date: NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
                hours: 4.0,
                description: "Cleaned 2km of shoreline".to_string(),
            },
        )
        .unwrap()
    }

    #[test]
    fn approving_hours_moves_them_onto_the_leaderboard() {
        let db = test_db();
        let entry = pending_entry(&db, 4);
        let officer = caller(2, Role::Officer);

        let reviewed = review_service_hours(
            &db,
            &officer,
            &entry.id,
            &ReviewHoursRequest {
                action: "approve".to_string(),
                rejection_reason: None,
            },
        )
        .unwrap();
        assert_eq!(reviewed.status, ReviewStatus::Approved);
        assert_eq!(reviewed.approved_by.as_deref(), Some(officer.name.as_str()));

        let board = member_helpers::leaderboard(&db, 10).unwrap();
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].total_hours, 4.0);
    }

    #[test]
    fn rejecting_without_a_reason_leaves_the_entry_pending() {
        let db = test_db();
        let entry = pending_entry(&db, 4);
        let officer = caller(2, Role::Officer);

        let err = review_service_hours(
            &db,
            &officer,
            &entry.id,
            &ReviewHoursRequest {
                action: "reject".to_string(),
                rejection_reason: None,
            },
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let unchanged = service_hours_db_operations::read_service_hour(&db, &entry.id)
            .unwrap()
            .unwrap();
        assert_eq!(unchanged.status, ReviewStatus::Pending);
    }

    #[test]
    fn reviewed_hours_cannot_be_reviewed_again() {
        let db = test_db();
        let entry = pending_entry(&db, 4);
        let officer = caller(2, Role::Officer);
        let approve = ReviewHoursRequest {
            action: "approve".to_string(),
            rejection_reason: None,
        };

        review_service_hours(&db, &officer, &entry.id, &approve).unwrap();
        let err = review_service_hours(&db, &officer, &entry.id, &approve).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn members_cannot_review_hours() {
        let db = test_db();
        let entry = pending_entry(&db, 4);
        let err = review_service_hours(
            &db,
            &caller(5, Role::Member),
            &entry.id,
            &ReviewHoursRequest {
                action: "approve".to_string(),
                rejection_reason: None,
            },
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[test]
    fn suggestion_review_is_one_shot_and_records_the_reviewer() {
        let db = test_db();
        let member = caller(4, Role::Member);
        let suggestion = member_helpers::submit_suggestion(
            &db,
            &member,
            &member_helpers::SubmitSuggestionRequest {
                title: "Blood donation camp".to_string(),
                description: "With the local hospital.".to_string(),
                language: crate::models::SuggestionLanguage::En,
                category: "health".to_string(),
                estimated_budget: None,
                proposed_dates: vec![],
                beneficiaries: None,
                location: None,
                expected_outcome: None,
                resources: vec![],
            },
        )
        .unwrap();

        let officer = caller(2, Role::Officer);
        let reviewed = review_suggestion(
            &db,
            &officer,
            &ReviewSuggestionRequest {
                suggestion_id: suggestion.id.clone(),
                status: SuggestionStatus::Approved,
                review_notes: Some("Good initiative".to_string()),
            },
        )
        .unwrap();
        assert_eq!(reviewed.status, SuggestionStatus::Approved);
        assert_eq!(reviewed.reviewed_by.as_deref(), Some(officer.name.as_str()));

        let err = review_suggestion(
            &db,
            &officer,
            &ReviewSuggestionRequest {
                suggestion_id: suggestion.id,
                status: SuggestionStatus::Rejected,
                review_notes: None,
            },
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn stats_sum_all_hours_regardless_of_status() {
        let db = test_db();
        let pool = test_pool();
        let admin = caller(1, Role::Admin);
        create_account(&pool, &admin, &register(Role::Member)).unwrap();

        let entry = pending_entry(&db, 4); // 4.0 pending hours
        let officer = caller(2, Role::Officer);
        review_service_hours(
            &db,
            &officer,
            &entry.id,
            &ReviewHoursRequest {
                action: "approve".to_string(),
                rejection_reason: None,
            },
        )
        .unwrap();
        pending_entry(&db, 5); // another 4.0, still pending

        let stats = club_stats(&pool, &db, &admin).unwrap();
        assert_eq!(stats.members, 1);
        assert_eq!(stats.total_hours, 8.0);
        assert_eq!(stats.suggestions, 0);

        assert!(matches!(
            club_stats(&pool, &db, &caller(2, Role::Officer)),
            Err(ApiError::Forbidden(_))
        ));
    }
}
