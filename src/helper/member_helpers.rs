use chrono::{NaiveDate, Utc};
use redb::Database;
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::ApiError;
use crate::helper::{sanitization_helpers, validation_helpers};
use crate::middleware::Caller;
use crate::models::db_operations::{
    blog_db_operations, events_db_operations, service_hours_db_operations,
    suggestions_db_operations,
};
use crate::models::{
    AttendanceRecord, AttendanceStatus, BlogPost, Event, LeaderboardEntry, ProjectSuggestion,
    ReviewStatus, Rsvp, RsvpStatus, ServiceHour, SuggestedBy, SuggestionLanguage,
    SuggestionStatus,
};
use crate::policy::{self, Operation, ResourceKind};

// ====================================================================
// ========================== SERVICE HOURS ===========================
// ====================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitServiceHoursRequest {
    pub project_id: Option<String>,
    pub project_name: String,
    pub date: NaiveDate,
    pub hours: f64,
    pub description: String,
}

/// Logs service hours for the caller. Entries always start `pending`;
/// the caller cannot log hours against someone else's account.
pub fn submit_service_hours(
    db: &Database,
    caller: &Caller,
    request: &SubmitServiceHoursRequest,
) -> Result<ServiceHour, ApiError> {
    policy::can_perform(Some(caller.role), Operation::Create, ResourceKind::ServiceHour)?;

    let project_name = validation_helpers::require_trimmed(&request.project_name, "projectName")
        .map_err(ApiError::Validation)?;
    let description = validation_helpers::require_trimmed(&request.description, "description")
        .map_err(ApiError::Validation)?;
    validation_helpers::validate_hours(request.hours).map_err(ApiError::Validation)?;

    let now = Utc::now();
    let entry = ServiceHour {
        id: Uuid::new_v4().to_string(),
        user_id: caller.id,
        user_name: caller.name.clone(),
        project_id: request.project_id.clone(),
        project_name: sanitization_helpers::strip_all_html(&project_name),
        date: request.date,
        hours: request.hours,
        description: sanitization_helpers::strip_all_html(&description),
        status: ReviewStatus::Pending,
        approved_by: None,
        approved_at: None,
        rejection_reason: None,
        created_at: now,
        updated_at: now,
    };
    service_hours_db_operations::create_service_hour(db, &entry)?;
    Ok(entry)
}

/// Lists service hours with row-level scoping: members only ever see
/// their own entries (a foreign `userId` filter is overridden), while
/// moderators may filter by any user or see everything.
pub fn list_service_hours(
    db: &Database,
    caller: &Caller,
    requested_user: Option<i64>,
    status_filter: Option<ReviewStatus>,
) -> Result<Vec<ServiceHour>, ApiError> {
    let op = if policy::is_moderator(caller.role) {
        Operation::ReadAll
    } else {
        Operation::ReadOwn
    };
    policy::can_perform(Some(caller.role), op, ResourceKind::ServiceHour)?;

    let user_filter = policy::effective_hours_filter(caller.role, caller.id, requested_user);
    Ok(service_hours_db_operations::list_service_hours(
        db,
        user_filter,
        status_filter,
    )?)
}

pub fn leaderboard(db: &Database, limit: usize) -> Result<Vec<LeaderboardEntry>, ApiError> {
    Ok(service_hours_db_operations::leaderboard(db, limit)?)
}

// ====================================================================
// =========================== BLOG POSTS =============================
// ====================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBlogPostRequest {
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub published: bool,
}

/// Creates a blog post. The slug is derived from the title and must be
/// unique; a requested `published: true` only sticks for moderators.
pub fn submit_blog_post(
    db: &Database,
    caller: &Caller,
    request: &CreateBlogPostRequest,
) -> Result<BlogPost, ApiError> {
    policy::can_perform(Some(caller.role), Operation::Create, ResourceKind::BlogPost)?;

    let title = validation_helpers::require_trimmed(&request.title, "title")
        .map_err(ApiError::Validation)?;
    let content = validation_helpers::require_trimmed(&request.content, "content")
        .map_err(ApiError::Validation)?;

    let clean_title = sanitization_helpers::strip_all_html(&title);
    let slug = validation_helpers::slugify(&clean_title);
    if slug.is_empty() {
        return Err(ApiError::Validation(
            "Title must contain at least one letter or digit.".to_string(),
        ));
    }

    let published = policy::effective_published(caller.role, request.published);
    let now = Utc::now();
    let excerpt = request
        .excerpt
        .as_deref()
        .map(sanitization_helpers::strip_all_html)
        .filter(|e| !e.trim().is_empty())
        .unwrap_or_else(|| clean_title.clone());

    let post = BlogPost {
        id: Uuid::new_v4().to_string(),
        title: clean_title,
        slug,
        content: sanitization_helpers::sanitize_markdown_content(&content),
        excerpt,
        author: caller.id,
        author_name: caller.name.clone(),
        tags: request
            .tags
            .iter()
            .map(|t| sanitization_helpers::strip_all_html(t.trim()))
            .filter(|t| !t.is_empty())
            .collect(),
        published,
        published_at: if published { Some(now) } else { None },
        views: 0,
        created_at: now,
        updated_at: now,
    };
    blog_db_operations::create_post(db, &post)?;
    Ok(post)
}

// ====================================================================
// ======================= PROJECT SUGGESTIONS ========================
// ====================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitSuggestionRequest {
    pub title: String,
    pub description: String,
    pub language: SuggestionLanguage,
    pub category: String,
    pub estimated_budget: Option<f64>,
    #[serde(default)]
    pub proposed_dates: Vec<NaiveDate>,
    pub beneficiaries: Option<String>,
    pub location: Option<String>,
    pub expected_outcome: Option<String>,
    #[serde(default)]
    pub resources: Vec<String>,
}

pub fn submit_suggestion(
    db: &Database,
    caller: &Caller,
    request: &SubmitSuggestionRequest,
) -> Result<ProjectSuggestion, ApiError> {
    policy::can_perform(
        Some(caller.role),
        Operation::Create,
        ResourceKind::ProjectSuggestion,
    )?;

    let title = validation_helpers::require_trimmed(&request.title, "title")
        .map_err(ApiError::Validation)?;
    let description = validation_helpers::require_trimmed(&request.description, "description")
        .map_err(ApiError::Validation)?;
    let category = validation_helpers::require_trimmed(&request.category, "category")
        .map_err(ApiError::Validation)?;
    if let Some(budget) = request.estimated_budget {
        if !budget.is_finite() || budget < 0.0 {
            return Err(ApiError::Validation(
                "Estimated budget must be a non-negative number.".to_string(),
            ));
        }
    }

    let suggestion = ProjectSuggestion {
        id: Uuid::new_v4().to_string(),
        title: sanitization_helpers::strip_all_html(&title),
        description: sanitization_helpers::strip_all_html(&description),
        language: request.language,
        category: sanitization_helpers::strip_all_html(&category),
        estimated_budget: request.estimated_budget,
        proposed_dates: request.proposed_dates.clone(),
        beneficiaries: request
            .beneficiaries
            .as_deref()
            .map(sanitization_helpers::strip_all_html),
        location: request
            .location
            .as_deref()
            .map(sanitization_helpers::strip_all_html),
        expected_outcome: request
            .expected_outcome
            .as_deref()
            .map(sanitization_helpers::strip_all_html),
        resources: request
            .resources
            .iter()
            .map(|r| sanitization_helpers::strip_all_html(r.trim()))
            .filter(|r| !r.is_empty())
            .collect(),
        suggested_by: SuggestedBy {
            id: caller.id,
            name: caller.name.clone(),
            email: caller.email.clone(),
        },
        status: SuggestionStatus::Pending,
        reviewed_by: None,
        reviewed_at: None,
        review_notes: None,
        submitted_at: Utc::now(),
    };
    suggestions_db_operations::create_suggestion(db, &suggestion)?;
    Ok(suggestion)
}

// ====================================================================
// ============================= EVENTS ===============================
// ====================================================================

/// Events the caller may see; board meetings are filtered out for plain
/// members.
pub fn list_events(db: &Database, caller: &Caller) -> Result<Vec<Event>, ApiError> {
    policy::can_perform(Some(caller.role), Operation::ReadAll, ResourceKind::Event)?;
    let events = events_db_operations::list_events(db)?;
    Ok(events
        .into_iter()
        .filter(|e| policy::can_see_event(caller.role, e.meeting_type))
        .collect())
}

/// Reads one event. Board meetings are reported as missing to callers
/// who may not see them, so their existence is not leaked.
pub fn get_event(db: &Database, caller: &Caller, event_id: &str) -> Result<Event, ApiError> {
    policy::can_perform(Some(caller.role), Operation::ReadAll, ResourceKind::Event)?;
    let event = events_db_operations::read_event(db, event_id)?
        .ok_or_else(|| ApiError::NotFound("Event not found.".to_string()))?;
    if !policy::can_see_event(caller.role, event.meeting_type) {
        return Err(ApiError::NotFound("Event not found.".to_string()));
    }
    Ok(event)
}

#[derive(Debug, Deserialize)]
pub struct RsvpRequest {
    pub status: RsvpStatus,
}

/// RSVPs the caller to an event. Blocked once the registration deadline
/// has passed, and a `going` answer is blocked once the event is full.
/// The store keeps at most one RSVP per user.
pub fn rsvp_to_event(
    db: &Database,
    caller: &Caller,
    event_id: &str,
    request: &RsvpRequest,
) -> Result<Event, ApiError> {
    policy::can_perform(Some(caller.role), Operation::Create, ResourceKind::EventRsvp)?;
    let event = get_event(db, caller, event_id)?;

    let now = Utc::now();
    if let Some(deadline) = event.registration_deadline {
        if now > deadline {
            return Err(ApiError::Validation(
                "The registration deadline for this event has passed.".to_string(),
            ));
        }
    }

    if request.status == RsvpStatus::Going {
        if let Some(max) = event.max_attendees {
            // The caller's own previous `going` answer does not count
            // against them when they re-submit.
            let going_others = event
                .rsvps
                .iter()
                .filter(|r| r.status == RsvpStatus::Going && r.user_id != caller.id)
                .count();
            if going_others >= max as usize {
                return Err(ApiError::Validation("Event is full".to_string()));
            }
        }
    }

    let rsvp = Rsvp {
        user_id: caller.id,
        user_name: caller.name.clone(),
        user_email: caller.email.clone(),
        status: request.status,
        responded_at: now,
    };
    Ok(events_db_operations::upsert_rsvp(db, event_id, rsvp)?)
}

#[derive(Debug, Deserialize)]
pub struct AttendanceRequest {
    pub status: AttendanceStatus,
}

/// Marks the caller's own attendance on an event they can see. One
/// record per user; re-marking overwrites in place.
pub fn mark_attendance(
    db: &Database,
    caller: &Caller,
    event_id: &str,
    request: &AttendanceRequest,
) -> Result<Event, ApiError> {
    policy::can_perform(
        Some(caller.role),
        Operation::Create,
        ResourceKind::EventAttendance,
    )?;
    // Visibility gate; the board filter applies here too.
    get_event(db, caller, event_id)?;

    let record = AttendanceRecord {
        user_id: caller.id,
        user_name: caller.name.clone(),
        user_email: caller.email.clone(),
        status: request.status,
        marked_at: Utc::now(),
    };
    Ok(events_db_operations::upsert_attendance(db, event_id, record)?)
}

pub fn event_attendance(
    db: &Database,
    caller: &Caller,
    event_id: &str,
) -> Result<Vec<AttendanceRecord>, ApiError> {
    policy::can_perform(
        Some(caller.role),
        Operation::ReadAll,
        ResourceKind::EventAttendance,
    )?;
    let event = get_event(db, caller, event_id)?;
    Ok(event.attendance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MeetingType, Role};
    use chrono::Duration;
    use redb::backends::InMemoryBackend;

    fn test_db() -> Database {
        Database::builder()
            .create_with_backend(InMemoryBackend::new())
            .expect("in-memory redb")
    }

    fn caller(id: i64, role: Role) -> Caller {
        Caller {
            id,
            name: format!("Member {}", id),
            email: format!("member{}@example.org", id),
            role,
        }
    }

    fn hours_request(hours: f64) -> SubmitServiceHoursRequest {
        SubmitServiceHoursRequest {
            project_id: None,
            project_name: "Beach Cleanup".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
            hours,
            description: "Cleaned 2km of shoreline".to_string(),
        }
    }

    fn stored_event(db: &Database, max_attendees: Option<u32>, meeting_type: MeetingType) -> Event {
        let now = Utc::now();
        let event = Event {
            id: Uuid::new_v4().to_string(),
            title: "Tree Planting".to_string(),
            description: "Planting along the river bank.".to_string(),
            date: now + Duration::days(7),
            end_date: None,
            location: "River bank".to_string(),
            category: "service".to_string(),
            max_attendees,
            registration_deadline: None,
            meeting_type,
            rsvps: vec![],
            attendance: vec![],
            created_by: 1,
            created_at: now,
            updated_at: now,
        };
        events_db_operations::create_event(db, &event).unwrap();
        event
    }

    #[test]
    fn submitted_hours_start_pending_and_stay_off_the_leaderboard() {
        let db = test_db();
        let member = caller(4, Role::Member);

        let entry = submit_service_hours(&db, &member, &hours_request(4.0)).unwrap();
        assert_eq!(entry.status, ReviewStatus::Pending);
        assert_eq!(entry.user_id, member.id);

        // Officers see it in their pending queue.
        let officer = caller(2, Role::Officer);
        let pending =
            list_service_hours(&db, &officer, None, Some(ReviewStatus::Pending)).unwrap();
        assert_eq!(pending.len(), 1);

        // Not approved yet, so the leaderboard is empty.
        assert!(leaderboard(&db, 10).unwrap().is_empty());
    }

    #[test]
    fn out_of_range_hours_are_rejected() {
        let db = test_db();
        let member = caller(4, Role::Member);
        for bad in [0.0, -2.0, 25.0] {
            assert!(matches!(
                submit_service_hours(&db, &member, &hours_request(bad)),
                Err(ApiError::Validation(_))
            ));
        }
    }

    #[test]
    fn members_only_see_their_own_hours() {
        let db = test_db();
        let alice = caller(1, Role::Member);
        let bob = caller(2, Role::Member);
        submit_service_hours(&db, &alice, &hours_request(3.0)).unwrap();
        submit_service_hours(&db, &bob, &hours_request(5.0)).unwrap();

        // A foreign userId filter is overridden with the caller's own id.
        let listed = list_service_hours(&db, &alice, Some(bob.id), None).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].user_id, alice.id);

        // Moderators may filter by any user.
        let officer = caller(9, Role::Officer);
        let listed = list_service_hours(&db, &officer, Some(bob.id), None).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].user_id, bob.id);
    }

    #[test]
    fn member_blog_posts_are_forced_unpublished() {
        let db = test_db();
        let member = caller(4, Role::Member);
        let request = CreateBlogPostRequest {
            title: "My First Post".to_string(),
            content: "Hello club!".to_string(),
            excerpt: None,
            tags: vec![],
            published: true,
        };
        let post = submit_blog_post(&db, &member, &request).unwrap();
        assert!(!post.published);
        assert!(post.published_at.is_none());
        assert_eq!(post.slug, "my-first-post");

        let officer = caller(2, Role::Officer);
        let request = CreateBlogPostRequest {
            title: "Officer Update".to_string(),
            content: "News.".to_string(),
            excerpt: None,
            tags: vec![],
            published: true,
        };
        let post = submit_blog_post(&db, &officer, &request).unwrap();
        assert!(post.published);
    }

    #[test]
    fn full_events_reject_new_going_rsvps() {
        let db = test_db();
        let event = stored_event(&db, Some(2), MeetingType::Event);

        for id in 1..=2 {
            rsvp_to_event(
                &db,
                &caller(id, Role::Member),
                &event.id,
                &RsvpRequest {
                    status: RsvpStatus::Going,
                },
            )
            .unwrap();
        }

        let err = rsvp_to_event(
            &db,
            &caller(3, Role::Member),
            &event.id,
            &RsvpRequest {
                status: RsvpStatus::Going,
            },
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(ref m) if m == "Event is full"));

        // Existing RSVPs are unaffected and a `maybe` still goes through.
        let after = rsvp_to_event(
            &db,
            &caller(3, Role::Member),
            &event.id,
            &RsvpRequest {
                status: RsvpStatus::Maybe,
            },
        )
        .unwrap();
        assert_eq!(after.going_count(), 2);
        assert_eq!(after.rsvps.len(), 3);
    }

    #[test]
    fn a_full_event_still_accepts_resubmission_from_a_going_member() {
        let db = test_db();
        let event = stored_event(&db, Some(1), MeetingType::Event);
        let member = caller(1, Role::Member);

        for _ in 0..2 {
            let after = rsvp_to_event(
                &db,
                &member,
                &event.id,
                &RsvpRequest {
                    status: RsvpStatus::Going,
                },
            )
            .unwrap();
            assert_eq!(after.rsvps.len(), 1);
        }
    }

    #[test]
    fn past_deadline_rsvps_are_rejected() {
        let db = test_db();
        let now = Utc::now();
        let mut event = stored_event(&db, None, MeetingType::Event);
        event.registration_deadline = Some(now - Duration::hours(1));
        events_db_operations::update_event(&db, &event).unwrap();

        let err = rsvp_to_event(
            &db,
            &caller(1, Role::Member),
            &event.id,
            &RsvpRequest {
                status: RsvpStatus::Going,
            },
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn board_meetings_are_invisible_to_members() {
        let db = test_db();
        let event = stored_event(&db, None, MeetingType::Board);

        let member = caller(4, Role::Member);
        assert!(list_events(&db, &member).unwrap().is_empty());
        assert!(matches!(
            get_event(&db, &member, &event.id),
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(
            rsvp_to_event(
                &db,
                &member,
                &event.id,
                &RsvpRequest {
                    status: RsvpStatus::Going
                }
            ),
            Err(ApiError::NotFound(_))
        ));

        let officer = caller(2, Role::Officer);
        assert_eq!(list_events(&db, &officer).unwrap().len(), 1);
    }

    #[test]
    fn attendance_is_marked_for_the_caller_only() {
        let db = test_db();
        let event = stored_event(&db, None, MeetingType::General);
        let member = caller(4, Role::Member);

        let after = mark_attendance(
            &db,
            &member,
            &event.id,
            &AttendanceRequest {
                status: AttendanceStatus::Present,
            },
        )
        .unwrap();
        assert_eq!(after.attendance.len(), 1);
        assert_eq!(after.attendance[0].user_id, member.id);

        let records = event_attendance(&db, &member, &event.id).unwrap();
        assert_eq!(records.len(), 1);
    }
}
