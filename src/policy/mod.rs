//! Authorization policy for every operation the API exposes.
//!
//! All role checks live in this module as pure functions so they can be
//! unit tested without a session or a database. Handlers resolve the
//! caller first, then ask the policy, then touch the store.

use chrono::{DateTime, Utc};

use crate::models::{Audience, MeetingType, Role};

pub mod workflow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Announcement,
    BlogPost,
    ServiceHour,
    ProjectSuggestion,
    MembershipApplication,
    Event,
    EventRsvp,
    EventAttendance,
    ContactMessage,
    Payment,
    Account,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    ReadAll,
    ReadOwn,
    Transition,
    Delete,
}

/// Why an operation was refused. `Unauthenticated` maps to 401,
/// `Forbidden` to 403.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deny {
    Unauthenticated,
    Forbidden(&'static str),
}

/// Roles allowed to moderate club content: review hours and suggestions,
/// publish posts, read intake queues.
pub fn is_moderator(role: Role) -> bool {
    matches!(role, Role::Officer | Role::Admin)
}

fn require_caller(role: Option<Role>) -> Result<Role, Deny> {
    role.ok_or(Deny::Unauthenticated)
}

fn require_moderator(role: Option<Role>) -> Result<(), Deny> {
    if is_moderator(require_caller(role)?) {
        Ok(())
    } else {
        Err(Deny::Forbidden("Officer or admin role required."))
    }
}

fn require_admin(role: Option<Role>) -> Result<(), Deny> {
    if require_caller(role)? == Role::Admin {
        Ok(())
    } else {
        Err(Deny::Forbidden("Admin role required."))
    }
}

/// The single decision table for (role, operation, resource kind).
/// Ownership refinements (own-entry checks) and visibility filters take
/// the relevant ids/fields through the dedicated functions below.
pub fn can_perform(role: Option<Role>, op: Operation, kind: ResourceKind) -> Result<(), Deny> {
    use Operation::*;
    use ResourceKind::*;

    match (kind, op) {
        (Announcement, ReadAll) => Ok(()),
        (Announcement, Create | Transition | Delete) => require_admin(role),
        (Announcement, ReadOwn) => Err(Deny::Forbidden("Not supported.")),

        (BlogPost, ReadAll) => Ok(()),
        (BlogPost, Create) => require_caller(role).map(|_| ()),
        (BlogPost, Transition) => require_moderator(role),
        (BlogPost, ReadOwn | Delete) => Err(Deny::Forbidden("Not supported.")),

        (ServiceHour, Create | ReadOwn) => require_caller(role).map(|_| ()),
        (ServiceHour, ReadAll | Transition) => require_moderator(role),
        (ServiceHour, Delete) => Err(Deny::Forbidden("Not supported.")),

        (ProjectSuggestion, Create) => require_caller(role).map(|_| ()),
        (ProjectSuggestion, ReadAll | Transition) => require_moderator(role),
        (ProjectSuggestion, Delete) => require_admin(role),
        (ProjectSuggestion, ReadOwn) => Err(Deny::Forbidden("Not supported.")),

        (MembershipApplication, Create) => Ok(()),
        (MembershipApplication, ReadAll) => require_moderator(role),
        (MembershipApplication, ReadOwn | Transition | Delete) => {
            Err(Deny::Forbidden("Not supported."))
        }

        (Event, ReadAll) => require_caller(role).map(|_| ()),
        (Event, Create | Transition | Delete) => require_admin(role),
        (Event, ReadOwn) => Err(Deny::Forbidden("Not supported.")),

        (EventRsvp, Create) => require_caller(role).map(|_| ()),
        (EventAttendance, Create) => require_caller(role).map(|_| ()),
        (EventAttendance, ReadAll) => require_caller(role).map(|_| ()),
        (EventRsvp | EventAttendance, _) => Err(Deny::Forbidden("Not supported.")),

        (ContactMessage | Payment, Create) => Ok(()),
        (ContactMessage | Payment, ReadAll) => require_moderator(role),
        (ContactMessage | Payment, ReadOwn | Transition | Delete) => {
            Err(Deny::Forbidden("Not supported."))
        }

        (Account, Create) => {
            // Refined per new-account role by `can_create_account`.
            let caller = require_caller(role)?;
            if is_moderator(caller) {
                Ok(())
            } else {
                Err(Deny::Forbidden("Officer or admin role required."))
            }
        }
        (Account, ReadAll) => require_moderator(role),
        (Account, Transition) => require_admin(role),
        (Account, ReadOwn | Delete) => Err(Deny::Forbidden("Not supported.")),
    }
}

/// Admins may create accounts of any role; officers may only create
/// plain member accounts.
pub fn can_create_account(actor: Role, new_role: Role) -> Result<(), Deny> {
    match actor {
        Role::Admin => Ok(()),
        Role::Officer if new_role == Role::Member => Ok(()),
        Role::Officer => Err(Deny::Forbidden(
            "Officers may only create member accounts.",
        )),
        Role::Member => Err(Deny::Forbidden("Officer or admin role required.")),
    }
}

/// Row-level visibility rule for announcements: the audience must be
/// `all` or match the caller's role, and the item must not be expired.
pub fn announcement_visible(
    role: Option<Role>,
    audience: Audience,
    expiry: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    if let Some(expiry) = expiry {
        if expiry < now {
            return false;
        }
    }
    match audience {
        Audience::All => true,
        Audience::Members => role == Some(Role::Member),
        Audience::Officers => role == Some(Role::Officer),
        Audience::Admin => role == Some(Role::Admin),
    }
}

/// Board meetings are hidden from plain members regardless of any RSVP
/// or attendance state they may already hold.
pub fn can_see_event(role: Role, meeting_type: MeetingType) -> bool {
    match meeting_type {
        MeetingType::Board => is_moderator(role),
        MeetingType::General | MeetingType::Event => true,
    }
}

/// A newly created post by a non-moderator is stored unpublished no
/// matter what the request asked for.
pub fn effective_published(role: Role, requested: bool) -> bool {
    if is_moderator(role) {
        requested
    } else {
        false
    }
}

/// Members may only list their own service hours; a foreign `user_id`
/// filter is overridden with the caller's own id. Moderators may filter
/// freely or see everything.
pub fn effective_hours_filter(role: Role, caller_id: i64, requested: Option<i64>) -> Option<i64> {
    if is_moderator(role) {
        requested
    } else {
        Some(caller_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn announcement_crud_is_admin_only() {
        for op in [Operation::Create, Operation::Transition, Operation::Delete] {
            assert!(can_perform(Some(Role::Admin), op, ResourceKind::Announcement).is_ok());
            assert!(can_perform(Some(Role::Officer), op, ResourceKind::Announcement).is_err());
            assert!(can_perform(Some(Role::Member), op, ResourceKind::Announcement).is_err());
            assert_eq!(
                can_perform(None, op, ResourceKind::Announcement),
                Err(Deny::Unauthenticated)
            );
        }
        assert!(can_perform(None, Operation::ReadAll, ResourceKind::Announcement).is_ok());
    }

    #[test]
    fn service_hour_review_requires_moderator() {
        assert!(can_perform(
            Some(Role::Officer),
            Operation::Transition,
            ResourceKind::ServiceHour
        )
        .is_ok());
        assert_eq!(
            can_perform(
                Some(Role::Member),
                Operation::Transition,
                ResourceKind::ServiceHour
            ),
            Err(Deny::Forbidden("Officer or admin role required."))
        );
    }

    #[test]
    fn members_cannot_list_all_service_hours() {
        assert!(can_perform(
            Some(Role::Member),
            Operation::ReadAll,
            ResourceKind::ServiceHour
        )
        .is_err());
        assert!(can_perform(
            Some(Role::Member),
            Operation::ReadOwn,
            ResourceKind::ServiceHour
        )
        .is_ok());
    }

    #[test]
    fn suggestion_delete_is_admin_only() {
        assert!(can_perform(
            Some(Role::Officer),
            Operation::Delete,
            ResourceKind::ProjectSuggestion
        )
        .is_err());
        assert!(can_perform(
            Some(Role::Admin),
            Operation::Delete,
            ResourceKind::ProjectSuggestion
        )
        .is_ok());
    }

    #[test]
    fn application_create_is_public_but_listing_is_not() {
        assert!(can_perform(
            None,
            Operation::Create,
            ResourceKind::MembershipApplication
        )
        .is_ok());
        assert_eq!(
            can_perform(None, Operation::ReadAll, ResourceKind::MembershipApplication),
            Err(Deny::Unauthenticated)
        );
        assert!(can_perform(
            Some(Role::Member),
            Operation::ReadAll,
            ResourceKind::MembershipApplication
        )
        .is_err());
        assert!(can_perform(
            Some(Role::Officer),
            Operation::ReadAll,
            ResourceKind::MembershipApplication
        )
        .is_ok());
    }

    #[test]
    fn officer_creates_members_only() {
        assert!(can_create_account(Role::Admin, Role::Officer).is_ok());
        assert!(can_create_account(Role::Officer, Role::Member).is_ok());
        assert_eq!(
            can_create_account(Role::Officer, Role::Officer),
            Err(Deny::Forbidden("Officers may only create member accounts."))
        );
        assert!(can_create_account(Role::Member, Role::Member).is_err());
    }

    #[test]
    fn announcement_visibility_filters_by_audience_and_expiry() {
        let now = Utc::now();
        assert!(announcement_visible(None, Audience::All, None, now));
        assert!(!announcement_visible(None, Audience::Members, None, now));
        assert!(announcement_visible(
            Some(Role::Member),
            Audience::Members,
            None,
            now
        ));
        // Audience must match the caller's role exactly, so an admin does
        // not see member-targeted items.
        assert!(!announcement_visible(
            Some(Role::Admin),
            Audience::Members,
            None,
            now
        ));
        assert!(announcement_visible(
            Some(Role::Admin),
            Audience::Admin,
            None,
            now
        ));

        let expired = Some(now - Duration::hours(1));
        let live = Some(now + Duration::hours(1));
        assert!(!announcement_visible(Some(Role::Member), Audience::All, expired, now));
        assert!(announcement_visible(Some(Role::Member), Audience::All, live, now));
    }

    #[test]
    fn board_events_hidden_from_members() {
        assert!(!can_see_event(Role::Member, MeetingType::Board));
        assert!(can_see_event(Role::Officer, MeetingType::Board));
        assert!(can_see_event(Role::Admin, MeetingType::Board));
        assert!(can_see_event(Role::Member, MeetingType::General));
        assert!(can_see_event(Role::Member, MeetingType::Event));
    }

    #[test]
    fn member_posts_are_forced_unpublished() {
        assert!(!effective_published(Role::Member, true));
        assert!(effective_published(Role::Officer, true));
        assert!(effective_published(Role::Admin, true));
        assert!(!effective_published(Role::Admin, false));
    }

    #[test]
    fn foreign_user_filter_is_overridden_for_members() {
        assert_eq!(effective_hours_filter(Role::Member, 7, Some(12)), Some(7));
        assert_eq!(effective_hours_filter(Role::Member, 7, None), Some(7));
        assert_eq!(effective_hours_filter(Role::Officer, 7, Some(12)), Some(12));
        assert_eq!(effective_hours_filter(Role::Admin, 7, None), None);
    }
}
