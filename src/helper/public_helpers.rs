use chrono::Utc;
use redb::Database;
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::ApiError;
use crate::helper::{sanitization_helpers, validation_helpers};
use crate::models::db_operations::{
    accounts_db_operations, announcements_db_operations, applications_db_operations,
    blog_db_operations, intake_db_operations,
};
use crate::models::{
    Account, Announcement, BlogPost, BlogPostSummary, ContactMessage, ContactStatus,
    MembershipApplication, Payment, PaymentStatus, Role, APPLICATION_STATUS_PENDING,
};
use crate::policy::{self, Operation, ResourceKind};
use crate::DbPool;

/// Checks login credentials. Inactive accounts and unknown emails get
/// the same answer so the response does not leak which one it was.
pub fn verify_member_credentials(
    pool: &DbPool,
    email: &str,
    password: &str,
) -> Result<Account, ApiError> {
    let conn = pool.get()?;
    match accounts_db_operations::verify_credentials(&conn, email.trim(), password) {
        Some(account) => {
            accounts_db_operations::update_last_login_time(&conn, account.id).ok();
            Ok(account)
        }
        None => Err(ApiError::Unauthenticated(
            "Invalid credentials or account suspended.".to_string(),
        )),
    }
}

/// Announcements the caller may see: audience `all` or the caller's own
/// role, and not yet expired. Unauthenticated visitors get `all` only.
pub fn fetch_visible_announcements(
    db: &Database,
    role: Option<Role>,
) -> Result<Vec<Announcement>, ApiError> {
    let now = Utc::now();
    let announcements = announcements_db_operations::read_all_announcements(db)?;
    Ok(announcements
        .into_iter()
        .filter(|a| policy::announcement_visible(role, a.target_audience, a.expiry_date, now))
        .collect())
}

/// Post summaries for the blog index. Drafts are included only for
/// moderators who explicitly ask for them; everyone else silently gets
/// the published subset.
pub fn fetch_blog_posts(
    db: &Database,
    role: Option<Role>,
    include_unpublished: bool,
) -> Result<Vec<BlogPostSummary>, ApiError> {
    let drafts_allowed = include_unpublished && role.map_or(false, policy::is_moderator);
    Ok(blog_db_operations::list_posts(db, drafts_allowed)?)
}

/// Reads one post by slug, bumping its view counter. Drafts stay
/// invisible to non-moderators.
pub fn fetch_post_by_slug(
    db: &Database,
    role: Option<Role>,
    slug: &str,
) -> Result<BlogPost, ApiError> {
    let post = blog_db_operations::read_post_by_slug_counting_view(db, slug)?
        .ok_or_else(|| ApiError::NotFound("Blog post not found.".to_string()))?;
    if !post.published && !role.map_or(false, policy::is_moderator) {
        return Err(ApiError::NotFound("Blog post not found.".to_string()));
    }
    Ok(post)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipApplicationRequest {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub date_of_birth: chrono::NaiveDate,
    pub address: String,
    pub school_or_university: Option<String>,
    pub grade_or_year: Option<String>,
    pub motivation: String,
    pub experience: Option<String>,
}

/// Public membership-application intake. The record is stored with the
/// fixed `pending` status; no operation advances it.
pub fn submit_membership_application(
    db: &Database,
    request: &MembershipApplicationRequest,
) -> Result<MembershipApplication, ApiError> {
    policy::can_perform(None, Operation::Create, ResourceKind::MembershipApplication)?;

    let full_name = validation_helpers::require_trimmed(&request.full_name, "fullName")
        .map_err(ApiError::Validation)?;
    let address = validation_helpers::require_trimmed(&request.address, "address")
        .map_err(ApiError::Validation)?;
    let motivation = validation_helpers::require_trimmed(&request.motivation, "motivation")
        .map_err(ApiError::Validation)?;

    if !validation_helpers::is_plausible_email(&request.email) {
        return Err(ApiError::Validation("A valid email is required.".to_string()));
    }
    if !validation_helpers::is_valid_phone(request.phone.trim()) {
        return Err(ApiError::Validation(
            "Phone must be '+94' followed by 7 digits.".to_string(),
        ));
    }

    let application = MembershipApplication {
        id: Uuid::new_v4().to_string(),
        full_name: sanitization_helpers::strip_all_html(&full_name),
        email: request.email.trim().to_string(),
        phone: request.phone.trim().to_string(),
        date_of_birth: request.date_of_birth,
        address: sanitization_helpers::strip_all_html(&address),
        school_or_university: request
            .school_or_university
            .as_deref()
            .map(sanitization_helpers::strip_all_html),
        grade_or_year: request
            .grade_or_year
            .as_deref()
            .map(sanitization_helpers::strip_all_html),
        motivation: sanitization_helpers::strip_all_html(&motivation),
        experience: request
            .experience
            .as_deref()
            .map(sanitization_helpers::strip_all_html),
        status: APPLICATION_STATUS_PENDING.to_string(),
        created_at: Utc::now(),
    };
    applications_db_operations::create_application(db, &application)?;
    Ok(application)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

pub fn submit_contact_message(
    db: &Database,
    request: &ContactRequest,
) -> Result<ContactMessage, ApiError> {
    let name = validation_helpers::require_trimmed(&request.name, "name")
        .map_err(ApiError::Validation)?;
    let subject = validation_helpers::require_trimmed(&request.subject, "subject")
        .map_err(ApiError::Validation)?;
    let body = validation_helpers::require_trimmed(&request.message, "message")
        .map_err(ApiError::Validation)?;
    if !validation_helpers::is_plausible_email(&request.email) {
        return Err(ApiError::Validation("A valid email is required.".to_string()));
    }

    let message = ContactMessage {
        id: Uuid::new_v4().to_string(),
        name: sanitization_helpers::strip_all_html(&name),
        email: request.email.trim().to_string(),
        subject: sanitization_helpers::strip_all_html(&subject),
        message: sanitization_helpers::strip_all_html(&body),
        status: ContactStatus::New,
        created_at: Utc::now(),
    };
    intake_db_operations::create_contact_message(db, &message)?;
    Ok(message)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub payer_name: String,
    pub payer_email: String,
    pub amount_cents: i64,
    pub currency: String,
    pub purpose: String,
    pub reference: Option<String>,
}

/// Records a pending payment. There is no gateway callback; the record
/// is never reconciled by this system.
pub fn submit_payment(db: &Database, request: &PaymentRequest) -> Result<Payment, ApiError> {
    let payer_name = validation_helpers::require_trimmed(&request.payer_name, "payerName")
        .map_err(ApiError::Validation)?;
    let purpose = validation_helpers::require_trimmed(&request.purpose, "purpose")
        .map_err(ApiError::Validation)?;
    let currency = validation_helpers::require_trimmed(&request.currency, "currency")
        .map_err(ApiError::Validation)?;
    if !validation_helpers::is_plausible_email(&request.payer_email) {
        return Err(ApiError::Validation("A valid email is required.".to_string()));
    }
    if request.amount_cents <= 0 {
        return Err(ApiError::Validation(
            "Amount must be greater than zero.".to_string(),
        ));
    }

    let payment = Payment {
        id: Uuid::new_v4().to_string(),
        payer_name: sanitization_helpers::strip_all_html(&payer_name),
        payer_email: request.payer_email.trim().to_string(),
        amount_cents: request.amount_cents,
        currency,
        purpose: sanitization_helpers::strip_all_html(&purpose),
        reference: request.reference.clone(),
        status: PaymentStatus::Pending,
        created_at: Utc::now(),
    };
    intake_db_operations::create_payment(db, &payment)?;
    Ok(payment)
}
