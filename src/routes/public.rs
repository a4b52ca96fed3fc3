use actix_session::Session;
use actix_web::{web, HttpResponse, Responder};
use redb::Database;
use serde::Deserialize;
use serde_json::json;

use crate::errors::ApiError;
use crate::helper::public_helpers;
use crate::middleware::{store_caller, Caller, MaybeCaller};
use crate::DbPool;

#[derive(Deserialize)]
pub(crate) struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Deserialize)]
pub(crate) struct BlogQuery {
    slug: Option<String>,
    all: Option<bool>,
}

pub(crate) async fn is_server_active() -> impl Responder {
    HttpResponse::Ok().body("active")
}

pub(crate) async fn handle_login(
    session: Session,
    pool: web::Data<DbPool>,
    payload: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    let account =
        public_helpers::verify_member_credentials(&pool, &payload.email, &payload.password)?;
    store_caller(&session, &account)?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": account })))
}

pub(crate) async fn handle_logout(session: Session) -> impl Responder {
    session.purge();
    HttpResponse::Ok().json(json!({ "success": true, "message": "Logged out." }))
}

pub(crate) async fn whoami(caller: Caller) -> impl Responder {
    HttpResponse::Ok().json(json!({ "success": true, "data": caller }))
}

/// Public announcement feed, row-filtered by audience targeting and
/// expiry against whatever session happens to be present.
pub(crate) async fn list_announcements(
    caller: MaybeCaller,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    let announcements = public_helpers::fetch_visible_announcements(&db, caller.role())?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": announcements })))
}

/// `GET /api/blog` serves the index; `?slug=` reads a single post and
/// bumps its view counter; `?all=true` includes drafts for moderators.
pub(crate) async fn get_blog(
    caller: MaybeCaller,
    db: web::Data<Database>,
    query: web::Query<BlogQuery>,
) -> Result<HttpResponse, ApiError> {
    if let Some(slug) = query.slug.as_deref() {
        let post = public_helpers::fetch_post_by_slug(&db, caller.role(), slug)?;
        return Ok(HttpResponse::Ok().json(json!({ "success": true, "data": post })));
    }
    let posts =
        public_helpers::fetch_blog_posts(&db, caller.role(), query.all.unwrap_or(false))?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": posts })))
}

pub(crate) async fn submit_membership_application(
    db: web::Data<Database>,
    payload: web::Json<public_helpers::MembershipApplicationRequest>,
) -> Result<HttpResponse, ApiError> {
    let application = public_helpers::submit_membership_application(&db, &payload)?;
    Ok(HttpResponse::Created().json(json!({ "success": true, "data": application })))
}

pub(crate) async fn submit_contact_message(
    db: web::Data<Database>,
    payload: web::Json<public_helpers::ContactRequest>,
) -> Result<HttpResponse, ApiError> {
    let message = public_helpers::submit_contact_message(&db, &payload)?;
    Ok(HttpResponse::Created().json(json!({ "success": true, "data": message })))
}

pub(crate) async fn submit_payment(
    db: web::Data<Database>,
    payload: web::Json<public_helpers::PaymentRequest>,
) -> Result<HttpResponse, ApiError> {
    let payment = public_helpers::submit_payment(&db, &payload)?;
    Ok(HttpResponse::Created().json(json!({ "success": true, "data": payment })))
}
