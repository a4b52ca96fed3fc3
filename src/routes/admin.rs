use actix_web::{web, HttpResponse};
use redb::Database;
use serde::Deserialize;
use serde_json::json;

use crate::errors::ApiError;
use crate::helper::admin_helpers;
use crate::middleware::Caller;
use crate::models::{ContactStatus, SuggestionStatus};
use crate::DbPool;

#[derive(Deserialize)]
pub(crate) struct SuggestionQuery {
    status: Option<SuggestionStatus>,
}

#[derive(Deserialize)]
pub(crate) struct ContactQuery {
    status: Option<ContactStatus>,
}

// ====================================================================
// ============================ ACCOUNTS ==============================
// ====================================================================

pub(crate) async fn register_account(
    caller: Caller,
    pool: web::Data<DbPool>,
    payload: web::Json<admin_helpers::RegisterAccountRequest>,
) -> Result<HttpResponse, ApiError> {
    let account = admin_helpers::create_account(&pool, &caller, &payload)?;
    Ok(HttpResponse::Created().json(json!({ "success": true, "data": account })))
}

pub(crate) async fn list_accounts(
    caller: Caller,
    pool: web::Data<DbPool>,
) -> Result<HttpResponse, ApiError> {
    let accounts = admin_helpers::fetch_all_accounts(&pool, &caller)?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": accounts })))
}

pub(crate) async fn update_account(
    caller: Caller,
    pool: web::Data<DbPool>,
    path: web::Path<i64>,
    payload: web::Json<admin_helpers::UpdateAccountRequest>,
) -> Result<HttpResponse, ApiError> {
    let account = admin_helpers::update_account(&pool, &caller, *path, &payload)?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": account })))
}

// ====================================================================
// ========================= ANNOUNCEMENTS ============================
// ====================================================================

pub(crate) async fn create_announcement(
    caller: Caller,
    db: web::Data<Database>,
    payload: web::Json<admin_helpers::AnnouncementRequest>,
) -> Result<HttpResponse, ApiError> {
    let announcement = admin_helpers::create_announcement(&db, &caller, &payload)?;
    Ok(HttpResponse::Created().json(json!({ "success": true, "data": announcement })))
}

pub(crate) async fn update_announcement(
    caller: Caller,
    db: web::Data<Database>,
    path: web::Path<String>,
    payload: web::Json<admin_helpers::AnnouncementRequest>,
) -> Result<HttpResponse, ApiError> {
    let announcement = admin_helpers::update_announcement(&db, &caller, &path, &payload)?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": announcement })))
}

pub(crate) async fn delete_announcement(
    caller: Caller,
    db: web::Data<Database>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    admin_helpers::delete_announcement(&db, &caller, &path)?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "message": "Announcement deleted." })))
}

// ====================================================================
// ================= BLOG, REVIEWS AND SUGGESTIONS ====================
// ====================================================================

pub(crate) async fn set_post_published(
    caller: Caller,
    db: web::Data<Database>,
    payload: web::Json<admin_helpers::PublishToggleRequest>,
) -> Result<HttpResponse, ApiError> {
    let post = admin_helpers::set_post_published(&db, &caller, &payload)?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": post })))
}

pub(crate) async fn review_service_hours(
    caller: Caller,
    db: web::Data<Database>,
    path: web::Path<String>,
    payload: web::Json<admin_helpers::ReviewHoursRequest>,
) -> Result<HttpResponse, ApiError> {
    let entry = admin_helpers::review_service_hours(&db, &caller, &path, &payload)?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": entry })))
}

pub(crate) async fn list_suggestions(
    caller: Caller,
    db: web::Data<Database>,
    query: web::Query<SuggestionQuery>,
) -> Result<HttpResponse, ApiError> {
    let suggestions = admin_helpers::list_suggestions(&db, &caller, query.status)?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": suggestions })))
}

pub(crate) async fn review_suggestion(
    caller: Caller,
    db: web::Data<Database>,
    payload: web::Json<admin_helpers::ReviewSuggestionRequest>,
) -> Result<HttpResponse, ApiError> {
    let suggestion = admin_helpers::review_suggestion(&db, &caller, &payload)?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": suggestion })))
}

pub(crate) async fn delete_suggestion(
    caller: Caller,
    db: web::Data<Database>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    admin_helpers::delete_suggestion(&db, &caller, &path)?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "message": "Suggestion deleted." })))
}

pub(crate) async fn list_applications(
    caller: Caller,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    let applications = admin_helpers::list_applications(&db, &caller)?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": applications })))
}

// ====================================================================
// ============================= EVENTS ===============================
// ====================================================================

pub(crate) async fn create_event(
    caller: Caller,
    db: web::Data<Database>,
    payload: web::Json<admin_helpers::EventRequest>,
) -> Result<HttpResponse, ApiError> {
    let event = admin_helpers::create_event(&db, &caller, &payload)?;
    Ok(HttpResponse::Created().json(json!({ "success": true, "data": event })))
}

pub(crate) async fn update_event(
    caller: Caller,
    db: web::Data<Database>,
    path: web::Path<String>,
    payload: web::Json<admin_helpers::EventRequest>,
) -> Result<HttpResponse, ApiError> {
    let event = admin_helpers::update_event(&db, &caller, &path, &payload)?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": event })))
}

pub(crate) async fn delete_event(
    caller: Caller,
    db: web::Data<Database>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    admin_helpers::delete_event(&db, &caller, &path)?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "message": "Event deleted." })))
}

// ====================================================================
// ====================== INTAKE QUEUES AND STATS =====================
// ====================================================================

pub(crate) async fn list_contact_messages(
    caller: Caller,
    db: web::Data<Database>,
    query: web::Query<ContactQuery>,
) -> Result<HttpResponse, ApiError> {
    let messages = admin_helpers::list_contact_messages(&db, &caller, query.status)?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": messages })))
}

pub(crate) async fn list_payments(caller: Caller, db: web::Data<Database>) -> Result<HttpResponse, ApiError> {
    let payments = admin_helpers::list_payments(&db, &caller)?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": payments })))
}

pub(crate) async fn club_stats(
    caller: Caller,
    pool: web::Data<DbPool>,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    let stats = admin_helpers::club_stats(&pool, &db, &caller)?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": stats })))
}
