use actix_web::{web, HttpResponse};
use redb::Database;
use serde::Deserialize;
use serde_json::json;

use crate::errors::ApiError;
use crate::helper::member_helpers;
use crate::middleware::Caller;
use crate::models::ReviewStatus;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct HoursQuery {
    user_id: Option<i64>,
    status: Option<ReviewStatus>,
}

#[derive(Deserialize)]
pub(crate) struct LeaderboardQuery {
    limit: Option<usize>,
}

/// Members get their own entries; moderators may pass `?userId=` or see
/// everything. `?status=` narrows by review status for either.
pub(crate) async fn list_service_hours(
    caller: Caller,
    db: web::Data<Database>,
    query: web::Query<HoursQuery>,
) -> Result<HttpResponse, ApiError> {
    let entries = member_helpers::list_service_hours(&db, &caller, query.user_id, query.status)?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": entries })))
}

pub(crate) async fn submit_service_hours(
    caller: Caller,
    db: web::Data<Database>,
    payload: web::Json<member_helpers::SubmitServiceHoursRequest>,
) -> Result<HttpResponse, ApiError> {
    let entry = member_helpers::submit_service_hours(&db, &caller, &payload)?;
    Ok(HttpResponse::Created().json(json!({ "success": true, "data": entry })))
}

pub(crate) async fn leaderboard(
    _caller: Caller,
    db: web::Data<Database>,
    query: web::Query<LeaderboardQuery>,
) -> Result<HttpResponse, ApiError> {
    let limit = query.limit.unwrap_or(10);
    let ranking = member_helpers::leaderboard(&db, limit)?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": ranking })))
}

pub(crate) async fn submit_blog_post(
    caller: Caller,
    db: web::Data<Database>,
    payload: web::Json<member_helpers::CreateBlogPostRequest>,
) -> Result<HttpResponse, ApiError> {
    let post = member_helpers::submit_blog_post(&db, &caller, &payload)?;
    Ok(HttpResponse::Created().json(json!({ "success": true, "data": post })))
}

pub(crate) async fn submit_suggestion(
    caller: Caller,
    db: web::Data<Database>,
    payload: web::Json<member_helpers::SubmitSuggestionRequest>,
) -> Result<HttpResponse, ApiError> {
    let suggestion = member_helpers::submit_suggestion(&db, &caller, &payload)?;
    Ok(HttpResponse::Created().json(json!({ "success": true, "data": suggestion })))
}

pub(crate) async fn list_events(caller: Caller, db: web::Data<Database>) -> Result<HttpResponse, ApiError> {
    let events = member_helpers::list_events(&db, &caller)?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": events })))
}

pub(crate) async fn get_event(
    caller: Caller,
    db: web::Data<Database>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let event = member_helpers::get_event(&db, &caller, &path)?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": event })))
}

pub(crate) async fn rsvp_to_event(
    caller: Caller,
    db: web::Data<Database>,
    path: web::Path<String>,
    payload: web::Json<member_helpers::RsvpRequest>,
) -> Result<HttpResponse, ApiError> {
    let event = member_helpers::rsvp_to_event(&db, &caller, &path, &payload)?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": event })))
}

pub(crate) async fn event_attendance(
    caller: Caller,
    db: web::Data<Database>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let records = member_helpers::event_attendance(&db, &caller, &path)?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": records })))
}

pub(crate) async fn mark_attendance(
    caller: Caller,
    db: web::Data<Database>,
    path: web::Path<String>,
    payload: web::Json<member_helpers::AttendanceRequest>,
) -> Result<HttpResponse, ApiError> {
    let event = member_helpers::mark_attendance(&db, &caller, &path, &payload)?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": event })))
}
