//! Product Q&A: publishing, server-sent-event topics, listing, likes and moderation.

use actix_web::{web, HttpResponse};
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::db;
use crate::errors::AppError;
use crate::models::{ProductQa, QaLikeUpdate, QaMessage};
use crate::services::qa_hub;
use crate::state::AppState;
use crate::web::extractors::StaffUser;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentifierQuery {
  pub user_identifier: String,
}

#[derive(Deserialize, Debug)]
pub struct AnswerPayload {
  pub answer: String,
}

#[derive(Deserialize, Debug)]
pub struct VisibilityPayload {
  pub visible: bool,
}

fn qa_not_found() -> AppError {
  AppError::NotFound("Không tìm thấy câu hỏi".to_string())
}

fn broadcast_entry(app_state: &AppState, entry: &ProductQa, replies_count: i64) -> QaMessage {
  let message = QaMessage::from_entry(entry, replies_count);
  if let Err(e) = app_state.qa_hub.publish_question(&message) {
    warn!(qa_id = %entry.id, error = %e, "Could not encode Q&A broadcast.");
  }
  message
}

/// Server-sent-event response fed by one hub topic.
fn sse_response(app_state: &AppState, topic: String) -> HttpResponse {
  let stream = app_state
    .qa_hub
    .subscribe(topic)
    .map(|payload| Ok::<_, actix_web::Error>(web::Bytes::from(format!("data: {}\n\n", payload))));
  HttpResponse::Ok()
    .content_type("text/event-stream")
    .insert_header(("Cache-Control", "no-cache"))
    .keep_alive()
    .streaming(stream)
}

/// Stores a question (or a reply when `parentId` is set) and broadcasts it on the product topic.
#[instrument(name = "handler::qa_publish", skip(app_state, payload), fields(product_id = %payload.product_id))]
pub async fn publish_question_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<QaMessage>,
) -> Result<HttpResponse, AppError> {
  let incoming = payload.into_inner();
  incoming.validate().map_err(AppError::Validation)?;

  if db::products::find_by_id(&app_state.db_pool, incoming.product_id).await?.is_none() {
    return Err(AppError::NotFound("Không tìm thấy sản phẩm".to_string()));
  }
  if let Some(parent_id) = incoming.parent_id {
    let parent = db::qa::find(&app_state.db_pool, parent_id).await?.ok_or_else(qa_not_found)?;
    if parent.product_id != incoming.product_id {
      return Err(AppError::Validation("Câu trả lời không thuộc sản phẩm này".to_string()));
    }
  }

  let entry = db::qa::insert(
    &app_state.db_pool,
    incoming.product_id,
    incoming.parent_id,
    incoming.user_name.trim(),
    incoming.user_email.as_deref().map(str::trim).filter(|e| !e.is_empty()),
    incoming.question.trim(),
  )
  .await?;
  info!(qa_id = %entry.id, is_reply = entry.parent_id.is_some(), "Q&A entry published.");
  Ok(HttpResponse::Ok().json(broadcast_entry(&app_state, &entry, 0)))
}

#[instrument(name = "handler::qa_subscribe", skip(app_state, path), fields(product_id = %path.as_ref()))]
pub async fn subscribe_questions_handler(app_state: web::Data<AppState>, path: web::Path<Uuid>) -> HttpResponse {
  sse_response(&app_state, qa_hub::qa_topic(path.into_inner()))
}

#[instrument(name = "handler::qa_subscribe_likes", skip(app_state, path), fields(product_id = %path.as_ref()))]
pub async fn subscribe_likes_handler(app_state: web::Data<AppState>, path: web::Path<Uuid>) -> HttpResponse {
  sse_response(&app_state, qa_hub::like_topic(path.into_inner()))
}

#[instrument(name = "handler::qa_list", skip(app_state, path), fields(product_id = %path.as_ref()))]
pub async fn list_questions_handler(app_state: web::Data<AppState>, path: web::Path<Uuid>) -> Result<HttpResponse, AppError> {
  let entries = db::qa::list_top_level(&app_state.db_pool, path.into_inner()).await?;
  let messages: Vec<QaMessage> = entries
    .iter()
    .map(|e| QaMessage::from_entry(&e.qa, e.replies_count))
    .collect();
  Ok(HttpResponse::Ok().json(messages))
}

#[instrument(name = "handler::qa_replies", skip(app_state, path), fields(question_id = %path.as_ref()))]
pub async fn list_replies_handler(app_state: web::Data<AppState>, path: web::Path<Uuid>) -> Result<HttpResponse, AppError> {
  let replies = db::qa::replies(&app_state.db_pool, path.into_inner()).await?;
  let messages: Vec<QaMessage> = replies.iter().map(|r| QaMessage::from_entry(r, 0)).collect();
  Ok(HttpResponse::Ok().json(messages))
}

/// Counter change for a toggle. A concurrent toggle may already have done the work, leaving no row changed.
pub fn like_delta(liked: bool, row_changed: bool) -> i32 {
  match (row_changed, liked) {
    (false, _) => 0,
    (true, true) => 1,
    (true, false) => -1,
  }
}

/// Adds the caller's like, or removes it when already present.
#[instrument(name = "handler::qa_toggle_like", skip(app_state, path, query), fields(qa_id = %path.as_ref()))]
pub async fn toggle_like_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  query: web::Query<UserIdentifierQuery>,
) -> Result<HttpResponse, AppError> {
  let qa_id = path.into_inner();
  let identifier = query.user_identifier.trim();
  if identifier.is_empty() {
    return Err(AppError::Validation("Thiếu định danh người dùng".to_string()));
  }

  let mut tx = app_state.db_pool.begin().await?;
  let entry = db::qa::find(&mut *tx, qa_id).await?.ok_or_else(qa_not_found)?;
  let (liked, row_changed) = if db::qa::has_liked(&mut *tx, qa_id, identifier).await? {
    (false, db::qa::delete_like(&mut *tx, qa_id, identifier).await?)
  } else {
    (true, db::qa::insert_like(&mut *tx, qa_id, identifier).await?)
  };
  let likes_count = db::qa::adjust_likes(&mut *tx, qa_id, like_delta(liked, row_changed)).await?;
  tx.commit().await?;

  let update = QaLikeUpdate {
    id: qa_id,
    product_id: entry.product_id,
    likes_count,
  };
  if let Err(e) = app_state.qa_hub.publish_like(&update) {
    warn!(error = %e, "Could not encode like broadcast.");
  }
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "liked": liked,
    "likesCount": likes_count,
  })))
}

#[instrument(name = "handler::qa_has_liked", skip(app_state, path, query), fields(qa_id = %path.as_ref()))]
pub async fn has_liked_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  query: web::Query<UserIdentifierQuery>,
) -> Result<HttpResponse, AppError> {
  let liked = db::qa::has_liked(&app_state.db_pool, path.into_inner(), query.user_identifier.trim()).await?;
  Ok(HttpResponse::Ok().json(liked))
}

#[instrument(name = "handler::qa_answer", skip(app_state, staff, path, payload), fields(qa_id = %path.as_ref(), staff = %staff.0.username))]
pub async fn answer_question_handler(
  app_state: web::Data<AppState>,
  staff: StaffUser,
  path: web::Path<Uuid>,
  payload: web::Json<AnswerPayload>,
) -> Result<HttpResponse, AppError> {
  let answer = payload.answer.trim();
  if answer.is_empty() {
    return Err(AppError::Validation("Vui lòng nhập câu trả lời".to_string()));
  }
  let entry = db::qa::set_answer(&app_state.db_pool, path.into_inner(), answer, &staff.0.username)
    .await?
    .ok_or_else(qa_not_found)?;
  let replies = db::qa::replies_count(&app_state.db_pool, entry.id).await?;
  Ok(HttpResponse::Ok().json(broadcast_entry(&app_state, &entry, replies)))
}

#[instrument(name = "handler::qa_visibility", skip(app_state, _staff, path, payload), fields(qa_id = %path.as_ref(), visible = payload.visible))]
pub async fn set_visibility_handler(
  app_state: web::Data<AppState>,
  _staff: StaffUser,
  path: web::Path<Uuid>,
  payload: web::Json<VisibilityPayload>,
) -> Result<HttpResponse, AppError> {
  if !db::qa::set_visibility(&app_state.db_pool, path.into_inner(), payload.visible).await? {
    return Err(qa_not_found());
  }
  Ok(HttpResponse::Ok().json(json!({ "success": true, "visible": payload.visible })))
}
