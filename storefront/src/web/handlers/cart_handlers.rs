//! Hybrid cart: the database cart for signed-in users, the server-side guest cart otherwise.

use actix_web::{web, HttpResponse, HttpResponseBuilder};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use storeflow::{Ctx, Outcome};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::db;
use crate::errors::AppError;
use crate::models::product::DEFAULT_WEIGHT_GRAMS;
use crate::pipelines::common_steps;
use crate::pipelines::contexts::AddToCartCtxData;
use crate::services::cart_sync;
use crate::state::AppState;
use crate::web::extractors::{AuthenticatedUser, GuestCartKey, OptionalUser};

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CartItemPayload {
  pub product_id: Uuid,
  #[serde(default = "default_quantity")]
  pub quantity: i32,
}

fn default_quantity() -> i32 {
  1
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CartMutationResponse {
  pub success: bool,
  pub message: String,
  pub cart_item_count: i64,
  pub cart_total: i64,
}

async fn cart_summary(app_state: &AppState, user: &OptionalUser, guest: &GuestCartKey) -> Result<(i64, i64), AppError> {
  match &user.0 {
    Some(user) => Ok(db::cart::count_and_total(&app_state.db_pool, user.user_id).await?),
    None => {
      let cart = app_state.guest_carts.get(&guest.key);
      Ok((cart.count(), cart.total()))
    }
  }
}

/// Attaches the guest cart cookie when one was just minted for an anonymous visitor.
fn with_cart_cookie(mut builder: HttpResponseBuilder, user: &OptionalUser, guest: &GuestCartKey) -> HttpResponseBuilder {
  if user.0.is_none() {
    if let Some(cookie) = guest.cookie() {
      builder.cookie(cookie);
    }
  }
  builder
}

async fn mutation_response(
  app_state: &AppState,
  user: &OptionalUser,
  guest: &GuestCartKey,
  message: &str,
) -> Result<HttpResponse, AppError> {
  let (cart_item_count, cart_total) = cart_summary(app_state, user, guest).await?;
  Ok(with_cart_cookie(HttpResponse::Ok(), user, guest).json(CartMutationResponse {
    success: true,
    message: message.to_string(),
    cart_item_count,
    cart_total,
  }))
}

#[instrument(name = "handler::cart_add", skip(app_state, user, guest, payload), fields(product_id = %payload.product_id, quantity = payload.quantity))]
pub async fn add_to_cart_handler(
  app_state: web::Data<AppState>,
  user: OptionalUser,
  guest: GuestCartKey,
  payload: web::Json<CartItemPayload>,
) -> Result<HttpResponse, AppError> {
  match &user.0 {
    Some(auth) => {
      let ctx = Ctx::new(AddToCartCtxData {
        app_state: app_state.get_ref().clone(),
        user_id: auth.user_id,
        product_id: payload.product_id,
        quantity: payload.quantity,
        product: None,
        cart_item: None,
      });
      if let Outcome::Halted = app_state.flows.run(ctx).await? {
        return Err(AppError::PipelineHalted("Không thể thêm sản phẩm vào giỏ hàng".to_string()));
      }
    }
    None => {
      let product = db::products::find_by_id(&app_state.db_pool, payload.product_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Không tìm thấy sản phẩm".to_string()))?;
      app_state
        .guest_carts
        .update(&guest.key, |cart| cart.add(&product, payload.quantity))?;
    }
  }
  info!("Item added to cart.");
  mutation_response(&app_state, &user, &guest, "Đã thêm sản phẩm vào giỏ hàng").await
}

#[instrument(name = "handler::cart_update", skip(app_state, user, guest, payload), fields(product_id = %payload.product_id, quantity = payload.quantity))]
pub async fn update_cart_handler(
  app_state: web::Data<AppState>,
  user: OptionalUser,
  guest: GuestCartKey,
  payload: web::Json<CartItemPayload>,
) -> Result<HttpResponse, AppError> {
  let product = db::products::find_by_id(&app_state.db_pool, payload.product_id).await?;
  match &user.0 {
    Some(auth) => {
      if payload.quantity <= 0 {
        return Err(AppError::Validation("Số lượng phải lớn hơn 0".to_string()));
      }
      let product = product.ok_or_else(|| AppError::NotFound("Không tìm thấy sản phẩm".to_string()))?;
      if payload.quantity > product.stock_quantity {
        return Err(AppError::Validation(format!(
          "Không đủ hàng trong kho. Còn lại: {}",
          product.stock_quantity
        )));
      }
      if !db::cart::set_quantity(&app_state.db_pool, auth.user_id, product.id, payload.quantity).await? {
        return Err(AppError::Validation("Sản phẩm không có trong giỏ hàng".to_string()));
      }
    }
    None => {
      let stock = product.as_ref().map_or(0, |p| p.stock_quantity);
      app_state
        .guest_carts
        .update(&guest.key, |cart| cart.update(payload.product_id, payload.quantity, stock))?;
    }
  }
  mutation_response(&app_state, &user, &guest, "Đã cập nhật giỏ hàng").await
}

#[instrument(name = "handler::cart_remove", skip(app_state, user, guest, path), fields(product_id = %path.as_ref()))]
pub async fn remove_from_cart_handler(
  app_state: web::Data<AppState>,
  user: OptionalUser,
  guest: GuestCartKey,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let product_id = path.into_inner();
  let removed = match &user.0 {
    Some(auth) => db::cart::remove(&app_state.db_pool, auth.user_id, product_id).await?,
    None => app_state.guest_carts.update(&guest.key, |cart| cart.remove(product_id)),
  };
  if !removed {
    return Err(AppError::Validation("Sản phẩm không có trong giỏ hàng".to_string()));
  }
  mutation_response(&app_state, &user, &guest, "Đã xóa sản phẩm khỏi giỏ hàng").await
}

#[instrument(name = "handler::cart_clear", skip(app_state, user, guest))]
pub async fn clear_cart_handler(
  app_state: web::Data<AppState>,
  user: OptionalUser,
  guest: GuestCartKey,
) -> Result<HttpResponse, AppError> {
  match &user.0 {
    Some(auth) => {
      db::cart::clear(&app_state.db_pool, auth.user_id).await?;
    }
    None => app_state.guest_carts.clear(&guest.key),
  }
  mutation_response(&app_state, &user, &guest, "Đã xóa tất cả sản phẩm khỏi giỏ hàng").await
}

#[instrument(name = "handler::cart_items", skip(app_state, user, guest))]
pub async fn cart_items_handler(
  app_state: web::Data<AppState>,
  user: OptionalUser,
  guest: GuestCartKey,
) -> Result<HttpResponse, AppError> {
  let body = match &user.0 {
    Some(auth) => {
      let lines = db::cart::lines_for_user(&app_state.db_pool, auth.user_id).await?;
      let count: i64 = lines.iter().map(|l| i64::from(l.quantity)).sum();
      let total: i64 = lines.iter().map(|l| l.line_total()).sum();
      json!({ "success": true, "items": lines, "cartItemCount": count, "cartTotal": total })
    }
    None => {
      let cart = app_state.guest_carts.get(&guest.key);
      json!({ "success": true, "items": cart.items(), "cartItemCount": cart.count(), "cartTotal": cart.total() })
    }
  };
  Ok(with_cart_cookie(HttpResponse::Ok(), &user, &guest).json(body))
}

/// Database cart in the shape the browser keeps in local storage.
#[instrument(name = "handler::cart_sync", skip(app_state, user), fields(user_id = %user.user_id))]
pub async fn cart_sync_handler(app_state: web::Data<AppState>, user: AuthenticatedUser) -> Result<HttpResponse, AppError> {
  let lines = db::cart::lines_for_user(&app_state.db_pool, user.user_id).await?;
  let count: i64 = lines.iter().map(|l| i64::from(l.quantity)).sum();
  Ok(HttpResponse::Ok().json(json!({
    "needsSync": cart_sync::needs_sync(count),
    "cart": cart_sync::to_local_storage(&lines),
  })))
}

#[instrument(name = "handler::cart_weights", skip(app_state, ids), fields(count = ids.len()))]
pub async fn cart_weights_handler(
  app_state: web::Data<AppState>,
  ids: web::Json<Vec<Uuid>>,
) -> Result<HttpResponse, AppError> {
  let ids = ids.into_inner();
  let known: HashMap<Uuid, Option<i32>> = db::products::weights(&app_state.db_pool, &ids).await?.into_iter().collect();
  let weights: HashMap<Uuid, i32> = ids
    .iter()
    .map(|id| (*id, known.get(id).copied().flatten().unwrap_or(DEFAULT_WEIGHT_GRAMS)))
    .collect();
  Ok(HttpResponse::Ok().json(json!({ "success": true, "weights": weights })))
}

/// Confirms the signed-in user's cart can go to checkout.
#[instrument(name = "handler::cart_checkout_ready", skip(app_state, user))]
pub async fn checkout_ready_handler(app_state: web::Data<AppState>, user: OptionalUser) -> Result<HttpResponse, AppError> {
  let lines =
    common_steps::ensure_cart_available_for_checkout(&app_state.db_pool, user.0.as_ref().map(|u| u.user_id)).await?;
  let total: i64 = lines.iter().map(|l| l.line_total()).sum();
  Ok(HttpResponse::Ok().json(json!({ "success": true, "items": lines, "cartTotal": total })))
}
