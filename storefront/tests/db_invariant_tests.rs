// Runs against a real PostgreSQL: `#[sqlx::test]` creates a fresh database per
// test from DATABASE_URL and applies the migrations before handing over the pool.
#[macro_use]
mod common;

use actix_web::{http::StatusCode, test};
use chrono::{Duration, Utc};
use common::{bearer, body_json, setup_tracing};
use dacsanviet::config::AppConfig;
use dacsanviet::db::{self, orders::OrderDetailsPatch, products::NewProduct, promotions::PromotionInput, users::NewUser};
use dacsanviet::errors::AppError;
use dacsanviet::models::{DiscountType, Order, OrderStatus, PaymentStatus, Product, Role, User};
use dacsanviet::pipelines::checkout_pipeline::build_checkout_workflow;
use dacsanviet::pipelines::contexts::{
  CheckoutCtxData, CheckoutItemRequest, CheckoutRequest, OrderStatusCtxData, PasswordResetConfirmCtxData,
};
use dacsanviet::pipelines::order_pipeline::build_order_status_workflow;
use dacsanviet::services::mailer::OutboxMailer;
use dacsanviet::state::AppState;
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use storeflow::{Control, Ctx, Outcome};
use uuid::Uuid;

fn state_on(pool: PgPool) -> (AppState, Arc<OutboxMailer>) {
  setup_tracing();
  let outbox = Arc::new(OutboxMailer::new());
  let config = Arc::new(AppConfig::for_tests("postgres://managed-by-sqlx-test"));
  (AppState::new(pool, config, outbox.clone()).expect("app state"), outbox)
}

async fn product(pool: &PgPool, name: &str, price: i64, stock: i32) -> Product {
  let new = NewProduct {
    name: name.to_string(),
    short_description: None,
    description: None,
    price,
    stock_quantity: stock,
    image_url: None,
    is_featured: false,
    weight_grams: Some(500),
    origin: None,
    story: None,
    category_id: None,
  };
  db::products::insert(pool, &new).await.unwrap()
}

async fn customer(pool: &PgPool, username: &str) -> User {
  let new = NewUser {
    username: username.to_string(),
    email: format!("{}@example.com", username),
    password_hash: "not-a-real-hash".to_string(),
    full_name: None,
    phone_number: None,
    role: Role::User,
  };
  db::users::insert(pool, &new).await.unwrap()
}

async fn stock_of(pool: &PgPool, id: Uuid) -> i32 {
  db::products::find_by_id(pool, id).await.unwrap().unwrap().stock_quantity
}

async fn count_rows(pool: &PgPool, table: &str) -> i64 {
  sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {}", table))
    .fetch_one(pool)
    .await
    .unwrap()
}

fn checkout_request(items: &[(Uuid, i32)], promotion_code: Option<&str>) -> CheckoutRequest {
  CheckoutRequest {
    customer_name: "Phạm Thu".into(),
    customer_email: "thu@example.com".into(),
    customer_phone: "0912345678".into(),
    shipping_address: "45 Trần Phú, Nha Trang".into(),
    payment_method: "COD".into(),
    promotion_code: promotion_code.map(str::to_string),
    items: Some(
      items
        .iter()
        .map(|(product_id, quantity)| CheckoutItemRequest {
          product_id: *product_id,
          quantity: *quantity,
        })
        .collect(),
    ),
    ..Default::default()
  }
}

async fn place_order(state: &AppState, items: &[(Uuid, i32)]) -> Order {
  let ctx = Ctx::new(CheckoutCtxData::new(state.clone(), None, None, checkout_request(items, None)));
  assert_eq!(state.flows.run(ctx.clone()).await.unwrap(), Outcome::Completed);
  let order = ctx.read().order.clone();
  order.expect("order persisted")
}

// --- Checkout ---

#[sqlx::test(migrations = "./migrations")]
async fn checkout_persists_order_and_takes_stock(pool: PgPool) {
  let (state, outbox) = state_on(pool.clone());
  let nem = product(&pool, "Nem chua", 45_000, 5).await;

  let order = place_order(&state, &[(nem.id, 2)]).await;
  assert_eq!(order.status, OrderStatus::Pending);
  assert_eq!(order.subtotal, 90_000);
  assert_eq!(stock_of(&pool, nem.id).await, 3);

  let items = db::orders::items_for(&pool, order.id).await.unwrap();
  assert_eq!(items.len(), 1);
  assert_eq!(items[0].quantity, 2);
  assert_eq!(items[0].unit_price, 45_000);
  assert!(outbox.last_to("thu@example.com").is_some());
}

#[sqlx::test(migrations = "./migrations")]
async fn checkout_rolls_back_when_stock_runs_out_before_persisting(pool: PgPool) {
  let (state, outbox) = state_on(pool.clone());
  let nem = product(&pool, "Nem chua", 45_000, 5).await;
  let pia = product(&pool, "Bánh pía", 60_000, 3).await;

  // Another buyer empties the shelf between the stock check and the insert.
  let mut wf = build_checkout_workflow().unwrap();
  let hook_pool = pool.clone();
  let pia_id = pia.id;
  wf.before("persist_order", move |_ctx: Ctx<CheckoutCtxData>| {
    let pool = hook_pool.clone();
    async move {
      sqlx::query("UPDATE products SET stock_quantity = 1 WHERE id = $1")
        .bind(pia_id)
        .execute(&pool)
        .await?;
      Ok::<_, AppError>(Control::Continue)
    }
  })
  .unwrap();

  let ctx = Ctx::new(CheckoutCtxData::new(
    state.clone(),
    None,
    None,
    checkout_request(&[(nem.id, 2), (pia.id, 2)], None),
  ));
  let err = wf.run(ctx.clone()).await.unwrap_err();
  assert!(matches!(err, AppError::Validation(ref m) if m == "Không đủ hàng trong kho"));

  assert_eq!(stock_of(&pool, nem.id).await, 5);
  assert_eq!(stock_of(&pool, pia.id).await, 1);
  assert_eq!(count_rows(&pool, "orders").await, 0);
  assert_eq!(count_rows(&pool, "order_items").await, 0);
  assert!(ctx.read().order.is_none());
  assert!(outbox.sent().is_empty());
}

// --- Promotions ---

#[sqlx::test(migrations = "./migrations")]
async fn promotion_usage_limit_holds_across_checkouts(pool: PgPool) {
  let (state, _) = state_on(pool.clone());
  let nem = product(&pool, "Nem chua", 45_000, 10).await;
  let now = Utc::now();
  let promotion = db::promotions::insert(
    &pool,
    &PromotionInput {
      code: "MOTLAN".into(),
      description: None,
      discount_type: DiscountType::Fixed,
      discount_value: 10_000,
      min_order_value: 0,
      max_discount: None,
      usage_limit: Some(1),
      start_date: now - Duration::days(1),
      end_date: now + Duration::days(1),
      is_active: true,
    },
  )
  .await
  .unwrap();

  let ctx = Ctx::new(CheckoutCtxData::new(
    state.clone(),
    None,
    None,
    checkout_request(&[(nem.id, 1)], Some("motlan")),
  ));
  assert_eq!(state.flows.run(ctx.clone()).await.unwrap(), Outcome::Completed);
  assert_eq!(ctx.read().discount_amount, 10_000);
  let used = db::promotions::find_by_id(&pool, promotion.id).await.unwrap().unwrap();
  assert_eq!(used.used_count, 1);

  let ctx = Ctx::new(CheckoutCtxData::new(
    state.clone(),
    None,
    None,
    checkout_request(&[(nem.id, 1)], Some("MOTLAN")),
  ));
  let err = state.flows.run(ctx.clone()).await.unwrap_err();
  assert!(matches!(err, AppError::Validation(_)));
  assert!(ctx.read().order.is_none());
  assert_eq!(stock_of(&pool, nem.id).await, 9);

  // The guard holds even when a caller skips the validity check.
  assert!(!db::promotions::consume(&pool, promotion.id).await.unwrap());
  let used = db::promotions::find_by_id(&pool, promotion.id).await.unwrap().unwrap();
  assert_eq!(used.used_count, 1);
}

// --- Addresses ---

#[sqlx::test(migrations = "./migrations")]
async fn address_book_keeps_exactly_one_default(pool: PgPool) {
  let (state, _) = state_on(pool.clone());
  let user = customer(&pool, "thu").await;
  let token = state.sessions.issue(user.id, &user.username, Role::User);
  let app = init_app!(state);

  let mut ids = Vec::new();
  for (street, is_default) in [("1 Lê Lợi", false), ("2 Lê Lợi", false), ("3 Lê Lợi", true)] {
    let req = test::TestRequest::post()
      .uri("/api/addresses")
      .insert_header(bearer(&token))
      .set_json(json!({
        "fullName": "Phạm Thu",
        "phone": "0912345678",
        "addressLine1": street,
        "city": "Huế",
        "isDefault": is_default,
      }))
      .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = body_json(resp).await;
    ids.push(body["id"].as_str().unwrap().parse::<Uuid>().unwrap());
  }

  let defaults = |addresses: Vec<dacsanviet::models::Address>| -> Vec<Uuid> {
    addresses.into_iter().filter(|a| a.is_default).map(|a| a.id).collect()
  };
  assert_eq!(defaults(db::addresses::list_for_user(&pool, user.id).await.unwrap()), vec![ids[2]]);

  let req = test::TestRequest::post()
    .uri(&format!("/api/addresses/{}/set-default", ids[0]))
    .insert_header(bearer(&token))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
  assert_eq!(defaults(db::addresses::list_for_user(&pool, user.id).await.unwrap()), vec![ids[0]]);

  // Deleting the default hands the flag to the newest remaining address.
  let req = test::TestRequest::delete()
    .uri(&format!("/api/addresses/{}", ids[0]))
    .insert_header(bearer(&token))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
  assert_eq!(defaults(db::addresses::list_for_user(&pool, user.id).await.unwrap()), vec![ids[2]]);

  let req = test::TestRequest::delete()
    .uri(&format!("/api/addresses/{}", ids[1]))
    .insert_header(bearer(&token))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
  assert_eq!(defaults(db::addresses::list_for_user(&pool, user.id).await.unwrap()), vec![ids[2]]);
}

// --- Q&A likes ---

#[sqlx::test(migrations = "./migrations")]
async fn like_counter_never_goes_negative(pool: PgPool) {
  let (state, _) = state_on(pool.clone());
  let nem = product(&pool, "Nem chua", 45_000, 5).await;
  let question = db::qa::insert(&pool, nem.id, None, "Lan", None, "Nem để được bao lâu?").await.unwrap();

  assert_eq!(db::qa::adjust_likes(&pool, question.id, -1).await.unwrap(), 0);

  let app = init_app!(state);
  let uri = format!("/api/products/qa/{}/like?userIdentifier=guest-7", question.id);
  let body = body_json(test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await).await;
  assert_eq!(body["liked"], true);
  assert_eq!(body["likesCount"], 1);

  let body = body_json(test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await).await;
  assert_eq!(body["liked"], false);
  assert_eq!(body["likesCount"], 0);
  assert!(!db::qa::has_liked(&pool, question.id, "guest-7").await.unwrap());
}

// --- Order status ---

#[sqlx::test(migrations = "./migrations")]
async fn admin_cancel_returns_stock_once(pool: PgPool) {
  let (state, _) = state_on(pool.clone());
  let nem = product(&pool, "Nem chua", 45_000, 5).await;
  let pia = product(&pool, "Bánh pía", 60_000, 4).await;
  let order = place_order(&state, &[(nem.id, 2), (pia.id, 3)]).await;
  assert_eq!(stock_of(&pool, nem.id).await, 3);
  assert_eq!(stock_of(&pool, pia.id).await, 1);

  let staff = state.sessions.issue(Uuid::new_v4(), "kho", Role::Staff);
  let app = init_app!(state);
  let cancel = || {
    test::TestRequest::put()
      .uri(&format!("/api/admin/orders/{}", order.id))
      .insert_header(bearer(&staff))
      .set_json(json!({ "status": "CANCELLED", "trackingNumber": "GHN-1" }))
      .to_request()
  };

  let resp = test::call_service(&app, cancel()).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let saved = db::orders::find_by_id(&pool, order.id).await.unwrap().unwrap();
  assert_eq!(saved.status, OrderStatus::Cancelled);
  assert_eq!(saved.tracking_number.as_deref(), Some("GHN-1"));
  assert_eq!(stock_of(&pool, nem.id).await, 5);
  assert_eq!(stock_of(&pool, pia.id).await, 4);

  let resp = test::call_service(&app, cancel()).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  assert_eq!(stock_of(&pool, nem.id).await, 5);
  assert_eq!(stock_of(&pool, pia.id).await, 4);
}

#[sqlx::test(migrations = "./migrations")]
async fn status_change_detects_a_concurrent_edit(pool: PgPool) {
  let (state, _) = state_on(pool.clone());
  let nem = product(&pool, "Nem chua", 45_000, 5).await;
  let order = place_order(&state, &[(nem.id, 2)]).await;

  let mut wf = build_order_status_workflow().unwrap();
  let hook_pool = pool.clone();
  let order_id = order.id;
  wf.before("persist_status", move |_ctx: Ctx<OrderStatusCtxData>| {
    let pool = hook_pool.clone();
    async move {
      sqlx::query("UPDATE orders SET status = 'CONFIRMED' WHERE id = $1")
        .bind(order_id)
        .execute(&pool)
        .await?;
      Ok::<_, AppError>(Control::Continue)
    }
  })
  .unwrap();

  let ctx = Ctx::new(OrderStatusCtxData {
    app_state: state.clone(),
    order_id,
    new_status: OrderStatus::Cancelled,
    notes: None,
    order: None,
    previous_status: None,
    changed: false,
    notified: false,
  });
  let err = wf.run(ctx).await.unwrap_err();
  assert!(matches!(err, AppError::Conflict(_)));

  let saved = db::orders::find_by_id(&pool, order_id).await.unwrap().unwrap();
  assert_eq!(saved.status, OrderStatus::Confirmed);
  assert_eq!(stock_of(&pool, nem.id).await, 3);
}

#[sqlx::test(migrations = "./migrations")]
async fn order_details_patch_leaves_other_columns_alone(pool: PgPool) {
  let (state, _) = state_on(pool.clone());
  let nem = product(&pool, "Nem chua", 45_000, 5).await;
  let order = place_order(&state, &[(nem.id, 1)]).await;

  let patch = OrderDetailsPatch {
    shipping_carrier: Some("GHN".into()),
    tracking_number: Some("GHN-42".into()),
    ..Default::default()
  };
  db::orders::apply_details(&pool, order.id, &patch).await.unwrap();

  let patch = OrderDetailsPatch {
    payment_status: Some(PaymentStatus::Completed),
    ..Default::default()
  };
  let saved = db::orders::apply_details(&pool, order.id, &patch).await.unwrap();
  assert_eq!(saved.payment_status, PaymentStatus::Completed);
  assert_eq!(saved.shipping_carrier.as_deref(), Some("GHN"));
  assert_eq!(saved.tracking_number.as_deref(), Some("GHN-42"));
  assert_eq!(saved.status, OrderStatus::Pending);
  assert_eq!(saved.total_amount, order.total_amount);
}

// --- Password reset ---

#[sqlx::test(migrations = "./migrations")]
async fn reset_token_can_only_be_used_once(pool: PgPool) {
  let (state, _) = state_on(pool.clone());
  let user = customer(&pool, "lan").await;
  db::password_resets::insert(&pool, user.id, "reset-token-1", Utc::now() + Duration::minutes(30))
    .await
    .unwrap();
  db::password_resets::insert(&pool, user.id, "reset-token-old", Utc::now() - Duration::minutes(1))
    .await
    .unwrap();

  let confirm = |token: &str| {
    Ctx::new(PasswordResetConfirmCtxData {
      app_state: state.clone(),
      token: token.to_string(),
      new_password: "matkhaumoi".to_string(),
      reset: None,
      user: None,
      confirmation_sent: false,
    })
  };
  assert_eq!(state.flows.run(confirm("reset-token-1")).await.unwrap(), Outcome::Completed);
  let changed = db::users::find_by_id(&pool, user.id).await.unwrap().unwrap();
  assert_ne!(changed.password_hash, "not-a-real-hash");

  let err = state.flows.run(confirm("reset-token-1")).await.unwrap_err();
  assert!(matches!(err, AppError::Validation(_)));

  let used = db::password_resets::find_by_token(&pool, "reset-token-1").await.unwrap().unwrap();
  assert!(used.used);
  assert!(!db::password_resets::claim(&pool, used.id).await.unwrap());

  let expired = db::password_resets::find_by_token(&pool, "reset-token-old").await.unwrap().unwrap();
  assert!(!db::password_resets::claim(&pool, expired.id).await.unwrap());
}
