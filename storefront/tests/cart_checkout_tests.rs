#[macro_use]
mod common;

use actix_web::cookie::Cookie;
use actix_web::{http::StatusCode, test};
use chrono::Utc;
use common::{body_json, test_state};
use dacsanviet::errors::AppError;
use dacsanviet::models::{PaymentMethod, Product};
use dacsanviet::pipelines::contexts::{CheckoutCtxData, CheckoutRequest};
use dacsanviet::services::session_cart::CART_COOKIE;
use serde_json::json;
use storeflow::Ctx;
use uuid::Uuid;

fn product(name: &str, price: i64, stock: i32) -> Product {
  let now = Utc::now();
  Product {
    id: Uuid::new_v4(),
    name: name.to_string(),
    short_description: None,
    description: None,
    price,
    stock_quantity: stock,
    image_url: None,
    is_active: true,
    is_featured: false,
    weight_grams: Some(500),
    origin: None,
    story: None,
    category_id: None,
    created_at: now,
    updated_at: now,
  }
}

fn valid_request() -> CheckoutRequest {
  CheckoutRequest {
    customer_name: "Phạm Thu".into(),
    customer_email: "thu@example.com".into(),
    customer_phone: "0912345678".into(),
    shipping_address: "45 Trần Phú, Nha Trang".into(),
    payment_method: "COD".into(),
    ..Default::default()
  }
}

#[actix_rt::test]
async fn first_visit_gets_an_empty_cart_and_a_cookie() {
  let (state, _) = test_state();
  let app = init_app!(state);

  let resp = test::call_service(&app, test::TestRequest::get().uri("/cart/api/items").to_request()).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let cookie = resp
    .response()
    .cookies()
    .find(|c| c.name() == CART_COOKIE)
    .map(|c| c.value().to_string());
  assert!(cookie.is_some_and(|v| !v.is_empty()));

  let body = body_json(resp).await;
  assert_eq!(body["items"], json!([]));
  assert_eq!(body["cartItemCount"], 0);
  assert_eq!(body["cartTotal"], 0);
}

#[actix_rt::test]
async fn guest_cart_follows_its_cookie() {
  let (state, _) = test_state();
  let nem = product("Nem chua", 45_000, 10);
  let pia = product("Bánh pía", 60_000, 5);
  state.guest_carts.update("guest-1", |cart| cart.add(&nem, 2)).unwrap();
  state.guest_carts.update("guest-1", |cart| cart.add(&pia, 1)).unwrap();
  let carts = state.guest_carts.clone();
  let app = init_app!(state);

  let req = test::TestRequest::get()
    .uri("/cart/api/items")
    .cookie(Cookie::new(CART_COOKIE, "guest-1"))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert!(resp.response().cookies().next().is_none());
  let body = body_json(resp).await;
  assert_eq!(body["cartItemCount"], 3);
  assert_eq!(body["cartTotal"], 150_000);
  assert_eq!(body["items"][0]["name"], "Nem chua");

  let req = test::TestRequest::delete()
    .uri(&format!("/cart/remove/{}", nem.id))
    .cookie(Cookie::new(CART_COOKIE, "guest-1"))
    .to_request();
  let body = body_json(test::call_service(&app, req).await).await;
  assert_eq!(body["success"], true);
  assert_eq!(body["message"], "Đã xóa sản phẩm khỏi giỏ hàng");
  assert_eq!(body["cartItemCount"], 1);
  assert_eq!(body["cartTotal"], 60_000);

  let req = test::TestRequest::delete()
    .uri(&format!("/cart/remove/{}", nem.id))
    .cookie(Cookie::new(CART_COOKIE, "guest-1"))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  assert_eq!(body_json(resp).await["error"], "Sản phẩm không có trong giỏ hàng");

  let req = test::TestRequest::delete()
    .uri("/cart/clear")
    .cookie(Cookie::new(CART_COOKIE, "guest-1"))
    .to_request();
  let body = body_json(test::call_service(&app, req).await).await;
  assert_eq!(body["message"], "Đã xóa tất cả sản phẩm khỏi giỏ hàng");
  assert_eq!(body["cartItemCount"], 0);
  assert!(carts.get("guest-1").is_empty());
}

#[actix_rt::test]
async fn checkout_rejects_invalid_contact_details() {
  let (state, outbox) = test_state();
  let app = init_app!(state);

  let req = test::TestRequest::post()
    .uri("/api/checkout")
    .set_json(json!({
      "customerName": "Thu",
      "customerEmail": "thu@example.com",
      "customerPhone": "091",
      "shippingAddress": "Nha Trang",
      "paymentMethod": "COD",
    }))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  assert_eq!(body_json(resp).await["error"], "Số điện thoại phải có 10-11 chữ số");

  let req = test::TestRequest::post()
    .uri("/api/checkout")
    .set_json(json!({
      "customerName": "Thu",
      "customerEmail": "thu@example.com",
      "customerPhone": "0912345678",
      "shippingAddress": "Nha Trang",
      "paymentMethod": "BITCOIN",
    }))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  assert!(outbox.sent().is_empty());
}

#[actix_rt::test]
async fn guest_checkout_with_empty_cart_is_refused() {
  let (state, _) = test_state();
  let app = init_app!(state);

  let req = test::TestRequest::post()
    .uri("/api/checkout")
    .cookie(Cookie::new(CART_COOKIE, "nobody-home"))
    .set_json(json!({
      "customerName": "Thu",
      "customerEmail": "thu@example.com",
      "customerPhone": "0912345678",
      "shippingAddress": "Nha Trang",
      "paymentMethod": "VNPAY",
    }))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  assert_eq!(body_json(resp).await["error"], "Giỏ hàng trống");
}

#[actix_rt::test]
async fn checkout_workflow_stops_at_validation() {
  let (state, _) = test_state();
  let mut request = valid_request();
  request.customer_email = "thu.example.com".into();
  let ctx = Ctx::new(CheckoutCtxData::new(state.clone(), None, None, request));

  let err = state.flows.run(ctx.clone()).await.unwrap_err();
  assert!(matches!(err, AppError::Validation(ref m) if m == "Email không hợp lệ"));
  let guard = ctx.read();
  assert!(guard.payment_method.is_none());
  assert!(guard.line_source.is_none());
  assert!(guard.order.is_none());
}

#[actix_rt::test]
async fn checkout_workflow_records_payment_method_before_resolving_lines() {
  let (state, _) = test_state();
  let ctx = Ctx::new(CheckoutCtxData::new(
    state.clone(),
    None,
    Some("empty-guest".into()),
    valid_request(),
  ));

  let err = state.flows.run(ctx.clone()).await.unwrap_err();
  assert!(matches!(err, AppError::Validation(ref m) if m == "Giỏ hàng trống"));
  let guard = ctx.read();
  assert_eq!(guard.payment_method, Some(PaymentMethod::Cod));
  assert!(guard.lines.is_empty());
  assert_eq!(guard.total_amount, 0);
}
