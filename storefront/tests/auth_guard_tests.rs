#[macro_use]
mod common;

use actix_web::{http::StatusCode, test};
use common::{bearer, body_json, login_as, test_state};
use dacsanviet::models::Role;
use serde_json::json;
use uuid::Uuid;

#[actix_rt::test]
async fn protected_routes_require_a_session() {
  let (state, _) = test_state();
  let app = init_app!(state);

  for uri in ["/api/orders", "/api/addresses", "/api/auth/me", "/api/cart/sync", "/api/admin/orders"] {
    let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{}", uri);
    assert_eq!(body_json(resp).await["error"], "Vui lòng đăng nhập");
  }
}

#[actix_rt::test]
async fn unknown_tokens_are_rejected() {
  let (state, _) = test_state();
  let app = init_app!(state);

  let req = test::TestRequest::get()
    .uri("/api/orders")
    .insert_header(bearer("not-a-real-token"))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
async fn customers_cannot_reach_the_back_office() {
  let (state, _) = test_state();
  let token = login_as(&state, Role::User);
  let app = init_app!(state);

  let req = test::TestRequest::get()
    .uri("/api/admin/orders")
    .insert_header(bearer(&token))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);
  assert_eq!(body_json(resp).await["error"], "Bạn không có quyền truy cập");

  let uri = format!("/admin/orders/{}", Uuid::new_v4());
  let req = test::TestRequest::get().uri(&uri).insert_header(bearer(&token)).to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_rt::test]
async fn staff_cannot_delete_users_or_products() {
  let (state, _) = test_state();
  let token = login_as(&state, Role::Staff);
  let app = init_app!(state);

  for uri in [
    format!("/api/admin/users/{}", Uuid::new_v4()),
    format!("/api/admin/products/{}", Uuid::new_v4()),
  ] {
    let req = test::TestRequest::delete().uri(&uri).insert_header(bearer(&token)).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN, "{}", uri);
    assert_eq!(
      body_json(resp).await["error"],
      "Chỉ quản trị viên mới được thực hiện thao tác này"
    );
  }
}

#[actix_rt::test]
async fn staff_filters_are_validated() {
  let (state, _) = test_state();
  let token = login_as(&state, Role::Staff);
  let app = init_app!(state);

  let req = test::TestRequest::get()
    .uri("/api/admin/orders?status=LOST")
    .insert_header(bearer(&token))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

  let req = test::TestRequest::post()
    .uri("/api/admin/promotions")
    .insert_header(bearer(&token))
    .set_json(json!({
      "code": "TET",
      "discountType": "PERCENTAGE",
      "discountValue": 150,
      "startDate": "2025-01-01T00:00:00Z",
      "endDate": "2025-02-01T00:00:00Z",
    }))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_rt::test]
async fn signout_revokes_the_session() {
  let (state, _) = test_state();
  let token = login_as(&state, Role::User);
  let sessions = state.sessions.clone();
  let app = init_app!(state);

  let req = test::TestRequest::post()
    .uri("/api/auth/signout")
    .insert_header(bearer(&token))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert!(sessions.resolve(&token).is_none());

  let req = test::TestRequest::get()
    .uri("/api/orders")
    .insert_header(bearer(&token))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
async fn address_payload_is_validated_before_saving() {
  let (state, _) = test_state();
  let token = login_as(&state, Role::User);
  let app = init_app!(state);

  let req = test::TestRequest::post()
    .uri("/api/addresses")
    .insert_header(bearer(&token))
    .set_json(json!({
      "fullName": "Trần Lan",
      "phone": "12ab",
      "addressLine1": "12 Lê Lợi",
      "city": "Huế",
    }))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  assert_eq!(body_json(resp).await["error"], "Số điện thoại không hợp lệ");
}
