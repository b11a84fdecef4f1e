#[macro_use]
mod common;

use actix_web::{http::StatusCode, test};
use common::{body_json, state_with_mailer, test_state};
use dacsanviet::services::mailer::OutboxMailer;
use serde_json::json;
use std::sync::Arc;

#[actix_rt::test]
async fn health_endpoints_answer_ok() {
  let (state, _) = test_state();
  let app = init_app!(state);

  for uri in ["/health", "/api/health"] {
    let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK, "{}", uri);
    assert_eq!(body_json(resp).await, json!({ "status": "ok" }));
  }
}

#[actix_rt::test]
async fn consultation_rejects_bad_phone_and_email() {
  let (state, outbox) = test_state();
  let app = init_app!(state);

  let bad_phone = test::TestRequest::post()
    .uri("/api/consultation")
    .set_json(json!({ "name": "Minh", "phone": "09123", "email": "minh@example.com" }))
    .to_request();
  let resp = test::call_service(&app, bad_phone).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

  let bad_email = test::TestRequest::post()
    .uri("/api/consultation")
    .set_json(json!({ "name": "Minh", "phone": "0912345678", "email": "minh-at-example" }))
    .to_request();
  let resp = test::call_service(&app, bad_email).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  assert!(body_json(resp).await["error"].as_str().unwrap().contains("Email"));

  assert!(outbox.sent().is_empty());
}

#[actix_rt::test]
async fn consultation_is_forwarded_to_shop_inbox() {
  let (state, outbox) = test_state();
  let app = init_app!(state);

  let req = test::TestRequest::post()
    .uri("/api/consultation")
    .set_json(json!({
      "name": "Nguyễn Minh",
      "phone": "0912345678",
      "email": "minh@example.com",
      "interest": "qua-tang",
      "message": "Cần 50 hộp quà cho công ty",
    }))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(
    body_json(resp).await["message"],
    "Cảm ơn bạn! Chúng tôi sẽ liên hệ tư vấn trong vòng 24h."
  );

  let mail = outbox.last_to("lienhe@dacsanviet.com").expect("consultation email");
  assert_eq!(mail.subject, "Yêu Cầu Tư Vấn Mới - Đặc Sản Việt");
  assert!(mail.html_body.contains("Quà tặng doanh nghiệp"));
}

#[actix_rt::test]
async fn consultation_mail_failure_is_a_generic_500() {
  let state = state_with_mailer(Arc::new(OutboxMailer::failing()));
  let app = init_app!(state);

  let req = test::TestRequest::post()
    .uri("/api/consultation")
    .set_json(json!({ "name": "Lan", "phone": "0987654321", "email": "lan@example.com" }))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
  assert_eq!(body_json(resp).await, json!({ "error": "Có lỗi xảy ra!" }));
}

#[actix_rt::test]
async fn signup_validation_runs_before_any_lookup() {
  let (state, outbox) = test_state();
  let app = init_app!(state);

  let req = test::TestRequest::post()
    .uri("/api/auth/signup")
    .set_json(json!({ "username": "lan", "email": "lan@example.com", "password": "123" }))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  assert!(outbox.sent().is_empty());
}

#[actix_rt::test]
async fn password_reset_confirm_checks_new_password_length() {
  let (state, _) = test_state();
  let app = init_app!(state);

  let req = test::TestRequest::post()
    .uri("/api/auth/password-reset/confirm")
    .set_json(json!({ "token": "whatever", "newPassword": "abc" }))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_rt::test]
async fn qa_publish_requires_name_and_question() {
  let (state, _) = test_state();
  let app = init_app!(state);

  let req = test::TestRequest::post()
    .uri("/product/qa")
    .set_json(json!({
      "productId": uuid::Uuid::new_v4(),
      "userName": "Hà",
      "question": "   ",
    }))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  assert_eq!(body_json(resp).await["error"], "Vui lòng nhập câu hỏi");
}

#[actix_rt::test]
async fn qa_like_toggle_requires_identifier() {
  let (state, _) = test_state();
  let app = init_app!(state);

  let uri = format!("/api/products/qa/{}/like?userIdentifier=%20", uuid::Uuid::new_v4());
  let resp = test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_rt::test]
async fn promotion_check_rejects_out_of_range_totals() {
  let (state, _) = test_state();
  let app = init_app!(state);

  for total in ["0", "-5000", "922337203685477580"] {
    let uri = format!("/api/promotions/validate?code=TET2025&orderTotal={}", total);
    let resp = test::call_service(&app, test::TestRequest::post().uri(&uri).to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{}", total);
    assert_eq!(body_json(resp).await["error"], "Tổng đơn hàng không hợp lệ");
  }
}
