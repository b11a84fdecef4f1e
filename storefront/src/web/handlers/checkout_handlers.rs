use actix_web::{web, HttpResponse};
use serde_json::json;
use storeflow::{Ctx, Outcome};
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::pipelines::checkout_pipeline;
use crate::pipelines::contexts::{CheckoutCtxData, CheckoutRequest};
use crate::state::AppState;
use crate::web::extractors::{GuestCartKey, OptionalUser};

#[instrument(
  name = "handler::checkout",
  skip(app_state, user, guest, req_payload),
  fields(user_id = ?user.0.as_ref().map(|u| u.user_id), payment_method = %req_payload.payment_method)
)]
pub async fn checkout_handler(
  app_state: web::Data<AppState>,
  user: OptionalUser,
  guest: GuestCartKey,
  req_payload: web::Json<CheckoutRequest>,
) -> Result<HttpResponse, AppError> {
  let user_id = user.0.as_ref().map(|u| u.user_id);
  let guest_cart_key = user_id.is_none().then(|| guest.key.clone());
  let ctx = Ctx::new(CheckoutCtxData::new(
    app_state.get_ref().clone(),
    user_id,
    guest_cart_key,
    req_payload.into_inner(),
  ));

  match app_state.flows.run(ctx.clone()).await? {
    Outcome::Completed => {
      let guard = ctx.read();
      let (Some(order), Some(method)) = (guard.order.clone(), guard.payment_method) else {
        warn!("Checkout completed without an order.");
        return Err(AppError::Internal("Checkout completed without an order".to_string()));
      };
      info!(
        order_id = %order.id,
        order_number = %order.order_number,
        total = order.total_amount,
        confirmation_sent = guard.confirmation_sent,
        "Checkout completed."
      );

      let redirect = match user_id {
        Some(_) => format!("/orders/{}", order.id),
        None => format!("/checkout/success?orderNumber={}", order.order_number),
      };
      Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "orderId": order.id,
        "orderNumber": order.order_number,
        "message": checkout_pipeline::success_message(method, &order.order_number),
        "redirect": redirect,
        "totals": {
          "subtotal": order.subtotal,
          "discountAmount": order.discount_amount,
          "shippingFee": order.shipping_fee,
          "taxAmount": order.tax_amount,
          "totalAmount": order.total_amount,
        },
        "confirmationEmailSent": guard.confirmation_sent,
      })))
    }
    Outcome::Halted => Err(AppError::PipelineHalted("Thanh toán bị gián đoạn".to_string())),
  }
}
