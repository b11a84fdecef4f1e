//! State carried through each workflow. Handlers receive these wrapped in `storeflow::Ctx`.

use crate::models::{CartItem, Order, OrderItem, OrderStatus, PasswordResetToken, PaymentMethod, Product, Promotion, User};
use crate::state::AppState;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Clone)]
pub struct SignupCtxData {
  pub app_state: AppState,
  pub username: String,
  pub email: String,
  pub password: String,
  pub full_name: Option<String>,
  pub phone_number: Option<String>,
  pub created_user: Option<User>,
  pub welcome_email_sent: bool,
}

#[derive(Clone)]
pub struct SigninCtxData {
  pub app_state: AppState,
  /// Username or email.
  pub login: String,
  pub password: String,
  /// Guest cart to fold into the account once signed in.
  pub guest_cart_key: Option<String>,
  pub user: Option<User>,
  pub session_token: Option<String>,
  pub merged_items: usize,
  pub skipped_items: usize,
}

#[derive(Clone)]
pub struct AddToCartCtxData {
  pub app_state: AppState,
  pub user_id: Uuid,
  pub product_id: Uuid,
  pub quantity: i32,
  pub product: Option<Product>,
  pub cart_item: Option<CartItem>,
}

// --- Checkout ---

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutItemRequest {
  pub product_id: Uuid,
  pub quantity: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
  #[serde(default)]
  pub customer_name: String,
  #[serde(default)]
  pub customer_email: String,
  #[serde(default)]
  pub customer_phone: String,
  #[serde(default)]
  pub shipping_address: String,
  #[serde(default)]
  pub payment_method: String,
  pub notes: Option<String>,
  pub promotion_code: Option<String>,
  /// Cart kept in the browser; takes precedence over the stored carts.
  pub items: Option<Vec<CheckoutItemRequest>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSource {
  Request,
  UserCart,
  GuestCart,
}

#[derive(Debug, Clone)]
pub struct CheckoutLine {
  pub product: Product,
  pub quantity: i32,
}

impl CheckoutLine {
  pub fn line_total(&self) -> i64 {
    self.product.price * i64::from(self.quantity)
  }
}

#[derive(Clone)]
pub struct CheckoutCtxData {
  pub app_state: AppState,
  pub user_id: Option<Uuid>,
  pub guest_cart_key: Option<String>,
  pub request: CheckoutRequest,

  pub payment_method: Option<PaymentMethod>,
  pub lines: Vec<CheckoutLine>,
  pub line_source: Option<LineSource>,
  pub promotion: Option<Promotion>,
  pub subtotal: i64,
  pub discount_amount: i64,
  pub shipping_fee: i64,
  pub tax_amount: i64,
  pub total_amount: i64,

  pub order: Option<Order>,
  pub items: Vec<OrderItem>,
  pub cart_cleared: bool,
  pub confirmation_sent: bool,
}

impl CheckoutCtxData {
  pub fn new(app_state: AppState, user_id: Option<Uuid>, guest_cart_key: Option<String>, request: CheckoutRequest) -> Self {
    Self {
      app_state,
      user_id,
      guest_cart_key,
      request,
      payment_method: None,
      lines: Vec::new(),
      line_source: None,
      promotion: None,
      subtotal: 0,
      discount_amount: 0,
      shipping_fee: 0,
      tax_amount: 0,
      total_amount: 0,
      order: None,
      items: Vec::new(),
      cart_cleared: false,
      confirmation_sent: false,
    }
  }
}

// --- Back-office order handling ---

#[derive(Clone)]
pub struct OrderStatusCtxData {
  pub app_state: AppState,
  pub order_id: Uuid,
  pub new_status: OrderStatus,
  pub notes: Option<String>,
  pub order: Option<Order>,
  pub previous_status: Option<OrderStatus>,
  pub changed: bool,
  pub notified: bool,
}

#[derive(Clone)]
pub struct ApproveCodCtxData {
  pub app_state: AppState,
  pub order_id: Uuid,
  pub shipping_carrier: Option<String>,
  pub tracking_number: Option<String>,
  pub notes: Option<String>,
  pub order: Option<Order>,
  pub notified: bool,
}

// --- Password reset ---

#[derive(Clone)]
pub struct PasswordResetRequestCtxData {
  pub app_state: AppState,
  pub email: String,
  pub user: Option<User>,
  pub token: Option<String>,
  pub email_sent: bool,
}

#[derive(Clone)]
pub struct PasswordResetConfirmCtxData {
  pub app_state: AppState,
  pub token: String,
  pub new_password: String,
  pub reset: Option<PasswordResetToken>,
  pub user: Option<User>,
  pub confirmation_sent: bool,
}
