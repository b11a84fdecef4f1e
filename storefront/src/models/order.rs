use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::order_item::OrderItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
  Pending,
  Confirmed,
  Processing,
  Shipped,
  Delivered,
  Cancelled,
}

impl OrderStatus {
  pub fn display_name(self) -> &'static str {
    match self {
      OrderStatus::Pending => "Chờ xác nhận",
      OrderStatus::Confirmed => "Đã xác nhận",
      OrderStatus::Processing => "Đang xử lý",
      OrderStatus::Shipped => "Đang giao hàng",
      OrderStatus::Delivered => "Đã giao hàng",
      OrderStatus::Cancelled => "Đã hủy",
    }
  }

  /// Whether an order may move from `self` to `next`. Re-applying the current status is allowed.
  pub fn can_transition_to(self, next: OrderStatus) -> bool {
    use OrderStatus::*;
    if self == next {
      return true;
    }
    match self {
      Pending => matches!(next, Confirmed | Processing | Shipped | Cancelled),
      Confirmed => matches!(next, Processing | Shipped | Cancelled),
      Processing => matches!(next, Shipped | Cancelled),
      Shipped => next == Delivered,
      Delivered | Cancelled => false,
    }
  }
}

impl std::str::FromStr for OrderStatus {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_uppercase().as_str() {
      "PENDING" => Ok(OrderStatus::Pending),
      "CONFIRMED" => Ok(OrderStatus::Confirmed),
      "PROCESSING" => Ok(OrderStatus::Processing),
      "SHIPPED" => Ok(OrderStatus::Shipped),
      "DELIVERED" => Ok(OrderStatus::Delivered),
      "CANCELLED" => Ok(OrderStatus::Cancelled),
      other => Err(format!("Trạng thái đơn hàng không hợp lệ: {}", other)),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
  Pending,
  Completed,
  Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_method", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
  Cod,
  Momo,
  Vnpay,
  Vietqr,
  BankTransfer,
}

impl PaymentMethod {
  pub fn display_text(self) -> &'static str {
    match self {
      PaymentMethod::Cod => "Thanh toán khi nhận hàng (COD)",
      PaymentMethod::Momo => "Ví điện tử Momo",
      PaymentMethod::Vnpay => "VNPAY",
      PaymentMethod::Vietqr => "VietQR",
      PaymentMethod::BankTransfer => "Chuyển khoản ngân hàng",
    }
  }
}

impl std::str::FromStr for PaymentMethod {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_uppercase().as_str() {
      "COD" => Ok(PaymentMethod::Cod),
      "MOMO" => Ok(PaymentMethod::Momo),
      "VNPAY" => Ok(PaymentMethod::Vnpay),
      "VIETQR" => Ok(PaymentMethod::Vietqr),
      "BANK_TRANSFER" => Ok(PaymentMethod::BankTransfer),
      other => Err(format!("Phương thức thanh toán không hợp lệ: {}", other)),
    }
  }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
  pub id: Uuid,
  pub order_number: String,
  pub user_id: Option<Uuid>,
  pub subtotal: i64,
  pub discount_amount: i64,
  pub shipping_fee: i64,
  pub tax_amount: i64,
  pub total_amount: i64,
  pub status: OrderStatus,
  pub payment_method: PaymentMethod,
  pub payment_status: PaymentStatus,
  pub promotion_code: Option<String>,
  pub customer_name: String,
  pub customer_email: String,
  pub customer_phone: String,
  pub shipping_address_text: String,
  pub shipping_carrier: Option<String>,
  pub shipping_method: Option<String>,
  pub tracking_number: Option<String>,
  pub notes: Option<String>,
  pub order_date: DateTime<Utc>,
  pub shipped_date: Option<DateTime<Utc>>,
  pub delivered_date: Option<DateTime<Utc>>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Order {
  pub fn can_be_cancelled(&self) -> bool {
    matches!(self.status, OrderStatus::Pending | OrderStatus::Confirmed)
  }

  pub fn is_completed(&self) -> bool {
    self.status == OrderStatus::Delivered
  }

  /// Moves the order to `next`, stamping shipped/delivered dates the first time they apply.
  ///
  /// Returns whether the status actually changed.
  pub fn apply_status(&mut self, next: OrderStatus, now: DateTime<Utc>) -> Result<bool, String> {
    if !self.status.can_transition_to(next) {
      return Err(format!(
        "Không thể chuyển trạng thái từ \"{}\" sang \"{}\"",
        self.status.display_name(),
        next.display_name()
      ));
    }
    let changed = self.status != next;
    self.status = next;
    match next {
      OrderStatus::Shipped if self.shipped_date.is_none() => self.shipped_date = Some(now),
      OrderStatus::Delivered if self.delivered_date.is_none() => self.delivered_date = Some(now),
      _ => {}
    }
    Ok(changed)
  }
}

/// `subtotal − discount + shipping + tax`.
pub fn compute_total(subtotal: i64, discount: i64, shipping: i64, tax: i64) -> i64 {
  subtotal - discount + shipping + tax
}

/// An order together with its line items.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderWithItems {
  #[serde(flatten)]
  pub order: Order,
  pub status_label: &'static str,
  pub payment_method_text: &'static str,
  pub items: Vec<OrderItem>,
}

impl OrderWithItems {
  pub fn new(order: Order, items: Vec<OrderItem>) -> Self {
    Self {
      status_label: order.status.display_name(),
      payment_method_text: order.payment_method.display_text(),
      order,
      items,
    }
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;

  pub(crate) fn sample_order(status: OrderStatus) -> Order {
    let now = Utc::now();
    Order {
      id: Uuid::new_v4(),
      order_number: "ORD170000000000042".to_string(),
      user_id: None,
      subtotal: 250_000,
      discount_amount: 0,
      shipping_fee: 30_000,
      tax_amount: 0,
      total_amount: 280_000,
      status,
      payment_method: PaymentMethod::Cod,
      payment_status: PaymentStatus::Pending,
      promotion_code: None,
      customer_name: "Nguyễn Văn An".to_string(),
      customer_email: "an@example.com".to_string(),
      customer_phone: "0912345678".to_string(),
      shipping_address_text: "12 Hàng Bạc, Hoàn Kiếm, Hà Nội".to_string(),
      shipping_carrier: None,
      shipping_method: None,
      tracking_number: None,
      notes: None,
      order_date: now,
      shipped_date: None,
      delivered_date: None,
      created_at: now,
      updated_at: now,
    }
  }

  #[test]
  fn transitions_follow_lifecycle() {
    use OrderStatus::*;
    assert!(Pending.can_transition_to(Shipped));
    assert!(Confirmed.can_transition_to(Processing));
    assert!(Processing.can_transition_to(Cancelled));
    assert!(Shipped.can_transition_to(Delivered));
    assert!(!Shipped.can_transition_to(Cancelled));
    assert!(!Processing.can_transition_to(Confirmed));
    assert!(!Delivered.can_transition_to(Pending));
    assert!(!Cancelled.can_transition_to(Pending));
    assert!(Delivered.can_transition_to(Delivered));
  }

  #[test]
  fn shipping_and_delivery_dates_are_stamped_once() {
    let mut order = sample_order(OrderStatus::Pending);
    let first = Utc::now();
    assert!(order.apply_status(OrderStatus::Shipped, first).unwrap());
    assert_eq!(order.shipped_date, Some(first));

    let later = first + chrono::Duration::hours(3);
    assert!(!order.apply_status(OrderStatus::Shipped, later).unwrap());
    assert_eq!(order.shipped_date, Some(first));

    assert!(order.apply_status(OrderStatus::Delivered, later).unwrap());
    assert_eq!(order.delivered_date, Some(later));
    assert!(order.is_completed());
  }

  #[test]
  fn illegal_transition_is_rejected() {
    let mut order = sample_order(OrderStatus::Delivered);
    let err = order.apply_status(OrderStatus::Cancelled, Utc::now()).unwrap_err();
    assert!(err.contains("Đã giao hàng"));
    assert_eq!(order.status, OrderStatus::Delivered);
  }

  #[test]
  fn cancellable_only_before_processing() {
    assert!(sample_order(OrderStatus::Pending).can_be_cancelled());
    assert!(sample_order(OrderStatus::Confirmed).can_be_cancelled());
    assert!(!sample_order(OrderStatus::Processing).can_be_cancelled());
  }

  #[test]
  fn payment_method_parsing() {
    assert_eq!("bank_transfer".parse::<PaymentMethod>().unwrap(), PaymentMethod::BankTransfer);
    assert_eq!(PaymentMethod::Cod.display_text(), "Thanh toán khi nhận hàng (COD)");
    assert!("PAYPAL".parse::<PaymentMethod>().is_err());
    assert_eq!(compute_total(250_000, 25_000, 30_000, 0), 255_000);
  }
}
