//! Chooses and sends the transactional email for each business event.

use crate::errors::Result;
use crate::models::{Order, OrderItem, OrderStatus, PaymentStatus};
use crate::services::email_templates::{self, ConsultationDetails};
use crate::services::mailer::{Mailer, OutgoingEmail};
use std::sync::Arc;
use tracing::{debug, instrument};

#[derive(Clone)]
pub struct Notifier {
  mailer: Arc<dyn Mailer>,
  frontend_url: String,
  shop_inbox: String,
}

impl Notifier {
  pub fn new(mailer: Arc<dyn Mailer>, frontend_url: impl Into<String>, shop_inbox: impl Into<String>) -> Self {
    Self {
      mailer,
      frontend_url: frontend_url.into().trim_end_matches('/').to_string(),
      shop_inbox: shop_inbox.into(),
    }
  }

  async fn deliver(&self, email: OutgoingEmail) -> Result<()> {
    self.mailer.send(&email).await
  }

  pub fn reset_link(&self, token: &str) -> String {
    format!("{}/reset-password?token={}", self.frontend_url, token)
  }

  pub fn retry_payment_link(&self, order_number: &str) -> String {
    format!("{}/checkout/retry/{}", self.frontend_url, order_number)
  }

  #[instrument(name = "notify::consultation", skip(self, details), err(Display))]
  pub async fn consultation(&self, details: &ConsultationDetails<'_>) -> Result<()> {
    self.deliver(email_templates::consultation(&self.shop_inbox, details)).await
  }

  #[instrument(name = "notify::welcome", skip(self), err(Display))]
  pub async fn welcome(&self, to: &str, display_name: &str) -> Result<()> {
    self.deliver(email_templates::welcome(to, display_name)).await
  }

  #[instrument(name = "notify::password_reset_link", skip(self, token), err(Display))]
  pub async fn password_reset_link(&self, to: &str, token: &str) -> Result<()> {
    self
      .deliver(email_templates::password_reset_link(to, &self.reset_link(token)))
      .await
  }

  #[instrument(name = "notify::password_reset_confirmation", skip(self), err(Display))]
  pub async fn password_reset_confirmation(&self, to: &str) -> Result<()> {
    self.deliver(email_templates::password_reset_confirmation(to)).await
  }

  #[instrument(name = "notify::new_password", skip(self, password), err(Display))]
  pub async fn new_password(&self, to: &str, display_name: &str, password: &str) -> Result<()> {
    self
      .deliver(email_templates::new_password(to, display_name, password))
      .await
  }

  #[instrument(name = "notify::order_confirmation", skip_all, fields(order_number = %order.order_number), err(Display))]
  pub async fn order_confirmation(&self, order: &Order, items: &[OrderItem]) -> Result<()> {
    self.deliver(email_templates::order_confirmation(order, items)).await
  }

  #[instrument(name = "notify::shipping", skip_all, fields(order_number = %order.order_number), err(Display))]
  pub async fn shipping(&self, order: &Order) -> Result<()> {
    self.deliver(email_templates::shipping_notification(order)).await
  }

  /// Sends the email matching a status change. Nothing is sent when the status is unchanged.
  #[instrument(name = "notify::status_change", skip_all, fields(order_number = %order.order_number, old = ?old, new = ?new), err(Display))]
  pub async fn status_change(&self, order: &Order, old: OrderStatus, new: OrderStatus) -> Result<()> {
    if old == new {
      debug!("Status unchanged; no email.");
      return Ok(());
    }
    let email = match new {
      OrderStatus::Shipped => email_templates::shipping_notification(order),
      OrderStatus::Delivered => email_templates::order_completion(order),
      _ => email_templates::status_update(order, old, new),
    };
    self.deliver(email).await
  }

  /// Sends the payment confirmation or failure email; other changes are silent.
  #[instrument(name = "notify::payment_change", skip_all, fields(order_number = %order.order_number, old = ?old, new = ?new), err(Display))]
  pub async fn payment_change(&self, order: &Order, old: PaymentStatus, new: PaymentStatus) -> Result<()> {
    if old == new {
      return Ok(());
    }
    match new {
      PaymentStatus::Completed => self.deliver(email_templates::payment_confirmation(order)).await,
      PaymentStatus::Failed => {
        let link = self.retry_payment_link(&order.order_number);
        self.deliver(email_templates::payment_failure(order, &link)).await
      }
      PaymentStatus::Pending => Ok(()),
    }
  }
}
