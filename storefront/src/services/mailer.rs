//! Outbound mail transports.

use crate::config::SmtpSettings;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use parking_lot::Mutex;
use tracing::{info, instrument, warn};

pub const SENDER_NAME: &str = "Đặc Sản Việt";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
  pub to: String,
  pub subject: String,
  pub html_body: String,
}

impl OutgoingEmail {
  pub fn new(to: impl Into<String>, subject: impl Into<String>, html_body: impl Into<String>) -> Self {
    Self {
      to: to.into(),
      subject: subject.into(),
      html_body: html_body.into(),
    }
  }
}

#[async_trait]
pub trait Mailer: Send + Sync {
  async fn send(&self, email: &OutgoingEmail) -> Result<()>;
}

/// Delivers HTML mail through an SMTP relay using STARTTLS.
pub struct SmtpMailer {
  transport: AsyncSmtpTransport<Tokio1Executor>,
  from: Mailbox,
}

impl SmtpMailer {
  pub fn new(settings: &SmtpSettings, from_address: &str) -> Result<Self> {
    let address = from_address
      .parse::<lettre::Address>()
      .map_err(|e| AppError::Config(format!("Invalid MAIL_FROM '{}': {}", from_address, e)))?;

    let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
      .map_err(|e| AppError::Config(format!("Invalid SMTP relay '{}': {}", settings.host, e)))?
      .port(settings.port);
    if let (Some(user), Some(pass)) = (&settings.username, &settings.password) {
      builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
    }

    Ok(Self {
      transport: builder.build(),
      from: Mailbox::new(Some(SENDER_NAME.to_string()), address),
    })
  }
}

#[async_trait]
impl Mailer for SmtpMailer {
  #[instrument(name = "mailer::smtp_send", skip(self, email), fields(to = %email.to, subject = %email.subject), err(Display))]
  async fn send(&self, email: &OutgoingEmail) -> Result<()> {
    let to = email
      .to
      .parse::<Mailbox>()
      .map_err(|e| AppError::Mail(format!("Invalid recipient '{}': {}", email.to, e)))?;
    let message = Message::builder()
      .from(self.from.clone())
      .to(to)
      .subject(email.subject.clone())
      .header(ContentType::TEXT_HTML)
      .body(email.html_body.clone())
      .map_err(|e| AppError::Mail(format!("Could not build message: {}", e)))?;

    self
      .transport
      .send(message)
      .await
      .map_err(|e| AppError::Mail(e.to_string()))?;
    info!("Email delivered to relay.");
    Ok(())
  }
}

/// Keeps every message in memory and logs it. Used without an SMTP relay and in tests.
#[derive(Debug, Default)]
pub struct OutboxMailer {
  sent: Mutex<Vec<OutgoingEmail>>,
  fail: bool,
}

impl OutboxMailer {
  pub fn new() -> Self {
    Self::default()
  }

  /// An outbox that rejects every message.
  pub fn failing() -> Self {
    Self {
      sent: Mutex::new(Vec::new()),
      fail: true,
    }
  }

  pub fn sent(&self) -> Vec<OutgoingEmail> {
    self.sent.lock().clone()
  }

  pub fn last_to(&self, to: &str) -> Option<OutgoingEmail> {
    self.sent.lock().iter().rev().find(|m| m.to == to).cloned()
  }
}

#[async_trait]
impl Mailer for OutboxMailer {
  async fn send(&self, email: &OutgoingEmail) -> Result<()> {
    if self.fail {
      warn!(to = %email.to, subject = %email.subject, "Outbox rejected message.");
      return Err(AppError::Mail("outbox is configured to fail".to_string()));
    }
    info!(to = %email.to, subject = %email.subject, body_len = email.html_body.len(), "Email queued in outbox.");
    self.sent.lock().push(email.clone());
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn outbox_records_messages() {
    let outbox = OutboxMailer::new();
    outbox
      .send(&OutgoingEmail::new("a@example.com", "Xin chào", "<p>hi</p>"))
      .await
      .unwrap();
    assert_eq!(outbox.sent().len(), 1);
    assert_eq!(outbox.last_to("a@example.com").unwrap().subject, "Xin chào");
  }

  #[tokio::test]
  async fn failing_outbox_returns_mail_error() {
    let outbox = OutboxMailer::failing();
    let err = outbox.send(&OutgoingEmail::new("a@example.com", "s", "b")).await.unwrap_err();
    assert!(matches!(err, AppError::Mail(_)));
    assert!(outbox.sent().is_empty());
  }

  #[test]
  fn smtp_mailer_rejects_bad_sender() {
    let settings = SmtpSettings {
      host: "smtp.example.com".into(),
      port: 587,
      username: None,
      password: None,
    };
    assert!(matches!(SmtpMailer::new(&settings, "not an address"), Err(AppError::Config(_))));
  }
}
