//! Stateless helpers and in-process stores shared by pipelines and handlers.

pub mod auth_service;
pub mod cart_sync;
pub mod email_templates;
pub mod mailer;
pub mod notifications;
pub mod qa_hub;
pub mod session_cart;
pub mod sessions;
pub mod shipping;
pub mod validation;
