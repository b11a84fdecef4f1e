pub mod address_handlers;
pub mod admin_handlers;
pub mod auth_handlers;
pub mod cart_handlers;
pub mod checkout_handlers;
pub mod consultation_handlers;
pub mod order_handlers;
pub mod product_handlers;
pub mod promotion_handlers;
pub mod qa_handlers;
