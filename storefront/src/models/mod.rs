//! Database records and the pure rules attached to them.

pub mod address;
pub mod cart_item;
pub mod category;
pub mod order;
pub mod order_item;
pub mod password_reset;
pub mod product;
pub mod product_qa;
pub mod promotion;
pub mod user;

pub use address::Address;
pub use cart_item::{CartItem, CartLine};
pub use category::Category;
pub use order::{Order, OrderStatus, OrderWithItems, PaymentMethod, PaymentStatus};
pub use order_item::OrderItem;
pub use password_reset::PasswordResetToken;
pub use product::{Product, ProductDetail};
pub use product_qa::{ProductQa, QaLikeUpdate, QaMessage};
pub use promotion::{DiscountType, Promotion, PromotionSummary};
pub use user::{Role, User};
