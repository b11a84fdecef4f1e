use crate::models::{Order, OrderItem, OrderStatus, PaymentMethod, PaymentStatus};
use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

const ORDER_COLUMNS: &str = "id, order_number, user_id, subtotal, discount_amount, shipping_fee, tax_amount, total_amount, \
  status, payment_method, payment_status, promotion_code, customer_name, customer_email, customer_phone, \
  shipping_address_text, shipping_carrier, shipping_method, tracking_number, notes, order_date, shipped_date, \
  delivered_date, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, order_id, product_id, product_name, quantity, unit_price, total_price";

#[derive(Debug, Clone)]
pub struct NewOrder {
  pub order_number: String,
  pub user_id: Option<Uuid>,
  pub subtotal: i64,
  pub discount_amount: i64,
  pub shipping_fee: i64,
  pub tax_amount: i64,
  pub total_amount: i64,
  pub payment_method: PaymentMethod,
  pub promotion_code: Option<String>,
  pub customer_name: String,
  pub customer_email: String,
  pub customer_phone: String,
  pub shipping_address_text: String,
  pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewOrderItem {
  pub product_id: Uuid,
  pub product_name: String,
  pub quantity: i32,
  pub unit_price: i64,
}

/// Back-office edits outside the status lifecycle; `None` leaves the column as it is.
#[derive(Debug, Clone, Default)]
pub struct OrderDetailsPatch {
  pub payment_status: Option<PaymentStatus>,
  pub shipping_carrier: Option<String>,
  pub tracking_number: Option<String>,
  pub notes: Option<String>,
}

impl OrderDetailsPatch {
  pub fn is_empty(&self) -> bool {
    self.payment_status.is_none() && self.shipping_carrier.is_none() && self.tracking_number.is_none() && self.notes.is_none()
  }
}

/// Back-office listing filter. A status filter replaces the date range.
#[derive(Debug, Clone, Default)]
pub struct AdminOrderFilter {
  pub status: Option<OrderStatus>,
  pub from: Option<DateTime<Utc>>,
  pub to: Option<DateTime<Utc>>,
  pub search_pattern: Option<String>,
}

const ADMIN_FILTER: &str = "($1::order_status IS NULL OR status = $1) \
  AND ($2::timestamptz IS NULL OR order_date >= $2) \
  AND ($3::timestamptz IS NULL OR order_date <= $3) \
  AND ($4::text IS NULL OR order_number ILIKE $4 OR customer_name ILIKE $4 OR customer_email ILIKE $4)";

pub async fn insert<'e, E: PgExecutor<'e>>(executor: E, new: &NewOrder) -> sqlx::Result<Order> {
  let sql = format!(
    "INSERT INTO orders (id, order_number, user_id, subtotal, discount_amount, shipping_fee, tax_amount, total_amount, \
       payment_method, promotion_code, customer_name, customer_email, customer_phone, shipping_address_text, notes) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) RETURNING {ORDER_COLUMNS}"
  );
  sqlx::query_as::<_, Order>(&sql)
    .bind(Uuid::new_v4())
    .bind(&new.order_number)
    .bind(new.user_id)
    .bind(new.subtotal)
    .bind(new.discount_amount)
    .bind(new.shipping_fee)
    .bind(new.tax_amount)
    .bind(new.total_amount)
    .bind(new.payment_method)
    .bind(&new.promotion_code)
    .bind(&new.customer_name)
    .bind(&new.customer_email)
    .bind(&new.customer_phone)
    .bind(&new.shipping_address_text)
    .bind(&new.notes)
    .fetch_one(executor)
    .await
}

pub async fn insert_item<'e, E: PgExecutor<'e>>(executor: E, order_id: Uuid, item: &NewOrderItem) -> sqlx::Result<OrderItem> {
  let sql = format!(
    "INSERT INTO order_items (id, order_id, product_id, product_name, quantity, unit_price, total_price) \
     VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {ITEM_COLUMNS}"
  );
  sqlx::query_as::<_, OrderItem>(&sql)
    .bind(Uuid::new_v4())
    .bind(order_id)
    .bind(item.product_id)
    .bind(&item.product_name)
    .bind(item.quantity)
    .bind(item.unit_price)
    .bind(item.unit_price * i64::from(item.quantity))
    .fetch_one(executor)
    .await
}

pub async fn find_by_id<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> sqlx::Result<Option<Order>> {
  let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
  sqlx::query_as::<_, Order>(&sql).bind(id).fetch_optional(executor).await
}

/// Same as [`find_by_id`] but locks the row until the surrounding transaction ends.
pub async fn find_for_update<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> sqlx::Result<Option<Order>> {
  let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE");
  sqlx::query_as::<_, Order>(&sql).bind(id).fetch_optional(executor).await
}

pub async fn find_by_number(pool: &PgPool, order_number: &str) -> sqlx::Result<Option<Order>> {
  let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_number = $1");
  sqlx::query_as::<_, Order>(&sql)
    .bind(order_number.trim())
    .fetch_optional(pool)
    .await
}

pub async fn items_for<'e, E: PgExecutor<'e>>(executor: E, order_id: Uuid) -> sqlx::Result<Vec<OrderItem>> {
  let sql = format!("SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY product_name");
  sqlx::query_as::<_, OrderItem>(&sql).bind(order_id).fetch_all(executor).await
}

pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> sqlx::Result<Vec<Order>> {
  let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY order_date DESC");
  sqlx::query_as::<_, Order>(&sql).bind(user_id).fetch_all(pool).await
}

pub async fn admin_list(pool: &PgPool, filter: &AdminOrderFilter, limit: i64, offset: i64) -> sqlx::Result<Vec<Order>> {
  let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE {ADMIN_FILTER} ORDER BY order_date DESC LIMIT $5 OFFSET $6");
  sqlx::query_as::<_, Order>(&sql)
    .bind(filter.status)
    .bind(filter.from)
    .bind(filter.to)
    .bind(filter.search_pattern.as_deref())
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

pub async fn admin_count(pool: &PgPool, filter: &AdminOrderFilter) -> sqlx::Result<i64> {
  let sql = format!("SELECT COUNT(*) FROM orders WHERE {ADMIN_FILTER}");
  sqlx::query_scalar::<_, i64>(&sql)
    .bind(filter.status)
    .bind(filter.from)
    .bind(filter.to)
    .bind(filter.search_pattern.as_deref())
    .fetch_one(pool)
    .await
}

/// Writes back every field an admin or customer action may change.
pub async fn save_changes<'e, E: PgExecutor<'e>>(executor: E, order: &Order) -> sqlx::Result<Order> {
  let sql = format!(
    "UPDATE orders SET status = $2, payment_status = $3, shipping_carrier = $4, shipping_method = $5, \
       tracking_number = $6, notes = $7, shipped_date = $8, delivered_date = $9, updated_at = NOW() \
     WHERE id = $1 RETURNING {ORDER_COLUMNS}"
  );
  sqlx::query_as::<_, Order>(&sql)
    .bind(order.id)
    .bind(order.status)
    .bind(order.payment_status)
    .bind(&order.shipping_carrier)
    .bind(&order.shipping_method)
    .bind(&order.tracking_number)
    .bind(&order.notes)
    .bind(order.shipped_date)
    .bind(order.delivered_date)
    .fetch_one(executor)
    .await
}

/// Writes only the columns set in `patch`.
pub async fn apply_details<'e, E: PgExecutor<'e>>(executor: E, id: Uuid, patch: &OrderDetailsPatch) -> sqlx::Result<Order> {
  let sql = format!(
    "UPDATE orders SET payment_status = COALESCE($2, payment_status), \
       shipping_carrier = COALESCE($3, shipping_carrier), tracking_number = COALESCE($4, tracking_number), \
       notes = COALESCE($5, notes), updated_at = NOW() \
     WHERE id = $1 RETURNING {ORDER_COLUMNS}"
  );
  sqlx::query_as::<_, Order>(&sql)
    .bind(id)
    .bind(patch.payment_status)
    .bind(&patch.shipping_carrier)
    .bind(&patch.tracking_number)
    .bind(&patch.notes)
    .fetch_one(executor)
    .await
}
