use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::db::{self, products::ProductFilter, PageRequest};
use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extractors::AdminUser;

const DEFAULT_PAGE_SIZE: i64 = 12;

#[derive(Deserialize, Debug, Default)]
pub struct ListProductsQuery {
  pub page: Option<i64>,
  pub size: Option<i64>,
  /// Category slug.
  pub category: Option<String>,
  pub q: Option<String>,
  #[serde(default)]
  pub featured: bool,
}

#[instrument(name = "handler::list_products", skip(app_state, query_params))]
pub async fn list_products_handler(
  app_state: web::Data<AppState>,
  query_params: web::Query<ListProductsQuery>,
) -> Result<HttpResponse, AppError> {
  let query = query_params.into_inner();
  let page = PageRequest::new(query.page, query.size, DEFAULT_PAGE_SIZE);
  let filter = ProductFilter {
    category_slug: query.category.filter(|c| !c.trim().is_empty()),
    name_pattern: db::like_pattern(query.q.as_deref()),
    featured_only: query.featured,
  };

  let products = db::products::list_active(&app_state.db_pool, &filter, page.size, page.offset()).await?;
  let total = db::products::count_active(&app_state.db_pool, &filter).await?;
  info!(count = products.len(), total, "Products fetched.");

  Ok(HttpResponse::Ok().json(json!({
    "content": products,
    "page": page.page,
    "size": page.size,
    "totalElements": total,
    "totalPages": page.total_pages(total),
  })))
}

#[instrument(name = "handler::get_product", skip(app_state, path), fields(product_id = %path.as_ref()))]
pub async fn get_product_handler(app_state: web::Data<AppState>, path: web::Path<Uuid>) -> Result<HttpResponse, AppError> {
  let product_id = path.into_inner();
  match db::products::find_active_detail(&app_state.db_pool, product_id).await? {
    Some(detail) => Ok(HttpResponse::Ok().json(detail)),
    None => {
      warn!("Product not found or inactive.");
      Err(AppError::NotFound(format!("Không tìm thấy sản phẩm {}", product_id)))
    }
  }
}

#[instrument(name = "handler::list_categories", skip(app_state))]
pub async fn list_categories_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let categories = db::categories::list_active(&app_state.db_pool).await?;
  Ok(HttpResponse::Ok().json(categories))
}

#[instrument(name = "handler::delete_product", skip(app_state, admin, path), fields(product_id = %path.as_ref(), admin = %admin.0.username))]
pub async fn delete_product_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let product_id = path.into_inner();
  if !db::products::delete(&app_state.db_pool, product_id).await? {
    return Err(AppError::NotFound(format!("Không tìm thấy sản phẩm {}", product_id)));
  }
  info!("Product deleted.");
  Ok(HttpResponse::Ok().json(json!({ "message": "Product deleted successfully" })))
}
