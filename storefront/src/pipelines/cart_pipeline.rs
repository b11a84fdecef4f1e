use crate::errors::{AppError, Result as AppResult};
use crate::pipelines::common_steps;
use crate::pipelines::contexts::AddToCartCtxData;
use storeflow::{Control, Ctx, FlowResult, Registry, Workflow};
use tracing::{info, warn};

async fn validate_cart_input(ctx: Ctx<AddToCartCtxData>) -> AppResult<Control> {
  let quantity = ctx.read().quantity;
  if quantity <= 0 {
    warn!(quantity, "Add to cart with non-positive quantity.");
    return Err(AppError::Validation("Số lượng phải lớn hơn 0".to_string()));
  }
  Ok(Control::Continue)
}

async fn fetch_product(ctx: Ctx<AddToCartCtxData>) -> AppResult<Control> {
  let (product_id, pool) = {
    let guard = ctx.read();
    (guard.product_id, guard.app_state.db_pool.clone())
  };
  let product = common_steps::load_active_product(&pool, product_id).await?;
  ctx.write().product = Some(product);
  Ok(Control::Continue)
}

async fn add_or_update_cart_item(ctx: Ctx<AddToCartCtxData>) -> AppResult<Control> {
  let (user_id, quantity, product, pool) = {
    let guard = ctx.read();
    (guard.user_id, guard.quantity, guard.product.clone(), guard.app_state.db_pool.clone())
  };
  let product = product.ok_or_else(|| AppError::Internal("Product not loaded before cart update".to_string()))?;
  let item = common_steps::add_to_user_cart(&pool, user_id, &product, quantity).await?;
  info!(%user_id, product_id = %product.id, quantity = item.quantity, "Cart line updated.");
  ctx.write().cart_item = Some(item);
  Ok(Control::Continue)
}

pub fn build_add_to_cart_workflow() -> FlowResult<Workflow<AddToCartCtxData, AppError>> {
  let mut wf = Workflow::<AddToCartCtxData, AppError>::new(&[
    ("validate_cart_input", false, None),
    ("fetch_product", false, None),
    ("add_or_update_cart_item", false, None),
  ]);
  wf.on("validate_cart_input", validate_cart_input)?;
  wf.on("fetch_product", fetch_product)?;
  wf.on("add_or_update_cart_item", add_or_update_cart_item)?;
  Ok(wf)
}

pub fn register_add_to_cart_pipeline(registry: &Registry<AppError>) -> FlowResult<()> {
  registry.register(build_add_to_cart_workflow()?);
  Ok(())
}
