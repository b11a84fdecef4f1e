//! Demo data for a fresh database: three accounts, four regional categories and a few products.

use crate::db::{self, products::NewProduct, users::NewUser};
use crate::errors::Result;
use crate::models::Role;
use crate::services::auth_service;
use sqlx::PgPool;
use tracing::{info, instrument};

struct SeedProduct {
  category: usize,
  name: &'static str,
  short_description: &'static str,
  price: i64,
  stock: i32,
  weight_grams: i32,
  origin: &'static str,
  featured: bool,
}

const CATEGORIES: [(&str, &str, &str); 4] = [
  ("Đặc sản miền Bắc", "mien-bac", "Hương vị truyền thống của đất Bắc"),
  ("Đặc sản miền Trung", "mien-trung", "Đậm đà vị miền Trung"),
  ("Đặc sản miền Nam", "mien-nam", "Ngọt ngào sông nước miền Nam"),
  ("Sản phẩm Tết", "tet", "Quà Tết sum vầy"),
];

const PRODUCTS: [SeedProduct; 6] = [
  SeedProduct {
    category: 0,
    name: "Chè Thái Nguyên",
    short_description: "Trà xanh Tân Cương thượng hạng",
    price: 250_000,
    stock: 50,
    weight_grams: 500,
    origin: "Thái Nguyên",
    featured: true,
  },
  SeedProduct {
    category: 0,
    name: "Cốm làng Vòng",
    short_description: "Cốm non dẻo thơm",
    price: 120_000,
    stock: 30,
    weight_grams: 300,
    origin: "Hà Nội",
    featured: false,
  },
  SeedProduct {
    category: 1,
    name: "Nem chua Thanh Hóa",
    short_description: "Nem chua gói lá chuối",
    price: 45_000,
    stock: 100,
    weight_grams: 250,
    origin: "Thanh Hóa",
    featured: true,
  },
  SeedProduct {
    category: 1,
    name: "Mè xửng Huế",
    short_description: "Kẹo mè xửng dẻo",
    price: 60_000,
    stock: 80,
    weight_grams: 400,
    origin: "Huế",
    featured: false,
  },
  SeedProduct {
    category: 2,
    name: "Bánh pía Sóc Trăng",
    short_description: "Bánh pía sầu riêng trứng muối",
    price: 95_000,
    stock: 60,
    weight_grams: 600,
    origin: "Sóc Trăng",
    featured: true,
  },
  SeedProduct {
    category: 3,
    name: "Hộp quà Tết Sum Vầy",
    short_description: "Hộp quà gồm trà, mứt và hạt",
    price: 650_000,
    stock: 20,
    weight_grams: 2_000,
    origin: "Việt Nam",
    featured: true,
  },
];

const ACCOUNTS: [(&str, &str, &str, Role); 3] = [
  ("admin", "admin123", "Quản trị viên", Role::Admin),
  ("staff", "staff123", "Nhân viên cửa hàng", Role::Staff),
  ("user", "user123", "Khách hàng mẫu", Role::User),
];

/// Inserts the demo data. Callers only run this against an empty `users` table.
#[instrument(name = "seed::run", skip(pool), err(Display))]
pub async fn seed_database(pool: &PgPool) -> Result<()> {
  for (username, password, full_name, role) in ACCOUNTS {
    db::users::insert(
      pool,
      &NewUser {
        username: username.to_string(),
        email: format!("{}@dacsanviet.com", username),
        password_hash: auth_service::hash_password(password)?,
        full_name: Some(full_name.to_string()),
        phone_number: None,
        role,
      },
    )
    .await?;
  }

  let mut category_ids = Vec::with_capacity(CATEGORIES.len());
  for (name, slug, description) in CATEGORIES {
    category_ids.push(db::categories::insert(pool, name, slug, Some(description)).await?.id);
  }

  for p in &PRODUCTS {
    db::products::insert(
      pool,
      &NewProduct {
        name: p.name.to_string(),
        short_description: Some(p.short_description.to_string()),
        description: None,
        price: p.price,
        stock_quantity: p.stock,
        image_url: None,
        is_featured: p.featured,
        weight_grams: Some(p.weight_grams),
        origin: Some(p.origin.to_string()),
        story: None,
        category_id: category_ids.get(p.category).copied(),
      },
    )
    .await?;
  }

  info!(
    users = ACCOUNTS.len(),
    categories = CATEGORIES.len(),
    products = PRODUCTS.len(),
    "Demo data seeded."
  );
  Ok(())
}
