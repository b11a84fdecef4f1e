//! Đặc Sản Việt storefront backend: catalog, hybrid cart, checkout, accounts,
//! promotions, product Q&A and the admin back-office, served over actix-web.

pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod pipelines;
pub mod seed;
pub mod services;
pub mod state;
pub mod web;
