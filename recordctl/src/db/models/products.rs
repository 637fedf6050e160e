//! Store models for products.

use crate::types::ProductId;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct ProductCreateDBRequest {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub stock: u32,
    pub category: String,
}

#[derive(Debug, Clone, Default)]
pub struct ProductUpdateDBRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub stock: Option<u32>,
    pub category: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProductDBResponse {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub stock: u32,
    pub category: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
