//! API request/response models for products.

use super::pagination::Pagination;
use crate::db::models::products::ProductDBResponse;
use crate::errors::Error;
use crate::types::ProductId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Query parameters for listing products
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ListProductsQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Only products in this category (case-insensitive)
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductCreate {
    /// At least 3 characters, unique
    #[schema(example = "Organic Coffee Beans")]
    pub name: String,
    #[schema(example = "High-quality Arabica coffee beans from Colombia")]
    pub description: String,
    /// Price in USD, strictly positive
    #[schema(example = 25.99)]
    pub price: f64,
    #[schema(example = 100)]
    pub stock: u32,
    #[schema(example = "Beverages")]
    pub category: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub stock: Option<u32>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub stock: u32,
    pub category: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProductDBResponse> for ProductResponse {
    fn from(db: ProductDBResponse) -> Self {
        Self {
            id: db.id,
            name: db.name,
            description: db.description,
            price: db.price,
            stock: db.stock,
            category: db.category,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

fn validate_name(name: &str) -> Result<(), Error> {
    if name.trim().chars().count() < 3 {
        return Err(Error::BadRequest {
            message: "Product name must be at least 3 characters".to_string(),
        });
    }
    Ok(())
}

fn validate_price(price: f64) -> Result<(), Error> {
    if !(price.is_finite() && price > 0.0) {
        return Err(Error::BadRequest {
            message: "Price must be a positive number".to_string(),
        });
    }
    Ok(())
}

fn validate_category(category: &str) -> Result<(), Error> {
    if category.trim().is_empty() {
        return Err(Error::BadRequest {
            message: "Category must not be empty".to_string(),
        });
    }
    Ok(())
}

impl ProductCreate {
    /// Stock is unsigned, so negative values are already rejected during deserialization.
    pub fn validate(&self) -> Result<(), Error> {
        validate_name(&self.name)?;
        validate_price(self.price)?;
        validate_category(&self.category)
    }
}

impl ProductUpdate {
    pub fn validate(&self) -> Result<(), Error> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        if let Some(category) = &self.category {
            validate_category(category)?;
        }
        Ok(())
    }
}
