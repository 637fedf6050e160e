//! Store repository for products.

use crate::types::{abbrev_uuid, ProductId};
use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::products::{ProductCreateDBRequest, ProductDBResponse, ProductUpdateDBRequest},
    Database,
};
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use tracing::instrument;
use uuid::Uuid;

/// Filter for listing products
#[derive(Debug, Clone)]
pub struct ProductFilter {
    pub skip: u64,
    pub limit: u64,
    pub category: Option<String>,
}

impl ProductFilter {
    pub fn new(skip: u64, limit: u64) -> Self {
        Self {
            skip,
            limit,
            category: None,
        }
    }
}

#[derive(Clone)]
pub struct Products {
    db: Database,
}

impl Products {
    pub fn new(db: &Database) -> Self {
        Self { db: db.clone() }
    }

    fn matching(&self, filter: &ProductFilter) -> Vec<ProductDBResponse> {
        let mut products: Vec<ProductDBResponse> = self
            .db
            .products
            .iter()
            .filter(|product| {
                filter
                    .category
                    .as_deref()
                    .is_none_or(|category| product.category.eq_ignore_ascii_case(category))
            })
            .map(|product| product.clone())
            .collect();
        products.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        products
    }

    fn name_taken(name: String) -> DbError {
        DbError::UniqueViolation {
            table: "products",
            field: "name",
            conflicting_value: name,
        }
    }
}

#[async_trait::async_trait]
impl Repository for Products {
    type CreateRequest = ProductCreateDBRequest;
    type UpdateRequest = ProductUpdateDBRequest;
    type Response = ProductDBResponse;
    type Id = ProductId;
    type Filter = ProductFilter;

    #[instrument(skip(self, request), fields(name = %request.name), err)]
    async fn create(&self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let product_id = Uuid::new_v4();
        let name = request.name.trim().to_string();

        match self.db.product_names.entry(name.clone()) {
            Entry::Occupied(_) => return Err(Self::name_taken(name)),
            Entry::Vacant(slot) => {
                slot.insert(product_id);
            }
        }

        let now = Utc::now();
        let product = ProductDBResponse {
            id: product_id,
            name,
            description: request.description.clone(),
            price: request.price,
            stock: request.stock,
            category: request.category.trim().to_string(),
            created_at: now,
            updated_at: now,
        };
        self.db.products.insert(product_id, product.clone());
        Ok(product)
    }

    #[instrument(skip(self), fields(product_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&self, id: Self::Id) -> Result<Option<Self::Response>> {
        Ok(self.db.products.get(&id).map(|product| product.clone()))
    }

    #[instrument(skip(self), err)]
    async fn list(&self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        Ok(self
            .matching(filter)
            .into_iter()
            .skip(filter.skip as usize)
            .take(filter.limit as usize)
            .collect())
    }

    async fn count(&self, filter: &Self::Filter) -> Result<u64> {
        Ok(self.matching(filter).len() as u64)
    }

    #[instrument(skip(self), fields(product_id = %abbrev_uuid(&id)), err)]
    async fn delete(&self, id: Self::Id) -> Result<bool> {
        match self.db.products.remove(&id) {
            Some((_, product)) => {
                self.db.product_names.remove(&product.name);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    #[instrument(skip(self, request), fields(product_id = %abbrev_uuid(&id)), err)]
    async fn update(&self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let current_name = self.db.products.get(&id).map(|p| p.name.clone()).ok_or(DbError::NotFound)?;

        if let Some(name) = request.name.as_deref().map(str::trim)
            && name != current_name
        {
            match self.db.product_names.entry(name.to_string()) {
                Entry::Occupied(_) => return Err(Self::name_taken(name.to_string())),
                Entry::Vacant(slot) => {
                    slot.insert(id);
                }
            }
            self.db.product_names.remove(&current_name);
        }

        let mut entry = self.db.products.get_mut(&id).ok_or(DbError::NotFound)?;
        let product = entry.value_mut();
        if let Some(name) = &request.name {
            product.name = name.trim().to_string();
        }
        if let Some(description) = &request.description {
            product.description = description.clone();
        }
        if let Some(price) = request.price {
            product.price = price;
        }
        if let Some(stock) = request.stock {
            product.stock = stock;
        }
        if let Some(category) = &request.category {
            product.category = category.trim().to_string();
        }
        product.updated_at = Utc::now();
        Ok(product.clone())
    }
}
