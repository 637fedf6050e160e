use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    api::{
        handlers::path_id,
        models::{
            pagination::PaginatedResponse,
            products::{ListProductsQuery, ProductCreate, ProductResponse, ProductUpdate},
        },
    },
    auth::policy::{route, Authorized},
    db::{
        errors::DbError,
        handlers::{products::ProductFilter, Products, Repository},
        models::products::{ProductCreateDBRequest, ProductUpdateDBRequest},
    },
    errors::{Error, Result},
    AppState,
};

fn not_found(id: impl ToString) -> Error {
    Error::NotFound {
        resource: "Product".to_string(),
        id: id.to_string(),
    }
}

#[utoipa::path(
    post,
    path = "/product",
    tag = "product",
    summary = "Create a product",
    request_body = ProductCreate,
    responses(
        (status = 201, description = "Product created", body = ProductResponse),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Admin role required"),
        (status = 409, description = "Product name already exists"),
    ),
    security(("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_product(
    State(state): State<AppState>,
    _: Authorized<route::CreateProduct>,
    Json(request): Json<ProductCreate>,
) -> Result<(StatusCode, Json<ProductResponse>)> {
    request.validate()?;

    let product = Products::new(&state.db)
        .create(&ProductCreateDBRequest {
            name: request.name,
            description: request.description,
            price: request.price,
            stock: request.stock,
            category: request.category,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(product.into())))
}

/// Public: no session is read, so a stale cookie does not block browsing.
#[utoipa::path(
    get,
    path = "/product",
    tag = "product",
    summary = "List products",
    params(ListProductsQuery),
    responses(
        (status = 200, description = "Page of products", body = PaginatedResponse<ProductResponse>),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ListProductsQuery>,
) -> Result<Json<PaginatedResponse<ProductResponse>>> {
    let pagination = &query.pagination;
    let filter = ProductFilter {
        category: query.category.clone().filter(|category| !category.trim().is_empty()),
        ..ProductFilter::new(pagination.skip(), pagination.limit())
    };

    let repo = Products::new(&state.db);
    let products = repo.list(&filter).await?;
    let total = repo.count(&filter).await?;

    let data = products.into_iter().map(ProductResponse::from).collect();
    Ok(Json(PaginatedResponse::new(data, total, pagination)))
}

#[utoipa::path(
    get,
    path = "/product/{id}",
    tag = "product",
    summary = "Get a product",
    params(("id" = String, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product", body = ProductResponse),
        (status = 400, description = "Invalid product ID"),
        (status = 404, description = "Product not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_product(State(state): State<AppState>, Path(params): Path<HashMap<String, String>>) -> Result<Json<ProductResponse>> {
    let product_id = path_id(&params, "Product")?;

    let product = Products::new(&state.db)
        .get_by_id(product_id)
        .await?
        .ok_or_else(|| not_found(product_id))?;
    Ok(Json(product.into()))
}

#[utoipa::path(
    patch,
    path = "/product/{id}",
    tag = "product",
    summary = "Update a product",
    params(("id" = String, Path, description = "Product ID")),
    request_body = ProductUpdate,
    responses(
        (status = 200, description = "Updated product", body = ProductResponse),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Product not found"),
        (status = 409, description = "Product name already exists"),
    ),
    security(("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_product(
    State(state): State<AppState>,
    _: Authorized<route::UpdateProduct>,
    Path(params): Path<HashMap<String, String>>,
    Json(request): Json<ProductUpdate>,
) -> Result<Json<ProductResponse>> {
    let product_id = path_id(&params, "Product")?;
    request.validate()?;

    let update = ProductUpdateDBRequest {
        name: request.name,
        description: request.description,
        price: request.price,
        stock: request.stock,
        category: request.category,
    };

    let product = Products::new(&state.db).update(product_id, &update).await.map_err(|e| match e {
        DbError::NotFound => not_found(product_id),
        other => other.into(),
    })?;

    Ok(Json(product.into()))
}

#[utoipa::path(
    delete,
    path = "/product/{id}",
    tag = "product",
    summary = "Delete a product",
    params(("id" = String, Path, description = "Product ID")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 400, description = "Invalid product ID"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Product not found"),
    ),
    security(("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_product(
    State(state): State<AppState>,
    _: Authorized<route::DeleteProduct>,
    Path(params): Path<HashMap<String, String>>,
) -> Result<StatusCode> {
    let product_id = path_id(&params, "Product")?;

    if Products::new(&state.db).delete(product_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(product_id))
    }
}

#[cfg(test)]
mod tests {
    use crate::api::models::{pagination::PaginatedResponse, products::ProductResponse, users::Role};
    use crate::test_utils::{create_test_app, create_test_user, login_cookie};
    use axum::http::{header, StatusCode};
    use serde_json::{json, Value};
    use uuid::Uuid;

    fn coffee(name: &str) -> Value {
        json!({
            "name": name,
            "description": "High-quality Arabica coffee beans from Colombia",
            "price": 25.99,
            "stock": 100,
            "category": "Beverages",
        })
    }

    async fn admin_cookie(server: &axum_test::TestServer, state: &crate::AppState) -> String {
        create_test_user(state, "admin1", "SecurePass123!", Role::Admin).await;
        login_cookie(server, "admin1", "SecurePass123!").await
    }

    #[test_log::test(tokio::test)]
    async fn test_create_and_fetch_publicly() {
        let (server, state) = create_test_app().await;
        let admin = admin_cookie(&server, &state).await;

        let created = server
            .post("/api/v1/product")
            .add_header(header::COOKIE, admin)
            .json(&coffee("Organic Coffee Beans"))
            .await;
        created.assert_status(StatusCode::CREATED);
        let product: ProductResponse = created.json();
        assert_eq!(product.stock, 100);

        let fetched = server.get(&format!("/api/v1/product/{}", product.id)).await;
        fetched.assert_status_ok();
        assert_eq!(fetched.json::<ProductResponse>().name, "Organic Coffee Beans");
    }

    #[test_log::test(tokio::test)]
    async fn test_public_routes_ignore_stale_cookie() {
        let (server, _) = create_test_app().await;
        server
            .get("/api/v1/product")
            .add_header(header::COOKIE, "access_token=expired.or.forged")
            .await
            .assert_status_ok();
    }

    #[test_log::test(tokio::test)]
    async fn test_mutations_require_admin() {
        let (server, state) = create_test_app().await;
        create_test_user(&state, "customer1", "SecurePass123!", Role::Customer).await;
        let customer = login_cookie(&server, "customer1", "SecurePass123!").await;

        server
            .post("/api/v1/product")
            .json(&coffee("Organic Coffee Beans"))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);

        server
            .post("/api/v1/product")
            .add_header(header::COOKIE, customer.clone())
            .json(&coffee("Organic Coffee Beans"))
            .await
            .assert_status(StatusCode::FORBIDDEN);

        server
            .delete(&format!("/api/v1/product/{}", Uuid::new_v4()))
            .add_header(header::COOKIE, customer)
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }

    #[test_log::test(tokio::test)]
    async fn test_caller_is_checked_before_body() {
        let (server, state) = create_test_app().await;
        create_test_user(&state, "customer1", "SecurePass123!", Role::Customer).await;
        let customer = login_cookie(&server, "customer1", "SecurePass123!").await;

        let no_body = server.post("/api/v1/product").await;
        no_body.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(no_body.text(), "Authentication required");

        server
            .post("/api/v1/product")
            .json(&json!({"x": 1}))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);

        server
            .post("/api/v1/product")
            .add_header(header::COOKIE, customer.clone())
            .json(&json!({}))
            .await
            .assert_status(StatusCode::FORBIDDEN);

        server
            .patch(&format!("/api/v1/product/{}", Uuid::new_v4()))
            .add_header(header::COOKIE, customer)
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }

    #[test_log::test(tokio::test)]
    async fn test_validation_and_conflicts() {
        let (server, state) = create_test_app().await;
        let admin = admin_cookie(&server, &state).await;

        let mut cheap = coffee("Free Beans");
        cheap["price"] = json!(0);
        server
            .post("/api/v1/product")
            .add_header(header::COOKIE, admin.clone())
            .json(&cheap)
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        server
            .post("/api/v1/product")
            .add_header(header::COOKIE, admin.clone())
            .json(&coffee("Organic Coffee Beans"))
            .await
            .assert_status(StatusCode::CREATED);

        let duplicate = server
            .post("/api/v1/product")
            .add_header(header::COOKIE, admin)
            .json(&coffee("Organic Coffee Beans"))
            .await;
        duplicate.assert_status(StatusCode::CONFLICT);
        assert_eq!(duplicate.json::<Value>()["message"], "Product name already exists");
    }

    #[test_log::test(tokio::test)]
    async fn test_list_pagination_and_category() {
        let (server, state) = create_test_app().await;
        let admin = admin_cookie(&server, &state).await;

        for i in 0..3 {
            server
                .post("/api/v1/product")
                .add_header(header::COOKIE, admin.clone())
                .json(&coffee(&format!("Coffee {i}")))
                .await
                .assert_status(StatusCode::CREATED);
        }
        let mut rice = coffee("Basmati Rice");
        rice["category"] = json!("Grains");
        server
            .post("/api/v1/product")
            .add_header(header::COOKIE, admin)
            .json(&rice)
            .await
            .assert_status(StatusCode::CREATED);

        let page: PaginatedResponse<ProductResponse> = server
            .get("/api/v1/product")
            .add_query_param("limit", 3)
            .await
            .json();
        assert_eq!(page.total, 4);
        assert_eq!(page.last_page, 2);
        assert_eq!(page.data.len(), 3);

        let grains: PaginatedResponse<ProductResponse> = server
            .get("/api/v1/product")
            .add_query_param("category", "grains")
            .await
            .json();
        assert_eq!(grains.total, 1);
        assert_eq!(grains.data[0].name, "Basmati Rice");
    }

    #[test_log::test(tokio::test)]
    async fn test_update_and_delete() {
        let (server, state) = create_test_app().await;
        let admin = admin_cookie(&server, &state).await;

        let product: ProductResponse = server
            .post("/api/v1/product")
            .add_header(header::COOKIE, admin.clone())
            .json(&coffee("Organic Coffee Beans"))
            .await
            .json();
        let path = format!("/api/v1/product/{}", product.id);

        let updated = server
            .patch(&path)
            .add_header(header::COOKIE, admin.clone())
            .json(&json!({"price": 19.5, "stock": 3}))
            .await;
        updated.assert_status_ok();
        let updated: ProductResponse = updated.json();
        assert_eq!(updated.price, 19.5);
        assert_eq!(updated.stock, 3);
        assert_eq!(updated.name, product.name);

        server
            .delete(&path)
            .add_header(header::COOKIE, admin.clone())
            .await
            .assert_status(StatusCode::NO_CONTENT);

        let gone = server.get(&path).await;
        gone.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(gone.text(), format!("Product with ID {} not found", product.id));

        server
            .patch(&path)
            .add_header(header::COOKIE, admin)
            .json(&json!({"stock": 1}))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[test_log::test(tokio::test)]
    async fn test_invalid_id_format() {
        let (server, _) = create_test_app().await;
        let response = server.get("/api/v1/product/12345").await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.text(), "Invalid Product ID format");
    }
}
