use crate::handlers::common::{map_service_error, success_response, validate_input};
use crate::{
    auth::AuthUser,
    entities::cart,
    errors::ApiError,
    services::cart::{AddCartItem, CartLineView},
    ApiResult, AppState,
};
use axum::{
    extract::{Extension, Json, Path, State},
    routing::{delete, get},
    Router,
};
use serde::Deserialize;
use validator::Validate;

/// Creates the router for cart endpoints
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_cart).post(add_to_cart))
        .route("/:id", delete(remove_cart_line))
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddCartRequest {
    #[validate(range(min = 1))]
    pub product_id: i32,
    #[serde(rename = "size", default)]
    #[validate(range(min = 1, max = 3))]
    pub size_id: Option<i32>,
    #[serde(rename = "variant", default)]
    #[validate(range(min = 1, max = 2))]
    pub variant_id: Option<i32>,
    #[validate(range(min = 1))]
    pub quantity: i32,
}

/// Add an item to the caller's cart
async fn add_to_cart(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<AddCartRequest>, axum::extract::rejection::JsonRejection>,
) -> ApiResult<cart::Model> {
    let Json(payload) = payload.map_err(|_| ApiError::MalformedBody)?;
    validate_input(&payload)?;

    let line = state
        .services
        .cart
        .add_item(
            user.account_id,
            AddCartItem {
                product_id: payload.product_id,
                size_id: payload.size_id,
                variant_id: payload.variant_id,
                quantity: payload.quantity,
            },
        )
        .await
        .map_err(map_service_error)?;

    Ok(success_response("Product added to cart", line))
}

async fn list_cart(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Vec<CartLineView>> {
    let lines = state
        .services
        .cart
        .list(user.account_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response("Cart retrieved", lines))
}

async fn remove_cart_line(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i32>,
) -> ApiResult<()> {
    state
        .services
        .cart
        .remove(user.account_id, id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response("Cart item deleted", ()))
}
