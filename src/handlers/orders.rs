use crate::handlers::common::{map_service_error, success_response};
use crate::{auth::AuthUser, services::orders::OrderDetail, ApiResult, AppState};
use axum::{
    extract::{Extension, Path, State},
    routing::get,
    Router,
};

pub fn order_routes() -> Router<AppState> {
    Router::new().route("/:id", get(get_order))
}

/// Order detail for the calling account
async fn get_order(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i32>,
) -> ApiResult<OrderDetail> {
    let detail = state
        .services
        .orders
        .detail(user.account_id, id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response("Order retrieved", detail))
}
