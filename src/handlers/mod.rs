pub mod carts;
pub mod checkout;
pub mod common;
pub mod orders;

use crate::{
    config::AppConfig,
    db::DbPool,
    services::{cart::CartService, checkout::CheckoutService, orders::OrderService},
};
use std::sync::Arc;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub cart: Arc<CartService>,
    pub checkout: Arc<CheckoutService>,
    pub orders: Arc<OrderService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, config: &AppConfig) -> Self {
        Self {
            cart: Arc::new(CartService::new(db_pool.clone())),
            checkout: Arc::new(CheckoutService::new(
                db_pool.clone(),
                config.checkout_tax(),
                config.checkout_timeout(),
            )),
            orders: Arc::new(OrderService::new(db_pool)),
        }
    }
}
