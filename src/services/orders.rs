use crate::{
    entities::{delivery, order, order_line, order_status, payment_method, product},
    errors::ServiceError,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDetail {
    pub id: i32,
    pub order_number: Option<String>,
    pub fullname: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub payment_method: Option<String>,
    pub delivery: Option<String>,
    pub status: Option<String>,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub delivery_fee: Decimal,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderDetailItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDetailItem {
    pub product_id: i32,
    pub name: Option<String>,
    pub quantity: i32,
    pub size: Option<String>,
    pub variant: Option<String>,
    pub subtotal: Decimal,
}

/// Read side of placed orders.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Fetches an order with its lines. Orders of other accounts are
    /// reported as not found.
    #[instrument(skip(self))]
    pub async fn detail(
        &self,
        account_id: i32,
        order_id: i32,
    ) -> Result<OrderDetail, ServiceError> {
        let db = &*self.db;

        let header = order::Entity::find_by_id(order_id)
            .filter(order::Column::AccountId.eq(account_id))
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("order {} not found", order_id)))?;

        let payment_method = payment_method::Entity::find_by_id(header.payment_method_id)
            .one(db)
            .await?
            .map(|m| m.name);
        let delivery = delivery::Entity::find_by_id(header.delivery_id)
            .one(db)
            .await?
            .map(|d| d.name);
        let status = order_status::Entity::find_by_id(header.status_id)
            .one(db)
            .await?
            .map(|s| s.name);

        let items = order_line::Entity::find()
            .filter(order_line::Column::OrderId.eq(header.id))
            .order_by_asc(order_line::Column::Id)
            .find_also_related(product::Entity)
            .all(db)
            .await?
            .into_iter()
            .map(|(line, product)| OrderDetailItem {
                product_id: line.product_id,
                name: product.map(|p| p.name),
                quantity: line.quantity,
                size: line.size,
                variant: line.variant,
                subtotal: line.subtotal,
            })
            .collect();

        Ok(OrderDetail {
            id: header.id,
            order_number: header.order_number,
            fullname: header.fullname,
            address: header.address,
            phone: header.phone,
            email: header.email,
            payment_method,
            delivery,
            status,
            subtotal: header.subtotal,
            tax: header.tax,
            delivery_fee: header.delivery_fee,
            total: header.total,
            created_at: header.created_at,
            items,
        })
    }
}
