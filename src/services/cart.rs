use crate::{
    entities::{cart, product, size, variant},
    errors::ServiceError,
    services::checkout::label_map,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, SqlErr, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Item to put in the cart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddCartItem {
    pub product_id: i32,
    pub size_id: Option<i32>,
    pub variant_id: Option<i32>,
    pub quantity: i32,
}

/// A cart line joined with what the shopper needs to see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLineView {
    pub id: i32,
    pub product_id: i32,
    pub name: String,
    pub quantity: i32,
    pub size: Option<String>,
    pub variant: Option<String>,
    pub price: Decimal,
    pub discount: Decimal,
    pub flash_sale: bool,
    /// Effective unit price times quantity
    pub subtotal: Decimal,
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Shopping cart service. Lines are keyed by (account, product, size, variant);
/// adding an existing combination increases its quantity.
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Adds an item to the cart or increases the quantity of a matching line.
    ///
    /// # Returns
    ///
    /// * `Ok(cart::Model)` - The stored line after the merge
    /// * `Err(ServiceError::NotFound)` - Unknown product
    /// * `Err(ServiceError::OutOfStock)` - Product has no stock left
    /// * `Err(ServiceError::BadRequest)` - Requested or merged quantity exceeds stock
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        account_id: i32,
        item: AddCartItem,
    ) -> Result<cart::Model, ServiceError> {
        match self.store_line(account_id, item).await {
            // a concurrent add inserted the same line first; merge into it
            Err(ServiceError::DatabaseError(err)) if is_unique_violation(&err) => {
                debug!(account_id, product_id = item.product_id, "cart line raced, merging");
                self.store_line(account_id, item).await
            }
            other => other,
        }
    }

    async fn store_line(
        &self,
        account_id: i32,
        item: AddCartItem,
    ) -> Result<cart::Model, ServiceError> {
        let txn = self.db.begin().await?;

        let product = product::Entity::find_by_id(item.product_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("product not found".to_string()))?;

        if product.stock <= 0 {
            return Err(ServiceError::OutOfStock);
        }
        let insufficient =
            || ServiceError::BadRequest(format!("insufficient stock {}", product.stock));
        if item.quantity > product.stock {
            return Err(insufficient());
        }

        let mut existing = cart::Entity::find()
            .filter(cart::Column::AccountId.eq(account_id))
            .filter(cart::Column::ProductId.eq(item.product_id));
        existing = match item.size_id {
            Some(id) => existing.filter(cart::Column::SizeId.eq(id)),
            None => existing.filter(cart::Column::SizeId.is_null()),
        };
        existing = match item.variant_id {
            Some(id) => existing.filter(cart::Column::VariantId.eq(id)),
            None => existing.filter(cart::Column::VariantId.is_null()),
        };

        let now = Utc::now();
        let line = match existing.one(&txn).await? {
            Some(line) => {
                let quantity = line
                    .quantity
                    .checked_add(item.quantity)
                    .filter(|q| *q <= product.stock)
                    .ok_or_else(insufficient)?;
                let mut line: cart::ActiveModel = line.into();
                line.quantity = Set(quantity);
                line.updated_at = Set(now);
                line.update(&txn).await?
            }
            None => {
                cart::ActiveModel {
                    account_id: Set(account_id),
                    product_id: Set(item.product_id),
                    size_id: Set(item.size_id),
                    variant_id: Set(item.variant_id),
                    quantity: Set(item.quantity),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                }
                .insert(&txn)
                .await?
            }
        };

        txn.commit().await?;

        info!(
            account_id,
            cart_id = line.id,
            product_id = item.product_id,
            quantity = line.quantity,
            "cart line stored"
        );
        Ok(line)
    }

    /// Lists the account's cart, oldest line first.
    #[instrument(skip(self))]
    pub async fn list(&self, account_id: i32) -> Result<Vec<CartLineView>, ServiceError> {
        let db = &*self.db;
        let rows = cart::Entity::find()
            .filter(cart::Column::AccountId.eq(account_id))
            .order_by_asc(cart::Column::Id)
            .find_also_related(product::Entity)
            .all(db)
            .await?;

        let sizes = label_map(size::Entity::find().all(db).await?, |s| (s.id, s.name));
        let variants = label_map(variant::Entity::find().all(db).await?, |v| (v.id, v.name));

        Ok(rows
            .into_iter()
            .filter_map(|(line, product)| {
                let product = product?;
                Some(CartLineView {
                    id: line.id,
                    product_id: product.id,
                    quantity: line.quantity,
                    size: line.size_id.and_then(|id| sizes.get(&id).cloned()),
                    variant: line.variant_id.and_then(|id| variants.get(&id).cloned()),
                    price: product.price_original,
                    discount: product.price_discount,
                    flash_sale: product.flash_sale,
                    subtotal: product.effective_price() * Decimal::from(line.quantity),
                    name: product.name,
                })
            })
            .collect())
    }

    /// Removes one of the account's cart lines.
    #[instrument(skip(self))]
    pub async fn remove(&self, account_id: i32, cart_id: i32) -> Result<(), ServiceError> {
        let result = cart::Entity::delete_many()
            .filter(cart::Column::AccountId.eq(account_id))
            .filter(cart::Column::Id.eq(cart_id))
            .exec(&*self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "cart with id {} not found",
                cart_id
            )));
        }

        info!(account_id, cart_id, "cart line removed");
        Ok(())
    }
}
