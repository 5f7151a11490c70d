//! Checkout engine: turns an account's cart into a persisted order.
//!
//! Everything happens inside one database transaction: contact resolution,
//! cart read, pricing, order header and lines, guarded stock decrements and
//! clearing the cart. Any error drops the transaction, which rolls it back.

use crate::{
    entities::{
        cart, delivery, order, order_line, order_status, payment_method, product, size, variant,
    },
    errors::ServiceError,
    services::user_data::{self, ContactDetails, ContactInput},
};
use chrono::Utc;
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc, time::Duration};
use tracing::{info, instrument, warn};

/// Caller input for one checkout
#[derive(Debug, Clone, Default)]
pub struct CheckoutInput {
    pub contact: ContactInput,
    pub payment_method_id: i32,
    pub delivery_id: i32,
}

/// A cart line priced at checkout time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedLine {
    pub product_id: i32,
    pub quantity: i32,
    pub size: Option<String>,
    pub variant: Option<String>,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

impl PricedLine {
    pub fn new(
        product: &product::Model,
        quantity: i32,
        size: Option<String>,
        variant: Option<String>,
    ) -> Self {
        let unit_price = product.effective_price();
        Self {
            product_id: product.id,
            quantity,
            size,
            variant,
            unit_price,
            subtotal: unit_price * Decimal::from(quantity),
        }
    }
}

/// Money totals of one order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub delivery_fee: Decimal,
    pub total: Decimal,
}

impl OrderTotals {
    pub fn compute(lines: &[PricedLine], tax: Decimal, delivery_fee: Decimal) -> Self {
        let subtotal: Decimal = lines.iter().map(|line| line.subtotal).sum();
        Self {
            subtotal,
            tax,
            delivery_fee,
            total: subtotal + tax + delivery_fee,
        }
    }
}

/// The placed order as returned to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub id: i32,
    pub order_number: String,
    pub fullname: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    #[serde(rename = "id_paymentMethod")]
    pub payment_method_id: i32,
    #[serde(rename = "id_delivery")]
    pub delivery_id: i32,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub delivery_fee: Decimal,
    pub total: Decimal,
    pub products: Vec<PricedLine>,
}

#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DatabaseConnection>,
    tax: Decimal,
    timeout: Duration,
}

impl CheckoutService {
    /// Creates a new checkout service.
    ///
    /// # Arguments
    ///
    /// * `db` - Database connection pool
    /// * `tax` - Flat tax added to every order
    /// * `timeout` - Budget for one checkout; exceeding it rolls the order back
    pub fn new(db: Arc<DatabaseConnection>, tax: Decimal, timeout: Duration) -> Self {
        Self { db, tax, timeout }
    }

    /// Places an order from the account's cart.
    ///
    /// # Returns
    ///
    /// * `Ok(OrderReceipt)` - The committed order with its lines
    /// * `Err(ServiceError::ValidationError)` - A contact field is missing everywhere,
    ///   or the delivery / payment method does not exist
    /// * `Err(ServiceError::EmptyCart)` - Nothing to order
    /// * `Err(ServiceError::InsufficientStock)` - A concurrent checkout took the stock
    /// * `Err(ServiceError::Timeout)` - The budget ran out; nothing was written
    #[instrument(
        skip(self, input),
        fields(delivery_id = input.delivery_id, payment_method_id = input.payment_method_id)
    )]
    pub async fn checkout(
        &self,
        account_id: i32,
        input: CheckoutInput,
    ) -> Result<OrderReceipt, ServiceError> {
        let placing = self.place_order(account_id, input);
        let outcome = match tokio::time::timeout(self.timeout, placing).await {
            Ok(result) => result,
            Err(_) => Err(ServiceError::Timeout(format!(
                "checkout for account {} exceeded {:?}",
                account_id, self.timeout
            ))),
        };

        match &outcome {
            Ok(receipt) => {
                counter!("roastery.checkout.completed", 1);
                info!(
                    account_id,
                    order_id = receipt.id,
                    order_number = %receipt.order_number,
                    total = %receipt.total,
                    "order placed"
                );
            }
            Err(ServiceError::InsufficientStock { product_id }) => {
                counter!("roastery.checkout.stock_exhausted", 1);
                warn!(account_id, product_id, "checkout lost the race for stock");
            }
            Err(err) if err.is_client_error() => {
                counter!("roastery.checkout.failed", 1);
                info!(account_id, error = %err, "checkout rejected");
            }
            Err(err) => {
                counter!("roastery.checkout.failed", 1);
                warn!(account_id, error = %err, "checkout failed");
            }
        }

        outcome
    }

    async fn place_order(
        &self,
        account_id: i32,
        input: CheckoutInput,
    ) -> Result<OrderReceipt, ServiceError> {
        let txn = self.db.begin().await?;

        let contact = user_data::resolve_contact(&txn, account_id, input.contact).await?;

        let PricedCart { line_ids, lines } = load_priced_cart(&txn, account_id).await?;
        if lines.is_empty() {
            return Err(ServiceError::EmptyCart);
        }

        let delivery = delivery::Entity::find_by_id(input.delivery_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::ValidationError(format!("delivery {} not found", input.delivery_id))
            })?;

        if payment_method::Entity::find_by_id(input.payment_method_id)
            .one(&txn)
            .await?
            .is_none()
        {
            return Err(ServiceError::ValidationError(format!(
                "payment method {} not found",
                input.payment_method_id
            )));
        }

        let totals = OrderTotals::compute(&lines, self.tax, delivery.fee);

        let header = insert_order_header(
            &txn,
            account_id,
            &contact,
            input.delivery_id,
            input.payment_method_id,
            &totals,
        )
        .await?;

        for line in &lines {
            order_line::ActiveModel {
                order_id: Set(header.id),
                product_id: Set(line.product_id),
                quantity: Set(line.quantity),
                size: Set(line.size.clone()),
                variant: Set(line.variant.clone()),
                subtotal: Set(line.subtotal),
                ..Default::default()
            }
            .insert(&txn)
            .await?;

            decrement_stock(&txn, line.product_id, line.quantity).await?;
        }

        clear_cart_lines(&txn, account_id, &line_ids).await?;

        txn.commit().await?;

        Ok(OrderReceipt {
            id: header.id,
            order_number: header.order_number.unwrap_or_default(),
            fullname: contact.fullname,
            address: contact.address,
            phone: contact.phone,
            email: contact.email,
            payment_method_id: input.payment_method_id,
            delivery_id: input.delivery_id,
            subtotal: totals.subtotal,
            tax: totals.tax,
            delivery_fee: totals.delivery_fee,
            total: totals.total,
            products: lines,
        })
    }
}

/// The cart as read at checkout time.
struct PricedCart {
    /// Every cart row read, including rows whose product is gone
    line_ids: Vec<i32>,
    lines: Vec<PricedLine>,
}

/// Cart lines joined with their product; lines whose product is gone are skipped.
async fn load_priced_cart<C>(conn: &C, account_id: i32) -> Result<PricedCart, ServiceError>
where
    C: ConnectionTrait,
{
    let rows = cart::Entity::find()
        .filter(cart::Column::AccountId.eq(account_id))
        .order_by_asc(cart::Column::Id)
        .find_also_related(product::Entity)
        .all(conn)
        .await?;

    if rows.is_empty() {
        return Ok(PricedCart {
            line_ids: Vec::new(),
            lines: Vec::new(),
        });
    }

    let sizes = label_map(size::Entity::find().all(conn).await?, |s| (s.id, s.name));
    let variants = label_map(variant::Entity::find().all(conn).await?, |v| (v.id, v.name));

    let line_ids = rows.iter().map(|(line, _)| line.id).collect();
    let lines = rows
        .into_iter()
        .filter_map(|(line, product)| {
            let product = product?;
            let size = line.size_id.and_then(|id| sizes.get(&id).cloned());
            let variant = line.variant_id.and_then(|id| variants.get(&id).cloned());
            Some(PricedLine::new(&product, line.quantity, size, variant))
        })
        .collect();

    Ok(PricedCart { line_ids, lines })
}

/// Deletes only the rows that were read; lines added meanwhile stay in the cart.
async fn clear_cart_lines<C>(
    conn: &C,
    account_id: i32,
    line_ids: &[i32],
) -> Result<(), ServiceError>
where
    C: ConnectionTrait,
{
    cart::Entity::delete_many()
        .filter(cart::Column::AccountId.eq(account_id))
        .filter(cart::Column::Id.is_in(line_ids.iter().copied()))
        .exec(conn)
        .await?;
    Ok(())
}

pub(crate) fn label_map<M>(models: Vec<M>, f: impl Fn(M) -> (i32, String)) -> HashMap<i32, String> {
    models.into_iter().map(f).collect()
}

async fn insert_order_header<C>(
    conn: &C,
    account_id: i32,
    contact: &ContactDetails,
    delivery_id: i32,
    payment_method_id: i32,
    totals: &OrderTotals,
) -> Result<order::Model, ServiceError>
where
    C: ConnectionTrait,
{
    let header = order::ActiveModel {
        order_number: Set(None),
        account_id: Set(account_id),
        email: Set(contact.email.clone()),
        fullname: Set(contact.fullname.clone()),
        address: Set(contact.address.clone()),
        phone: Set(contact.phone.clone()),
        delivery_id: Set(delivery_id),
        payment_method_id: Set(payment_method_id),
        subtotal: Set(totals.subtotal),
        tax: Set(totals.tax),
        delivery_fee: Set(totals.delivery_fee),
        total: Set(totals.total),
        status_id: Set(order_status::PLACED),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(conn)
    .await?;

    // the number is derived from the generated id
    let order_number = order::format_order_number(header.id);
    let mut header: order::ActiveModel = header.into();
    header.order_number = Set(Some(order_number));
    Ok(header.update(conn).await?)
}

/// `UPDATE product SET stock = stock - qty WHERE id = ? AND stock >= qty`
async fn decrement_stock<C>(conn: &C, product_id: i32, quantity: i32) -> Result<(), ServiceError>
where
    C: ConnectionTrait,
{
    let result = product::Entity::update_many()
        .col_expr(
            product::Column::Stock,
            Expr::col(product::Column::Stock).sub(quantity),
        )
        .filter(product::Column::Id.eq(product_id))
        .filter(product::Column::Stock.gte(quantity))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Err(ServiceError::InsufficientStock { product_id });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn product(id: i32, original: Decimal, discount: Decimal, flash_sale: bool) -> product::Model {
        product::Model {
            id,
            name: format!("product {}", id),
            price_original: original,
            price_discount: discount,
            flash_sale,
            stock: 10,
        }
    }

    #[test]
    fn flash_sale_lines_use_discount_price() {
        let line = PricedLine::new(&product(2, dec!(8000), dec!(6000), true), 1, None, None);
        assert_eq!(line.unit_price, dec!(6000));
        assert_eq!(line.subtotal, dec!(6000));
    }

    #[test]
    fn totals_add_flat_tax_and_delivery_fee() {
        let lines = vec![
            PricedLine::new(
                &product(1, dec!(10000), dec!(9000), false),
                2,
                Some("regular".into()),
                Some("hot".into()),
            ),
            PricedLine::new(&product(2, dec!(8000), dec!(6000), true), 1, None, None),
        ];

        let totals = OrderTotals::compute(&lines, dec!(2000), dec!(5000));

        assert_eq!(totals.subtotal, dec!(26000));
        assert_eq!(totals.total, dec!(33000));
        assert_eq!(
            lines.iter().map(|l| l.subtotal).sum::<Decimal>(),
            totals.subtotal
        );
    }

    #[tokio::test]
    async fn clearing_keeps_lines_added_after_the_read() {
        use crate::entities::{account, user};

        let db = crate::db::establish_connection_with_config(&crate::db::DbConfig {
            url: "sqlite::memory:".into(),
            max_connections: 1,
            ..Default::default()
        })
        .await
        .unwrap();
        crate::db::run_migrations(&db).await.unwrap();

        let owner = user::ActiveModel {
            email: Set(Some("jane@example.com".into())),
            role: Set("user".into()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();
        let account = account::ActiveModel {
            user_id: Set(owner.id),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();
        let stored = product::ActiveModel {
            name: Set("Latte".into()),
            price_original: Set(dec!(10000)),
            price_discount: Set(dec!(9000)),
            flash_sale: Set(false),
            stock: Set(10),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();

        let cart_line = |variant_id: i32| cart::ActiveModel {
            account_id: Set(account.id),
            product_id: Set(stored.id),
            size_id: Set(None),
            variant_id: Set(Some(variant_id)),
            quantity: Set(1),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };

        cart_line(1).insert(&db).await.unwrap();
        let snapshot = load_priced_cart(&db, account.id).await.unwrap();
        assert_eq!(snapshot.lines.len(), 1);

        let late = cart_line(2).insert(&db).await.unwrap();
        clear_cart_lines(&db, account.id, &snapshot.line_ids)
            .await
            .unwrap();

        let remaining = cart::Entity::find()
            .filter(cart::Column::AccountId.eq(account.id))
            .all(&db)
            .await
            .unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, late.id);
    }

    #[test]
    fn receipt_uses_wire_names_for_ids() {
        let receipt = OrderReceipt {
            id: 1,
            order_number: "#ORD-001".into(),
            fullname: "Jane Doe".into(),
            address: "12 Bean Street".into(),
            phone: "081234567890".into(),
            email: "jane@example.com".into(),
            payment_method_id: 3,
            delivery_id: 4,
            subtotal: dec!(1),
            tax: dec!(2),
            delivery_fee: dec!(3),
            total: dec!(6),
            products: vec![],
        };
        let json = serde_json::to_value(&receipt).unwrap();
        assert_eq!(json["id_paymentMethod"], 3);
        assert_eq!(json["id_delivery"], 4);
    }
}
