use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "product")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub price_original: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub price_discount: Decimal,
    pub flash_sale: bool,
    /// Never negative; only decremented through a `stock >= qty` guarded update.
    pub stock: i32,
}

impl Model {
    /// Unit price a buyer pays right now.
    pub fn effective_price(&self) -> Decimal {
        effective_price(self.price_original, self.price_discount, self.flash_sale)
    }
}

/// The discounted price applies only while the flash sale is on.
pub fn effective_price(original: Decimal, discount: Decimal, flash_sale: bool) -> Decimal {
    if flash_sale {
        discount
    } else {
        original
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::cart::Entity")]
    Cart,
    #[sea_orm(has_many = "super::order_line::Entity")]
    OrderLine,
}

impl Related<super::cart::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Cart.def()
    }
}

impl Related<super::order_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderLine.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
