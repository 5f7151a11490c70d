use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_users_and_accounts::Migration),
            Box::new(m20240101_000002_create_catalog_tables::Migration),
            Box::new(m20240101_000003_create_cart_table::Migration),
            Box::new(m20240101_000004_create_checkout_reference_tables::Migration),
            Box::new(m20240101_000005_create_orders_tables::Migration),
            Box::new(m20240101_000006_unique_cart_lines::Migration),
        ]
    }
}

fn seed_error(err: sea_orm::sea_query::error::Error) -> DbErr {
    DbErr::Custom(format!("invalid seed statement: {}", err))
}

mod m20240101_000001_create_users_and_accounts {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_users_and_accounts"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Users::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Users::Email).string().null())
                        .col(
                            ColumnDef::new(Users::Role)
                                .string()
                                .not_null()
                                .default("user"),
                        )
                        .col(
                            ColumnDef::new(Users::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Account::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Account::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Account::UserId).integer().not_null())
                        .col(ColumnDef::new(Account::Fullname).string_len(30).null())
                        .col(ColumnDef::new(Account::Address).string_len(50).null())
                        .col(ColumnDef::new(Account::Phone).string_len(12).null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_account_user_id")
                                .from(Account::Table, Account::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_account_user_id")
                        .table(Account::Table)
                        .col(Account::UserId)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Account::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum Users {
        Table,
        Id,
        Email,
        Role,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    pub enum Account {
        Table,
        Id,
        UserId,
        Fullname,
        Address,
        Phone,
    }
}

mod m20240101_000002_create_catalog_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    const SIZES: [(i32, &str); 3] = [(1, "regular"), (2, "medium"), (3, "large")];
    const VARIANTS: [(i32, &str); 2] = [(1, "hot"), (2, "ice")];

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_catalog_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Product::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Product::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Product::Name).string().not_null())
                        .col(
                            ColumnDef::new(Product::PriceOriginal)
                                .decimal_len(16, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Product::PriceDiscount)
                                .decimal_len(16, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Product::FlashSale)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Product::Stock)
                                .integer()
                                .not_null()
                                .default(0)
                                .check(Expr::col(Product::Stock).gte(0)),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Sizes::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Sizes::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Sizes::Name).string().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Variants::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Variants::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Variants::Name).string().not_null())
                        .to_owned(),
                )
                .await?;

            let mut sizes = Query::insert();
            sizes
                .into_table(Sizes::Table)
                .columns([Sizes::Id, Sizes::Name]);
            for (id, name) in SIZES {
                sizes
                    .values([id.into(), name.into()])
                    .map_err(super::seed_error)?;
            }
            manager.exec_stmt(sizes).await?;

            let mut variants = Query::insert();
            variants
                .into_table(Variants::Table)
                .columns([Variants::Id, Variants::Name]);
            for (id, name) in VARIANTS {
                variants
                    .values([id.into(), name.into()])
                    .map_err(super::seed_error)?;
            }
            manager.exec_stmt(variants).await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Variants::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Sizes::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Product::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum Product {
        Table,
        Id,
        Name,
        PriceOriginal,
        PriceDiscount,
        FlashSale,
        Stock,
    }

    #[derive(DeriveIden)]
    pub enum Sizes {
        Table,
        Id,
        Name,
    }

    #[derive(DeriveIden)]
    pub enum Variants {
        Table,
        Id,
        Name,
    }
}

mod m20240101_000003_create_cart_table {
    use super::m20240101_000001_create_users_and_accounts::Account;
    use super::m20240101_000002_create_catalog_tables::{Product, Sizes, Variants};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_cart_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Cart::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Cart::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Cart::AccountId).integer().not_null())
                        .col(ColumnDef::new(Cart::ProductId).integer().not_null())
                        .col(ColumnDef::new(Cart::SizeId).integer().null())
                        .col(ColumnDef::new(Cart::VariantId).integer().null())
                        .col(ColumnDef::new(Cart::Quantity).integer().not_null())
                        .col(
                            ColumnDef::new(Cart::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Cart::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_cart_account_id")
                                .from(Cart::Table, Cart::AccountId)
                                .to(Account::Table, Account::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_cart_product_id")
                                .from(Cart::Table, Cart::ProductId)
                                .to(Product::Table, Product::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_cart_size_id")
                                .from(Cart::Table, Cart::SizeId)
                                .to(Sizes::Table, Sizes::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_cart_variant_id")
                                .from(Cart::Table, Cart::VariantId)
                                .to(Variants::Table, Variants::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_cart_account_id")
                        .table(Cart::Table)
                        .col(Cart::AccountId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Cart::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Cart {
        Table,
        Id,
        AccountId,
        ProductId,
        SizeId,
        VariantId,
        Quantity,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000004_create_checkout_reference_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    const STATUSES: [(i32, &str); 4] = [
        (1, "placed"),
        (2, "processing"),
        (3, "shipped"),
        (4, "completed"),
    ];

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_checkout_reference_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Delivery::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Delivery::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Delivery::Name).string().not_null())
                        .col(
                            ColumnDef::new(Delivery::Fee)
                                .decimal_len(16, 4)
                                .not_null()
                                .default(0),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PaymentMethod::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PaymentMethod::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(PaymentMethod::Name).string().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Status::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Status::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Status::Name).string().not_null())
                        .to_owned(),
                )
                .await?;

            let mut statuses = Query::insert();
            statuses
                .into_table(Status::Table)
                .columns([Status::Id, Status::Name]);
            for (id, name) in STATUSES {
                statuses
                    .values([id.into(), name.into()])
                    .map_err(super::seed_error)?;
            }
            manager.exec_stmt(statuses).await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Status::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(PaymentMethod::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Delivery::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum Delivery {
        Table,
        Id,
        Name,
        Fee,
    }

    #[derive(DeriveIden)]
    pub enum PaymentMethod {
        Table,
        Id,
        Name,
    }

    #[derive(DeriveIden)]
    pub enum Status {
        Table,
        Id,
        Name,
    }
}

mod m20240101_000005_create_orders_tables {
    use super::m20240101_000001_create_users_and_accounts::Account;
    use super::m20240101_000002_create_catalog_tables::Product;
    use super::m20240101_000004_create_checkout_reference_tables::{
        Delivery, PaymentMethod, Status,
    };
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000005_create_orders_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Orders::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Orders::OrderNumber).string().null())
                        .col(ColumnDef::new(Orders::AccountId).integer().not_null())
                        .col(ColumnDef::new(Orders::Email).string().not_null())
                        .col(ColumnDef::new(Orders::Fullname).string().not_null())
                        .col(ColumnDef::new(Orders::Address).string().not_null())
                        .col(ColumnDef::new(Orders::Phone).string().not_null())
                        .col(ColumnDef::new(Orders::DeliveryId).integer().not_null())
                        .col(ColumnDef::new(Orders::PaymentMethodId).integer().not_null())
                        .col(ColumnDef::new(Orders::Subtotal).decimal_len(16, 4).not_null())
                        .col(ColumnDef::new(Orders::Tax).decimal_len(16, 4).not_null())
                        .col(ColumnDef::new(Orders::DeliveryFee).decimal_len(16, 4).not_null())
                        .col(ColumnDef::new(Orders::Total).decimal_len(16, 4).not_null())
                        .col(ColumnDef::new(Orders::StatusId).integer().not_null())
                        .col(
                            ColumnDef::new(Orders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_orders_account_id")
                                .from(Orders::Table, Orders::AccountId)
                                .to(Account::Table, Account::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_orders_delivery_id")
                                .from(Orders::Table, Orders::DeliveryId)
                                .to(Delivery::Table, Delivery::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_orders_payment_method_id")
                                .from(Orders::Table, Orders::PaymentMethodId)
                                .to(PaymentMethod::Table, PaymentMethod::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_orders_status_id")
                                .from(Orders::Table, Orders::StatusId)
                                .to(Status::Table, Status::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_account_id")
                        .table(Orders::Table)
                        .col(Orders::AccountId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ProductOrders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProductOrders::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(ProductOrders::OrderId).integer().not_null())
                        .col(ColumnDef::new(ProductOrders::ProductId).integer().not_null())
                        .col(ColumnDef::new(ProductOrders::Quantity).integer().not_null())
                        .col(ColumnDef::new(ProductOrders::Size).string().null())
                        .col(ColumnDef::new(ProductOrders::Variant).string().null())
                        .col(
                            ColumnDef::new(ProductOrders::Subtotal)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_product_orders_order_id")
                                .from(ProductOrders::Table, ProductOrders::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_product_orders_product_id")
                                .from(ProductOrders::Table, ProductOrders::ProductId)
                                .to(Product::Table, Product::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_product_orders_order_id")
                        .table(ProductOrders::Table)
                        .col(ProductOrders::OrderId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ProductOrders::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Orders {
        Table,
        Id,
        OrderNumber,
        AccountId,
        Email,
        Fullname,
        Address,
        Phone,
        DeliveryId,
        PaymentMethodId,
        Subtotal,
        Tax,
        DeliveryFee,
        Total,
        StatusId,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum ProductOrders {
        Table,
        Id,
        OrderId,
        ProductId,
        Quantity,
        Size,
        Variant,
        Subtotal,
    }
}

/// One cart row per (account, product, size, variant). NULL options are
/// folded to 0 so rows without a size or variant collide as well.
mod m20240101_000006_unique_cart_lines {
    use sea_orm_migration::prelude::*;
    use sea_orm_migration::sea_orm::ConnectionTrait;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000006_unique_cart_lines"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .get_connection()
                .execute_unprepared(
                    "CREATE UNIQUE INDEX IF NOT EXISTS idx_cart_line_unique \
                     ON cart (account_id, product_id, COALESCE(size_id, 0), COALESCE(variant_id, 0))",
                )
                .await?;
            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .get_connection()
                .execute_unprepared("DROP INDEX IF EXISTS idx_cart_line_unique")
                .await?;
            Ok(())
        }
    }
}
