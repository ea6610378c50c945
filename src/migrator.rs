use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260101_000001_create_products_table::Migration),
            Box::new(m20260101_000002_create_orders_table::Migration),
            Box::new(m20260101_000003_create_order_items_table::Migration),
            Box::new(m20260101_000004_create_status_history_table::Migration),
            Box::new(m20260101_000005_seed_products::Migration),
        ]
    }
}

mod m20260101_000001_create_products_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000001_create_products_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Products::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Products::Name).string_len(200).not_null())
                        .col(
                            ColumnDef::new(Products::Sku)
                                .string_len(50)
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(Products::QuantityOnHand)
                                .integer()
                                .not_null()
                                .default(0)
                                .check(Expr::col(Products::QuantityOnHand).gte(0)),
                        )
                        .col(
                            ColumnDef::new(Products::ReorderThreshold)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Products::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Products::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Products {
        Table,
        Id,
        Name,
        Sku,
        QuantityOnHand,
        ReorderThreshold,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20260101_000002_create_orders_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000002_create_orders_table"
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
                        .col(
                            ColumnDef::new(Orders::CustomerName)
                                .string_len(200)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Orders::Status).string_len(20).not_null())
                        .col(
                            ColumnDef::new(Orders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_status")
                        .table(Orders::Table)
                        .col(Orders::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_created_at")
                        .table(Orders::Table)
                        .col(Orders::CreatedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Orders {
        Table,
        Id,
        CustomerName,
        Status,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20260101_000003_create_order_items_table {
    use super::m20260101_000001_create_products_table::Products;
    use super::m20260101_000002_create_orders_table::Orders;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000003_create_order_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(OrderItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderItems::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(OrderItems::OrderId).integer().not_null())
                        .col(ColumnDef::new(OrderItems::ProductId).integer().not_null())
                        .col(
                            ColumnDef::new(OrderItems::Quantity)
                                .integer()
                                .not_null()
                                .check(Expr::col(OrderItems::Quantity).gt(0)),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_items_order_id")
                                .from(OrderItems::Table, OrderItems::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_items_product_id")
                                .from(OrderItems::Table, OrderItems::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Restrict)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_order_items_order_id")
                        .table(OrderItems::Table)
                        .col(OrderItems::OrderId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_order_items_product_id")
                        .table(OrderItems::Table)
                        .col(OrderItems::ProductId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderItems::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum OrderItems {
        Table,
        Id,
        OrderId,
        ProductId,
        Quantity,
    }
}

mod m20260101_000004_create_status_history_table {
    use super::m20260101_000002_create_orders_table::Orders;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000004_create_status_history_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StatusHistory::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StatusHistory::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(StatusHistory::OrderId).integer().not_null())
                        .col(
                            ColumnDef::new(StatusHistory::OldStatus)
                                .string_len(20)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StatusHistory::NewStatus)
                                .string_len(20)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StatusHistory::ChangedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StatusHistory::Note).string_len(500).null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_status_history_order_id")
                                .from(StatusHistory::Table, StatusHistory::OrderId)
                                .to(Orders::Table, Orders::Id)
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
                        .name("idx_status_history_order_id")
                        .table(StatusHistory::Table)
                        .col(StatusHistory::OrderId)
                        .col(StatusHistory::ChangedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StatusHistory::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum StatusHistory {
        Table,
        Id,
        OrderId,
        OldStatus,
        NewStatus,
        ChangedAt,
        Note,
    }
}

mod m20260101_000005_seed_products {
    use super::m20260101_000001_create_products_table::Products;
    use chrono::{DateTime, Utc};
    use sea_orm_migration::prelude::*;
    use sea_orm_migration::sea_orm::DbBackend;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000005_seed_products"
        }
    }

    /// (id, name, sku, quantity on hand, reorder threshold)
    const SEED: [(i32, &str, &str, i32, i32); 8] = [
        (1, "Amoxicillin 500mg", "AMX-500", 250, 50),
        (2, "Lisinopril 10mg", "LIS-010", 180, 40),
        (3, "Metformin 850mg", "MET-850", 300, 60),
        (4, "Omeprazole 20mg", "OMP-020", 15, 30),
        (5, "Atorvastatin 40mg", "ATV-040", 120, 25),
        (6, "Sertraline 50mg", "SRT-050", 90, 20),
        (7, "Ibuprofen 200mg", "IBU-200", 500, 100),
        (8, "Azithromycin 250mg", "AZT-250", 8, 20),
    ];

    // 2026-01-01T00:00:00Z
    const SEEDED_AT_EPOCH_SECS: i64 = 1_767_225_600;

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            let seeded_at: DateTime<Utc> = DateTime::from_timestamp(SEEDED_AT_EPOCH_SECS, 0)
                .ok_or_else(|| DbErr::Migration("invalid seed timestamp".to_string()))?;

            let mut insert = Query::insert();
            insert.into_table(Products::Table).columns([
                Products::Id,
                Products::Name,
                Products::Sku,
                Products::QuantityOnHand,
                Products::ReorderThreshold,
                Products::CreatedAt,
                Products::UpdatedAt,
            ]);
            for (id, name, sku, on_hand, threshold) in SEED {
                insert
                    .values([
                        id.into(),
                        name.into(),
                        sku.into(),
                        on_hand.into(),
                        threshold.into(),
                        seeded_at.into(),
                        seeded_at.into(),
                    ])
                    .map_err(|e| DbErr::Migration(e.to_string()))?;
            }
            manager.exec_stmt(insert).await?;

            // Explicit ids leave the Postgres serial sequence behind.
            if manager.get_database_backend() == DbBackend::Postgres {
                manager
                    .get_connection()
                    .execute_unprepared(
                        "SELECT setval(pg_get_serial_sequence('products', 'id'), \
                         (SELECT MAX(id) FROM products))",
                    )
                    .await?;
            }

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            let delete = Query::delete()
                .from_table(Products::Table)
                .and_where(Expr::col(Products::Sku).is_in(SEED.iter().map(|row| row.2)))
                .to_owned();
            manager.exec_stmt(delete).await
        }
    }
}
