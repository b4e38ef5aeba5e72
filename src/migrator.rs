//! Embedded schema migrations. Used by the startup auto-migrate path and
//! by the sqlite-backed integration tests.

use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_catalog_tables::Migration),
            Box::new(m20240101_000002_create_warehouse_tables::Migration),
            Box::new(m20240101_000003_create_order_tables::Migration),
            Box::new(m20240101_000004_create_activity_table::Migration),
        ]
    }
}

mod m20240101_000001_create_catalog_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_catalog_tables"
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
                        .col(ColumnDef::new(Products::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Products::Sku).string().not_null().unique_key())
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(ColumnDef::new(Products::Unit).string().null())
                        .col(ColumnDef::new(Products::Supplier).string().null())
                        .col(ColumnDef::new(Products::ProductionDate).date().null())
                        .col(ColumnDef::new(Products::ExpiryDate).date().null())
                        .col(ColumnDef::new(Products::Status).string().not_null())
                        .col(ColumnDef::new(Products::CreatedAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(Products::UpdatedAt).timestamp_with_time_zone().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ProductBatches::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProductBatches::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProductBatches::ProductId).uuid().not_null())
                        .col(
                            ColumnDef::new(ProductBatches::BatchNumber)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(ProductBatches::InitialQuantity)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductBatches::CurrentQuantity)
                                .decimal_len(16, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(ProductBatches::UnitPrice)
                                .decimal_len(16, 4)
                                .null(),
                        )
                        .col(ColumnDef::new(ProductBatches::ProductionDate).date().null())
                        .col(ColumnDef::new(ProductBatches::ExpiryDate).date().null())
                        .col(ColumnDef::new(ProductBatches::Status).string().not_null())
                        .col(
                            ColumnDef::new(ProductBatches::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProductBatches::UpdatedAt).timestamp_with_time_zone().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_product_batches_product")
                                .from(ProductBatches::Table, ProductBatches::ProductId)
                                .to(Products::Table, Products::Id),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ProductBatches::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    pub enum Products {
        Table,
        Id,
        Sku,
        Name,
        Unit,
        Supplier,
        ProductionDate,
        ExpiryDate,
        Status,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    pub enum ProductBatches {
        Table,
        Id,
        ProductId,
        BatchNumber,
        InitialQuantity,
        CurrentQuantity,
        UnitPrice,
        ProductionDate,
        ExpiryDate,
        Status,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000002_create_warehouse_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_warehouse_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Warehouses::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Warehouses::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Warehouses::Code)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Warehouses::Name).string().not_null())
                        .col(
                            ColumnDef::new(Warehouses::Width)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Warehouses::Height)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Warehouses::Status).string().not_null())
                        .col(ColumnDef::new(Warehouses::CreatedAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(Warehouses::UpdatedAt).timestamp_with_time_zone().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(WarehouseCells::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(WarehouseCells::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(WarehouseCells::WarehouseId).uuid().not_null())
                        .col(ColumnDef::new(WarehouseCells::GridRow).integer().not_null())
                        .col(ColumnDef::new(WarehouseCells::GridCol).integer().not_null())
                        .col(ColumnDef::new(WarehouseCells::CellCode).string().not_null())
                        .col(
                            ColumnDef::new(WarehouseCells::MaxCapacity)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseCells::CurrentAmount)
                                .decimal_len(16, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(WarehouseCells::ProductId).uuid().null())
                        .col(ColumnDef::new(WarehouseCells::ProductName).string().null())
                        .col(ColumnDef::new(WarehouseCells::BatchNumber).string().null())
                        .col(ColumnDef::new(WarehouseCells::ProductionDate).date().null())
                        .col(ColumnDef::new(WarehouseCells::ExpiryDate).date().null())
                        .col(ColumnDef::new(WarehouseCells::Supplier).string().null())
                        .col(ColumnDef::new(WarehouseCells::Status).string().not_null())
                        .col(
                            ColumnDef::new(WarehouseCells::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(WarehouseCells::UpdatedAt).timestamp_with_time_zone().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_warehouse_cells_warehouse")
                                .from(WarehouseCells::Table, WarehouseCells::WarehouseId)
                                .to(Warehouses::Table, Warehouses::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_warehouse_cells_position")
                        .table(WarehouseCells::Table)
                        .col(WarehouseCells::WarehouseId)
                        .col(WarehouseCells::GridRow)
                        .col(WarehouseCells::GridCol)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(WarehouseCellProducts::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(WarehouseCellProducts::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseCellProducts::CellId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseCellProducts::ProductId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseCellProducts::BatchNumber)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseCellProducts::Quantity)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseCellProducts::RemainingQuantity)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseCellProducts::UnitPrice)
                                .decimal_len(16, 4)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseCellProducts::TotalPrice)
                                .decimal_len(16, 4)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseCellProducts::ProductionDate)
                                .date()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseCellProducts::ExpiryDate)
                                .date()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseCellProducts::Supplier)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseCellProducts::Status)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseCellProducts::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseCellProducts::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_warehouse_cell_products_cell")
                                .from(WarehouseCellProducts::Table, WarehouseCellProducts::CellId)
                                .to(WarehouseCells::Table, WarehouseCells::Id),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(WarehouseCellProducts::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(WarehouseCells::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Warehouses::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    pub enum Warehouses {
        Table,
        Id,
        Code,
        Name,
        Width,
        Height,
        Status,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    pub enum WarehouseCells {
        Table,
        Id,
        WarehouseId,
        GridRow,
        GridCol,
        CellCode,
        MaxCapacity,
        CurrentAmount,
        ProductId,
        ProductName,
        BatchNumber,
        ProductionDate,
        ExpiryDate,
        Supplier,
        Status,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    pub enum WarehouseCellProducts {
        Table,
        Id,
        CellId,
        ProductId,
        BatchNumber,
        Quantity,
        RemainingQuantity,
        UnitPrice,
        TotalPrice,
        ProductionDate,
        ExpiryDate,
        Supplier,
        Status,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000003_create_order_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_order_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ImportOrders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ImportOrders::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        // Unique index backs the retry-on-conflict order
                        // number generation.
                        .col(
                            ColumnDef::new(ImportOrders::OrderNumber)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(ImportOrders::OrderName).string().null())
                        .col(ColumnDef::new(ImportOrders::OrderType).string().not_null())
                        .col(ColumnDef::new(ImportOrders::WarehouseId).uuid().not_null())
                        .col(ColumnDef::new(ImportOrders::Counterparty).string().null())
                        .col(ColumnDef::new(ImportOrders::OrderDate).timestamp_with_time_zone().not_null())
                        .col(
                            ColumnDef::new(ImportOrders::TotalValue)
                                .decimal_len(16, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(ImportOrders::Notes).string().null())
                        .col(ColumnDef::new(ImportOrders::Status).string().not_null())
                        .col(ColumnDef::new(ImportOrders::CreatedAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(ImportOrders::UpdatedAt).timestamp_with_time_zone().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ImportOrderDetails::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ImportOrderDetails::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ImportOrderDetails::OrderId).uuid().not_null())
                        .col(
                            ColumnDef::new(ImportOrderDetails::ProductId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ImportOrderDetails::WarehouseCellId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ImportOrderDetails::ProductBatchId)
                                .uuid()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ImportOrderDetails::BatchNumber)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ImportOrderDetails::Quantity)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ImportOrderDetails::UnitPrice)
                                .decimal_len(16, 4)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ImportOrderDetails::TotalPrice)
                                .decimal_len(16, 4)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ImportOrderDetails::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_import_order_details_order")
                                .from(ImportOrderDetails::Table, ImportOrderDetails::OrderId)
                                .to(ImportOrders::Table, ImportOrders::Id),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ImportOrderDetails::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ImportOrders::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    pub enum ImportOrders {
        Table,
        Id,
        OrderNumber,
        OrderName,
        OrderType,
        WarehouseId,
        Counterparty,
        OrderDate,
        TotalValue,
        Notes,
        Status,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    pub enum ImportOrderDetails {
        Table,
        Id,
        OrderId,
        ProductId,
        WarehouseCellId,
        ProductBatchId,
        BatchNumber,
        Quantity,
        UnitPrice,
        TotalPrice,
        CreatedAt,
    }
}

mod m20240101_000004_create_activity_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_activity_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(WarehouseActivities::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(WarehouseActivities::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseActivities::WarehouseId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(WarehouseActivities::CellId).uuid().not_null())
                        .col(
                            ColumnDef::new(WarehouseActivities::ActivityType)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(WarehouseActivities::ProductId).uuid().null())
                        .col(
                            ColumnDef::new(WarehouseActivities::BatchNumber)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseActivities::Quantity)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(ColumnDef::new(WarehouseActivities::Actor).string().null())
                        .col(ColumnDef::new(WarehouseActivities::Notes).string().null())
                        .col(
                            ColumnDef::new(WarehouseActivities::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_warehouse_activities_batch")
                        .table(WarehouseActivities::Table)
                        .col(WarehouseActivities::BatchNumber)
                        .col(WarehouseActivities::ActivityType)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(WarehouseActivities::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    pub enum WarehouseActivities {
        Table,
        Id,
        WarehouseId,
        CellId,
        ActivityType,
        ProductId,
        BatchNumber,
        Quantity,
        Actor,
        Notes,
        CreatedAt,
    }
}
