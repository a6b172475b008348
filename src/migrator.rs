use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_inventory_tables::Migration),
            Box::new(m20240301_000002_create_catalog_tables::Migration),
            Box::new(m20240301_000003_create_transfer_tables::Migration),
            Box::new(m20240301_000004_create_transfer_losses_table::Migration),
        ]
    }
}

// Migration implementations

mod m20240301_000001_create_inventory_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000001_create_inventory_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(InventoryCategories::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InventoryCategories::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryCategories::StoreId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryCategories::Code)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryCategories::Name)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryCategories::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_inventory_categories_store_code")
                        .table(InventoryCategories::Table)
                        .col(InventoryCategories::StoreId)
                        .col(InventoryCategories::Code)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Suppliers::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Suppliers::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Suppliers::StoreId).uuid().not_null())
                        .col(ColumnDef::new(Suppliers::Code).string().not_null())
                        .col(ColumnDef::new(Suppliers::Name).string().not_null())
                        .col(
                            ColumnDef::new(Suppliers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_suppliers_store_code")
                        .table(Suppliers::Table)
                        .col(Suppliers::StoreId)
                        .col(Suppliers::Code)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(InventoryItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InventoryItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InventoryItems::StoreId).uuid().not_null())
                        .col(ColumnDef::new(InventoryItems::Sku).string().not_null())
                        .col(ColumnDef::new(InventoryItems::Name).string().not_null())
                        .col(ColumnDef::new(InventoryItems::Barcode).string())
                        .col(ColumnDef::new(InventoryItems::Unit).string().not_null())
                        .col(
                            ColumnDef::new(InventoryItems::PricePerUnit)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryItems::StockQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(InventoryItems::MinStock)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(InventoryItems::CategoryId).uuid())
                        .col(ColumnDef::new(InventoryItems::SupplierId).uuid())
                        .col(
                            ColumnDef::new(InventoryItems::Version)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(InventoryItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryItems::UpdatedAt)
                                .timestamp_with_time_zone(),
                        )
                        .to_owned(),
                )
                .await?;

            // SKU is unique within a store; cross-store SKU equality marks
            // "the same product" for transfer matching.
            manager
                .create_index(
                    Index::create()
                        .name("idx_inventory_items_store_sku")
                        .table(InventoryItems::Table)
                        .col(InventoryItems::StoreId)
                        .col(InventoryItems::Sku)
                        .unique()
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(InventoryItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Suppliers::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(InventoryCategories::Table).to_owned())
                .await?;
            Ok(())
        }
    }

    #[derive(Iden)]
    enum InventoryCategories {
        Table,
        Id,
        StoreId,
        Code,
        Name,
        CreatedAt,
    }

    #[derive(Iden)]
    enum Suppliers {
        Table,
        Id,
        StoreId,
        Code,
        Name,
        CreatedAt,
    }

    #[derive(Iden)]
    enum InventoryItems {
        Table,
        Id,
        StoreId,
        Sku,
        Name,
        Barcode,
        Unit,
        PricePerUnit,
        StockQuantity,
        MinStock,
        CategoryId,
        SupplierId,
        Version,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000002_create_catalog_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000002_create_catalog_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(CatalogCategories::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CatalogCategories::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(CatalogCategories::StoreId).uuid().not_null())
                        .col(ColumnDef::new(CatalogCategories::Name).string().not_null())
                        .col(
                            ColumnDef::new(CatalogCategories::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_catalog_categories_store_name")
                        .table(CatalogCategories::Table)
                        .col(CatalogCategories::StoreId)
                        .col(CatalogCategories::Name)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(CatalogProducts::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CatalogProducts::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(CatalogProducts::StoreId).uuid().not_null())
                        .col(
                            ColumnDef::new(CatalogProducts::InventoryItemId)
                                .uuid()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(CatalogProducts::Name).string().not_null())
                        .col(
                            ColumnDef::new(CatalogProducts::Price)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(ColumnDef::new(CatalogProducts::CatalogCategoryId).uuid())
                        .col(
                            ColumnDef::new(CatalogProducts::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CatalogProducts::UpdatedAt)
                                .timestamp_with_time_zone(),
                        )
                        .to_owned(),
                )
                .await?;

            // Product names are unique per store; provisioning relies on this
            // to detect conflicting links.
            manager
                .create_index(
                    Index::create()
                        .name("idx_catalog_products_store_name")
                        .table(CatalogProducts::Table)
                        .col(CatalogProducts::StoreId)
                        .col(CatalogProducts::Name)
                        .unique()
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(CatalogProducts::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(CatalogCategories::Table).to_owned())
                .await?;
            Ok(())
        }
    }

    #[derive(Iden)]
    enum CatalogCategories {
        Table,
        Id,
        StoreId,
        Name,
        CreatedAt,
    }

    #[derive(Iden)]
    enum CatalogProducts {
        Table,
        Id,
        StoreId,
        InventoryItemId,
        Name,
        Price,
        CatalogCategoryId,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000003_create_transfer_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000003_create_transfer_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(TransferOrders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(TransferOrders::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TransferOrders::TransactionCode)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(TransferOrders::StoreFromId).uuid().not_null())
                        .col(ColumnDef::new(TransferOrders::StoreToId).uuid().not_null())
                        .col(
                            ColumnDef::new(TransferOrders::StoreCreatedBy)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(TransferOrders::Status).string().not_null())
                        .col(ColumnDef::new(TransferOrders::DraftedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(TransferOrders::DraftedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(TransferOrders::ApprovedBy).uuid())
                        .col(
                            ColumnDef::new(TransferOrders::ApprovedAt)
                                .timestamp_with_time_zone(),
                        )
                        .col(ColumnDef::new(TransferOrders::ShippedBy).uuid())
                        .col(
                            ColumnDef::new(TransferOrders::ShippedAt)
                                .timestamp_with_time_zone(),
                        )
                        .col(ColumnDef::new(TransferOrders::LogisticProvider).string())
                        .col(ColumnDef::new(TransferOrders::TrackingNumber).string())
                        .col(ColumnDef::new(TransferOrders::DeliveryNote).string())
                        .col(ColumnDef::new(TransferOrders::ReceivedBy).uuid())
                        .col(
                            ColumnDef::new(TransferOrders::ReceivedAt)
                                .timestamp_with_time_zone(),
                        )
                        .col(ColumnDef::new(TransferOrders::CanceledBy).uuid())
                        .col(
                            ColumnDef::new(TransferOrders::CanceledAt)
                                .timestamp_with_time_zone(),
                        )
                        .col(ColumnDef::new(TransferOrders::CancelNote).string())
                        .col(
                            ColumnDef::new(TransferOrders::Version)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(TransferOrders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TransferOrders::UpdatedAt)
                                .timestamp_with_time_zone(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_transfer_orders_store_from")
                        .table(TransferOrders::Table)
                        .col(TransferOrders::StoreFromId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_transfer_orders_store_to")
                        .table(TransferOrders::Table)
                        .col(TransferOrders::StoreToId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(TransferOrderItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(TransferOrderItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TransferOrderItems::TransferOrderId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TransferOrderItems::InventoryItemId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TransferOrderItems::QtyReserved)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(TransferOrderItems::QtyReceived).integer())
                        .col(
                            ColumnDef::new(TransferOrderItems::UnitPrice)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TransferOrderItems::Subtotal)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TransferOrderItems::Status)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TransferOrderItems::HasDestinationProduct)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(TransferOrderItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TransferOrderItems::UpdatedAt)
                                .timestamp_with_time_zone(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_transfer_order_items_order")
                                .from(
                                    TransferOrderItems::Table,
                                    TransferOrderItems::TransferOrderId,
                                )
                                .to(TransferOrders::Table, TransferOrders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_transfer_order_items_order")
                        .table(TransferOrderItems::Table)
                        .col(TransferOrderItems::TransferOrderId)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(TransferOrderItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(TransferOrders::Table).to_owned())
                .await?;
            Ok(())
        }
    }

    #[derive(Iden)]
    pub(super) enum TransferOrders {
        Table,
        Id,
        TransactionCode,
        StoreFromId,
        StoreToId,
        StoreCreatedBy,
        Status,
        DraftedBy,
        DraftedAt,
        ApprovedBy,
        ApprovedAt,
        ShippedBy,
        ShippedAt,
        LogisticProvider,
        TrackingNumber,
        DeliveryNote,
        ReceivedBy,
        ReceivedAt,
        CanceledBy,
        CanceledAt,
        CancelNote,
        Version,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    pub(super) enum TransferOrderItems {
        Table,
        Id,
        TransferOrderId,
        InventoryItemId,
        QtyReserved,
        QtyReceived,
        UnitPrice,
        Subtotal,
        Status,
        HasDestinationProduct,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000004_create_transfer_losses_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000004_create_transfer_losses_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(TransferLosses::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(TransferLosses::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TransferLosses::TransferOrderId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TransferLosses::TransferOrderItemId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TransferLosses::InventoryItemId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(TransferLosses::QtyLost).integer().not_null())
                        .col(
                            ColumnDef::new(TransferLosses::UnitPrice)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TransferLosses::LossAmount)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TransferLosses::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_transfer_losses_order")
                        .table(TransferLosses::Table)
                        .col(TransferLosses::TransferOrderId)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(TransferLosses::Table).to_owned())
                .await?;
            Ok(())
        }
    }

    #[derive(Iden)]
    enum TransferLosses {
        Table,
        Id,
        TransferOrderId,
        TransferOrderItemId,
        InventoryItemId,
        QtyLost,
        UnitPrice,
        LossAmount,
        CreatedAt,
    }
}
