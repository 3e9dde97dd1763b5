//! Schema bootstrap: creates any missing tables from the entity definitions.
//! Used at startup when `auto_migrate` is set and by the test harness.

use sea_orm::sea_query::TableCreateStatement;
use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, Schema};
use tracing::info;

use crate::entities;

pub async fn create_all_tables(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut statements: Vec<TableCreateStatement> = vec![
        schema.create_table_from_entity(entities::User),
        schema.create_table_from_entity(entities::OtpCode),
        schema.create_table_from_entity(entities::Category),
        schema.create_table_from_entity(entities::Product),
        schema.create_table_from_entity(entities::VariantType),
        schema.create_table_from_entity(entities::VariantOption),
        schema.create_table_from_entity(entities::ProductVariant),
        schema.create_table_from_entity(entities::VariantOptionAssignment),
        schema.create_table_from_entity(entities::Offer),
        schema.create_table_from_entity(entities::Coupon),
        schema.create_table_from_entity(entities::CouponUsage),
        schema.create_table_from_entity(entities::CartItem),
        schema.create_table_from_entity(entities::WishlistItem),
        schema.create_table_from_entity(entities::Address),
        schema.create_table_from_entity(entities::Order),
        schema.create_table_from_entity(entities::OrderItem),
        schema.create_table_from_entity(entities::Review),
        schema.create_table_from_entity(entities::Testimonial),
        schema.create_table_from_entity(entities::OrderMessage),
    ];

    for stmt in statements.iter_mut() {
        stmt.if_not_exists();
        db.execute(backend.build(&*stmt)).await?;
    }

    info!(tables = statements.len(), "schema bootstrap complete");
    Ok(())
}
