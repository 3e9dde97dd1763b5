use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Purchasable configuration of a product with its own price and stock,
/// independent of the owning product's stock.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "product_variants")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub product_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub original_price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub current_price: Decimal,
    pub stock: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
    #[sea_orm(has_many = "super::variant_option_assignment::Entity")]
    OptionAssignments,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::variant_option_assignment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OptionAssignments.def()
    }
}

impl Related<super::variant_option::Entity> for Entity {
    fn to() -> RelationDef {
        super::variant_option_assignment::Relation::Option.def()
    }

    fn via() -> Option<RelationDef> {
        Some(
            super::variant_option_assignment::Relation::Variant
                .def()
                .rev(),
        )
    }
}

impl ActiveModelBehavior for ActiveModel {}
