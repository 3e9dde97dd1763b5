use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Concrete value on a variation axis, e.g. "Red" for "Color".
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "variant_options")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub variant_type_id: Uuid,
    pub value: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::variant_type::Entity",
        from = "Column::VariantTypeId",
        to = "super::variant_type::Column::Id"
    )]
    VariantType,
}

impl Related<super::variant_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::VariantType.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
