use sea_orm::entity::prelude::*;

/// One persisted login session in the `tower_sessions` table.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "tower_sessions")]
pub struct Model {
    /// Session id in its cookie (base64) form.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Session data as a JSON object.
    #[sea_orm(column_type = "Text")]
    pub data: String,
    /// Unix timestamp (seconds, UTC).
    pub expiry_date: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
