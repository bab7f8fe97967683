use sea_orm::entity::prelude::*;

/// A registered account in the `users` table.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Primary key ID (auto-incremented).
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Display name given at registration.
    pub name: String,
    /// Login identifier; unique across the table.
    #[sea_orm(unique)]
    pub email: String,
    /// Argon2 PHC string. The column keeps its historical name.
    pub password: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
