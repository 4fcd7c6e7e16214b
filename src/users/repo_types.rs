use sqlx::FromRow;

/// User row as persisted in the `user` table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct User {
    pub id: i64,          // assigned by the store on insert
    pub name: String,
    pub lastname: String,
    pub age: Option<i64>,
    pub email: String,
    pub password: String, // whatever the configured hasher produced
    pub cv: String,       // CV reference, usually a filename
}
