use sqlx::SqliteConnection;

use crate::users::dto::CreateUser;
pub use crate::users::repo_types::User;

impl User {
    /// Find a user by identifier.
    pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, lastname, age, email, password, cv
            FROM "user"
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await?;
        Ok(user)
    }

    /// Insert a new user; the store assigns the identifier.
    pub async fn create(
        conn: &mut SqliteConnection,
        input: &CreateUser,
        password: &str,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO "user" (name, lastname, age, email, password, cv)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            RETURNING id, name, lastname, age, email, password, cv
            "#,
        )
        .bind(&input.base.name)
        .bind(&input.base.lastname)
        .bind(input.base.age)
        .bind(&input.email)
        .bind(password)
        .bind(&input.cv)
        .fetch_one(conn)
        .await?;
        Ok(user)
    }

    pub async fn list(
        conn: &mut SqliteConnection,
        offset: u32,
        limit: u32,
    ) -> anyhow::Result<Vec<User>> {
        let rows = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, lastname, age, email, password, cv
            FROM "user"
            ORDER BY id
            LIMIT ?1 OFFSET ?2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(conn)
        .await?;
        Ok(rows)
    }

    /// Persist every mutable column of `self`, keyed by its identifier.
    pub async fn save(&self, conn: &mut SqliteConnection) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE "user"
               SET name = ?1, lastname = ?2, age = ?3, email = ?4, password = ?5, cv = ?6
             WHERE id = ?7
            RETURNING id, name, lastname, age, email, password, cv
            "#,
        )
        .bind(&self.name)
        .bind(&self.lastname)
        .bind(self.age)
        .bind(&self.email)
        .bind(&self.password)
        .bind(&self.cv)
        .bind(self.id)
        .fetch_one(conn)
        .await?;
        Ok(user)
    }

    /// Returns false when no row had that identifier.
    pub async fn delete(conn: &mut SqliteConnection, id: i64) -> anyhow::Result<bool> {
        let result = sqlx::query(r#"DELETE FROM "user" WHERE id = ?1"#)
            .bind(id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
