use super::{OrNone, Post};
use crate::error::{Error, Result, ValidationError};
use crate::orm::{self, BoxFuture, Db, Migration, Model};
use crate::validation::{validate_name, validate_phone_number};
use chrono::NaiveDateTime;
use log::{debug, info};
use serde::Serialize;
use sqlx::FromRow;
use std::fmt;
use std::sync::Arc;

const SELECT_AUTHOR: &str =
    "SELECT id, name, phone_number, created_at, updated_at FROM authors";

/// A named writer with a contact number. Owns zero or more [`Post`]s.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Author {
    id: Option<i64>,
    name: String,
    phone_number: String,
    created_at: Option<NaiveDateTime>,
    updated_at: Option<NaiveDateTime>,
}

impl Author {
    /// Validate both fields and build an unsaved author.
    pub fn new(
        name: impl Into<String>,
        phone_number: impl Into<String>,
    ) -> std::result::Result<Self, ValidationError> {
        let name = name.into();
        let phone_number = phone_number.into();
        validate_name(&name)?;
        validate_phone_number(&phone_number)?;
        Ok(Author {
            id: None,
            name,
            phone_number,
            created_at: None,
            updated_at: None,
        })
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phone_number(&self) -> &str {
        &self.phone_number
    }

    pub fn created_at(&self) -> Option<NaiveDateTime> {
        self.created_at
    }

    /// `None` until the first [`Author::save`] after insertion.
    pub fn updated_at(&self) -> Option<NaiveDateTime> {
        self.updated_at
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> std::result::Result<(), ValidationError> {
        let name = name.into();
        validate_name(&name)?;
        self.name = name;
        Ok(())
    }

    pub fn set_phone_number(
        &mut self,
        phone_number: impl Into<String>,
    ) -> std::result::Result<(), ValidationError> {
        let phone_number = phone_number.into();
        validate_phone_number(&phone_number)?;
        self.phone_number = phone_number;
        Ok(())
    }

    /// Insert a new row and record the generated id and creation time.
    pub async fn insert(&mut self, db: &Db) -> Result<()> {
        debug!("Inserting author `{}`", self.name);
        let (id, created_at): (i64, Option<NaiveDateTime>) = sqlx::query_as(
            "INSERT INTO authors (name, phone_number) VALUES (?, ?) RETURNING id, created_at",
        )
        .bind(&self.name)
        .bind(&self.phone_number)
        .fetch_one(db.pool())
        .await
        .map_err(|e| self.write_error(e))?;

        self.id = Some(id);
        self.created_at = created_at;
        self.updated_at = None;
        info!("Created {}", self);
        Ok(())
    }

    /// Write the current field values. Unsaved authors are inserted instead.
    pub async fn save(&mut self, db: &Db) -> Result<()> {
        let Some(id) = self.id else {
            return self.insert(db).await;
        };
        let updated: Option<(Option<NaiveDateTime>,)> = sqlx::query_as(
            "UPDATE authors SET name = ?, phone_number = ?, updated_at = CURRENT_TIMESTAMP \
             WHERE id = ? RETURNING updated_at",
        )
        .bind(&self.name)
        .bind(&self.phone_number)
        .bind(id)
        .fetch_optional(db.pool())
        .await
        .map_err(|e| self.write_error(e))?;

        let (updated_at,) = updated.ok_or(Error::NotPersisted)?;
        self.updated_at = updated_at;
        debug!("Updated {}", self);
        Ok(())
    }

    /// Delete this author's row. Fails while any post still references it.
    pub async fn delete(self, db: &Db) -> Result<()> {
        let id = self.id.ok_or(Error::NotPersisted)?;
        let result = sqlx::query("DELETE FROM authors WHERE id = ?")
            .bind(id)
            .execute(db.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotPersisted);
        }
        info!("Deleted {}", self);
        Ok(())
    }

    pub async fn find(db: &Db, id: i64) -> Result<Option<Author>> {
        let author = sqlx::query_as(&format!("{SELECT_AUTHOR} WHERE id = ?"))
            .bind(id)
            .fetch_optional(db.pool())
            .await?;
        Ok(author)
    }

    pub async fn find_by_name(db: &Db, name: &str) -> Result<Option<Author>> {
        let author = sqlx::query_as(&format!("{SELECT_AUTHOR} WHERE name = ?"))
            .bind(name)
            .fetch_optional(db.pool())
            .await?;
        Ok(author)
    }

    pub async fn all(db: &Db) -> Result<Vec<Author>> {
        let authors = sqlx::query_as(&format!("{SELECT_AUTHOR} ORDER BY id"))
            .fetch_all(db.pool())
            .await?;
        Ok(authors)
    }

    pub(crate) async fn exists(db: &Db, id: i64) -> Result<bool> {
        let found: Option<(i64,)> = sqlx::query_as("SELECT id FROM authors WHERE id = ?")
            .bind(id)
            .fetch_optional(db.pool())
            .await?;
        Ok(found.is_some())
    }

    /// Posts written by this author. An unsaved author has none.
    pub async fn posts(&self, db: &Db) -> Result<Vec<Post>> {
        match self.id {
            Some(id) => Post::by_author(db, id).await,
            None => Ok(Vec::new()),
        }
    }

    fn write_error(&self, err: sqlx::Error) -> Error {
        if orm::is_unique_violation(&err) {
            Error::DuplicateAuthorName(self.name.clone())
        } else {
            Error::Database(err)
        }
    }
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Author(id={}, name={})", OrNone(&self.id), self.name)
    }
}

#[async_trait::async_trait]
impl Model for Author {
    fn table_name() -> &'static str {
        "authors"
    }

    fn create_table_sql() -> String {
        "CREATE TABLE IF NOT EXISTS authors (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            phone_number TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME
        )"
        .to_string()
    }

    fn columns() -> Vec<(String, String)> {
        [
            ("id", "INTEGER"),
            ("name", "TEXT"),
            ("phone_number", "TEXT"),
            ("created_at", "DATETIME"),
            ("updated_at", "DATETIME"),
        ]
        .into_iter()
        .map(|(name, sqltype)| (name.to_string(), sqltype.to_string()))
        .collect()
    }
}

fn migrate_authors(db: Arc<Db>) -> BoxFuture<'static, std::result::Result<(), sqlx::Error>> {
    Author::migrate(db)
}

inventory::submit! {
    Migration(migrate_authors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_runs_every_validator() {
        let author = Author::new("Ada", "5551234567").unwrap();
        assert_eq!(author.name(), "Ada");
        assert_eq!(author.id(), None);

        assert_eq!(Author::new("", "5551234567").unwrap_err().field, "name");
        assert_eq!(Author::new("Ada", "555").unwrap_err().field, "phone_number");
    }

    #[test]
    fn rejected_setter_leaves_value_unchanged() {
        let mut author = Author::new("Ada", "5551234567").unwrap();
        assert!(author.set_phone_number("call me").is_err());
        assert_eq!(author.phone_number(), "5551234567");
        assert!(author.set_name("").is_err());
        assert_eq!(author.name(), "Ada");

        author.set_name("Grace").unwrap();
        assert_eq!(author.name(), "Grace");
    }

    #[test]
    fn display_matches_repr() {
        let author = Author::new("Ada", "5551234567").unwrap();
        assert_eq!(author.to_string(), "Author(id=None, name=Ada)");
    }
}
