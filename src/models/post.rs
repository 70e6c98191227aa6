use super::{Author, OrNone};
use crate::error::{Error, Result, ValidationError};
use crate::orm::{BoxFuture, Db, Migration, Model};
use crate::validation::{validate_category, validate_content, validate_summary, validate_title};
use chrono::NaiveDateTime;
use log::{debug, info};
use serde::Serialize;
use sqlx::FromRow;
use std::fmt;
use std::sync::Arc;

const SELECT_POST: &str = "SELECT id, title, content, summary, category, created_at, \
                           updated_at, author_id FROM posts";

/// Field values for a post that has not been validated yet.
#[derive(Debug, Clone, Default)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub summary: Option<String>,
    pub category: String,
    pub author_id: Option<i64>,
}

/// An article, optionally attributed to an [`Author`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Post {
    id: Option<i64>,
    title: String,
    content: String,
    summary: Option<String>,
    category: String,
    created_at: Option<NaiveDateTime>,
    updated_at: Option<NaiveDateTime>,
    author_id: Option<i64>,
}

impl Post {
    /// Validate title, content, summary and category, in that order, and
    /// build an unsaved post. The first rejected field is reported.
    ///
    /// An absent summary is not validated. Whether `author_id` points at a
    /// real author is only checked when the post is written.
    pub fn new(new: NewPost) -> std::result::Result<Self, ValidationError> {
        validate_title(&new.title)?;
        validate_content(&new.content)?;
        if let Some(summary) = &new.summary {
            validate_summary(summary)?;
        }
        validate_category(&new.category)?;
        Ok(Post {
            id: None,
            title: new.title,
            content: new.content,
            summary: new.summary,
            category: new.category,
            created_at: None,
            updated_at: None,
            author_id: new.author_id,
        })
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn created_at(&self) -> Option<NaiveDateTime> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<NaiveDateTime> {
        self.updated_at
    }

    pub fn author_id(&self) -> Option<i64> {
        self.author_id
    }

    pub fn set_title(&mut self, title: impl Into<String>) -> std::result::Result<(), ValidationError> {
        let title = title.into();
        validate_title(&title)?;
        self.title = title;
        Ok(())
    }

    pub fn set_content(
        &mut self,
        content: impl Into<String>,
    ) -> std::result::Result<(), ValidationError> {
        let content = content.into();
        validate_content(&content)?;
        self.content = content;
        Ok(())
    }

    /// Replace the summary. `None` clears it without validation.
    pub fn set_summary(
        &mut self,
        summary: Option<String>,
    ) -> std::result::Result<(), ValidationError> {
        if let Some(summary) = &summary {
            validate_summary(summary)?;
        }
        self.summary = summary;
        Ok(())
    }

    pub fn set_category(
        &mut self,
        category: impl Into<String>,
    ) -> std::result::Result<(), ValidationError> {
        let category = category.into();
        validate_category(&category)?;
        self.category = category;
        Ok(())
    }

    pub fn set_author_id(&mut self, author_id: Option<i64>) {
        self.author_id = author_id;
    }

    /// Attribute this post to a saved author.
    pub fn set_author(&mut self, author: &Author) -> Result<()> {
        self.author_id = Some(author.id().ok_or(Error::NotPersisted)?);
        Ok(())
    }

    async fn check_author(&self, db: &Db) -> Result<()> {
        if let Some(author_id) = self.author_id {
            if !Author::exists(db, author_id).await? {
                return Err(Error::AuthorNotFound(author_id));
            }
        }
        Ok(())
    }

    /// Insert a new row and record the generated id and creation time.
    pub async fn insert(&mut self, db: &Db) -> Result<()> {
        self.check_author(db).await?;
        debug!("Inserting post `{}`", self.title);
        let (id, created_at): (i64, Option<NaiveDateTime>) = sqlx::query_as(
            "INSERT INTO posts (title, content, summary, category, author_id) \
             VALUES (?, ?, ?, ?, ?) RETURNING id, created_at",
        )
        .bind(&self.title)
        .bind(&self.content)
        .bind(&self.summary)
        .bind(&self.category)
        .bind(self.author_id)
        .fetch_one(db.pool())
        .await?;

        self.id = Some(id);
        self.created_at = created_at;
        self.updated_at = None;
        info!("Created post {} `{}`", id, self.title);
        Ok(())
    }

    /// Write the current field values. Unsaved posts are inserted instead.
    pub async fn save(&mut self, db: &Db) -> Result<()> {
        let Some(id) = self.id else {
            return self.insert(db).await;
        };
        self.check_author(db).await?;
        let updated: Option<(Option<NaiveDateTime>,)> = sqlx::query_as(
            "UPDATE posts SET title = ?, content = ?, summary = ?, category = ?, author_id = ?, \
             updated_at = CURRENT_TIMESTAMP WHERE id = ? RETURNING updated_at",
        )
        .bind(&self.title)
        .bind(&self.content)
        .bind(&self.summary)
        .bind(&self.category)
        .bind(self.author_id)
        .bind(id)
        .fetch_optional(db.pool())
        .await?;

        let (updated_at,) = updated.ok_or(Error::NotPersisted)?;
        self.updated_at = updated_at;
        debug!("Updated post {}", id);
        Ok(())
    }

    pub async fn delete(self, db: &Db) -> Result<()> {
        let id = self.id.ok_or(Error::NotPersisted)?;
        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(db.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotPersisted);
        }
        info!("Deleted post {}", id);
        Ok(())
    }

    pub async fn find(db: &Db, id: i64) -> Result<Option<Post>> {
        let post = sqlx::query_as(&format!("{SELECT_POST} WHERE id = ?"))
            .bind(id)
            .fetch_optional(db.pool())
            .await?;
        Ok(post)
    }

    pub async fn all(db: &Db) -> Result<Vec<Post>> {
        let posts = sqlx::query_as(&format!("{SELECT_POST} ORDER BY id"))
            .fetch_all(db.pool())
            .await?;
        Ok(posts)
    }

    pub(crate) async fn by_author(db: &Db, author_id: i64) -> Result<Vec<Post>> {
        let posts = sqlx::query_as(&format!("{SELECT_POST} WHERE author_id = ? ORDER BY id"))
            .bind(author_id)
            .fetch_all(db.pool())
            .await?;
        Ok(posts)
    }

    /// The author this post belongs to, if any.
    pub async fn author(&self, db: &Db) -> Result<Option<Author>> {
        match self.author_id {
            Some(author_id) => Author::find(db, author_id).await,
            None => Ok(None),
        }
    }
}

impl fmt::Display for Post {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Post(id={}, title={}, content={}, summary={})",
            OrNone(&self.id),
            self.title,
            self.content,
            OrNone(&self.summary)
        )
    }
}

#[async_trait::async_trait]
impl Model for Post {
    fn table_name() -> &'static str {
        "posts"
    }

    fn create_table_sql() -> String {
        "CREATE TABLE IF NOT EXISTS posts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            summary TEXT,
            category TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME,
            author_id INTEGER REFERENCES authors(id)
        )"
        .to_string()
    }

    fn columns() -> Vec<(String, String)> {
        [
            ("id", "INTEGER"),
            ("title", "TEXT"),
            ("content", "TEXT"),
            ("summary", "TEXT"),
            ("category", "TEXT"),
            ("created_at", "DATETIME"),
            ("updated_at", "DATETIME"),
            ("author_id", "INTEGER REFERENCES authors(id)"),
        ]
        .into_iter()
        .map(|(name, sqltype)| (name.to_string(), sqltype.to_string()))
        .collect()
    }
}

fn migrate_posts(db: Arc<Db>) -> BoxFuture<'static, std::result::Result<(), sqlx::Error>> {
    Post::migrate(db)
}

inventory::submit! {
    Migration(migrate_posts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> NewPost {
        NewPost {
            title: "Top 10 Secrets".into(),
            content: "a".repeat(300),
            summary: Some("ok".into()),
            category: "Fiction".into(),
            author_id: None,
        }
    }

    #[test]
    fn accepts_a_valid_post() {
        let post = Post::new(valid()).unwrap();
        assert_eq!(post.title(), "Top 10 Secrets");
        assert_eq!(post.summary(), Some("ok"));
        assert_eq!(post.id(), None);
    }

    #[test]
    fn rejects_a_dull_title() {
        let err = Post::new(NewPost {
            title: "My Day".into(),
            ..valid()
        })
        .unwrap_err();
        assert_eq!(err.field, "title");
    }

    #[test]
    fn first_invalid_field_is_reported() {
        let err = Post::new(NewPost {
            content: "short".into(),
            category: "Poetry".into(),
            ..valid()
        })
        .unwrap_err();
        assert_eq!(err.field, "content");
    }

    #[test]
    fn absent_summary_is_accepted() {
        let post = Post::new(NewPost {
            summary: None,
            ..valid()
        })
        .unwrap();
        assert_eq!(post.summary(), None);
        assert!(post.to_string().ends_with("summary=None)"));
    }

    #[test]
    fn setters_validate_before_assigning() {
        let mut post = Post::new(valid()).unwrap();
        assert!(post.set_category("fiction").is_err());
        assert_eq!(post.category(), "Fiction");
        assert!(post.set_summary(Some("s".repeat(251))).is_err());
        assert_eq!(post.summary(), Some("ok"));
        assert!(post.set_content("too short").is_err());
        assert!(post.set_title("Guess what").is_ok());
        assert_eq!(post.title(), "Guess what");
        post.set_summary(None).unwrap();
        assert_eq!(post.summary(), None);
    }

    #[test]
    fn set_author_needs_a_saved_author() {
        let mut post = Post::new(valid()).unwrap();
        let author = Author::new("Ada", "5551234567").unwrap();
        assert!(matches!(post.set_author(&author), Err(Error::NotPersisted)));
        assert_eq!(post.author_id(), None);
    }
}
