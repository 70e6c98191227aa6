//! Persisted blog records.
//!
//! Records are built through validating constructors and setters, so an
//! in-memory `Author` or `Post` always holds acceptable field values. Every
//! persistence operation takes the [`Db`](crate::orm::Db) handle explicitly.

mod author;
mod post;

pub use author::Author;
pub use post::{NewPost, Post};

use std::fmt;

/// Formats an optional column the way the record reprs expect: the value, or `None`.
struct OrNone<'a, T>(&'a Option<T>);

impl<T: fmt::Display> fmt::Display for OrNone<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(value) => value.fmt(f),
            None => f.write_str("None"),
        }
    }
}
