pub mod error;
pub mod models;
pub mod orm;
pub mod settings;
pub mod validation;

pub use error::{Error, Result, ValidationError};
pub use models::{Author, NewPost, Post};

inventory::collect!(crate::orm::Migration);
