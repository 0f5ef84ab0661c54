//! EducaBlog client library.
//!
//! The non-UI core of the EducaBlog frontend: typed models, an async API
//! client for every backend endpoint, pre-flight form validation, and a
//! `SessionStore` that owns the authenticated session and its persisted
//! mirror.
//!
//! A frontend constructs one `SessionStore` at startup, calls `restore()`
//! once, and passes the store to every screen that needs identity or
//! authenticated API access:
//!
//! ```no_run
//! use educablog_client::{Config, SessionStore};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::load()?;
//! let mut session = SessionStore::new(config.base_url(), config.data_dir()?)?;
//! if !session.restore() {
//!     session.login("maria@escola.edu", "secret").await?;
//! }
//! let (posts, _pages) = session.client().list_posts(&Default::default()).await?;
//! # Ok(())
//! # }
//! ```
//!
//! Any request the backend answers with a 401 forces the store back to the
//! unauthenticated state at its next entry point; callers only ever see
//! the session as fully present or fully absent.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod validate;

pub use api::{ApiClient, ApiError, AuthPayload, CommentQuery, PostQuery};
pub use auth::{Session, SessionStore};
pub use config::Config;
pub use models::{
    Comment, NewPost, Pagination, Post, PostUpdate, RegisterRequest, Role, User, UserUpdate,
};
pub use validate::ValidationError;
