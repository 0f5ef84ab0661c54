//! REST API client module for the EducaBlog backend.
//!
//! This module provides the `ApiClient` for communicating with the blog
//! API: authentication, profiles, posts, comments, likes, and uploads.
//!
//! The API uses JWT bearer token authentication obtained through the
//! login and register endpoints; a 401 from any endpoint is surfaced as
//! `ApiError::Unauthorized` and additionally signalled on the client's
//! unauthorized channel.

pub mod client;
pub mod error;

pub use client::{ApiClient, AuthPayload, CommentQuery, PostQuery, DEFAULT_BASE_URL};
pub use error::ApiError;
