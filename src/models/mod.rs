//! Data models for EducaBlog entities.
//!
//! This module contains the data structures exchanged with the API:
//!
//! - `User`, `Role`: the authenticated identity and account kind
//! - `Post`, `Comment`: blog content with embedded authors
//! - Request payloads: `RegisterRequest`, `UserUpdate`, `NewPost`, `PostUpdate`
//! - `Pagination`, `LikeStatus`, `CommentLikeStatus`, `UploadedImage`

pub mod post;
pub mod user;

pub use post::{
    Comment, CommentLikeStatus, LikeStatus, NewPost, Pagination, Post, PostUpdate, UploadedImage,
};
pub use user::{RegisterRequest, Role, User, UserUpdate};
