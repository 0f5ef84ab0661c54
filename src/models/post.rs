//! Post and comment models.
//!
//! Posts embed their author as a full `User` object; comments do the same
//! and reference the parent post (and optionally a parent comment) by id.

use serde::{Deserialize, Serialize};

use super::User;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub image_src: String,
    pub author: User,
    #[serde(default)]
    pub likes: i64,
    #[serde(default)]
    pub comments: i64,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: String,
    pub content: String,
    pub author: User,
    /// Id of the post this comment belongs to.
    pub post: String,
    #[serde(default)]
    pub parent_comment: Option<String>,
    #[serde(default)]
    pub likes: i64,
    /// Whether the requesting user has liked this comment, when the
    /// backend knows who is asking.
    #[serde(default)]
    pub user_liked: Option<bool>,
    #[serde(default)]
    pub is_edited: bool,
    #[serde(default)]
    pub edited_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Pagination block attached to list responses. The backend has drifted
/// between `total`/`totalItems` and `pages`/`totalPages`, so both spellings
/// are accepted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub limit: u32,
    #[serde(default, alias = "totalItems")]
    pub total: u64,
    #[serde(default, alias = "totalPages")]
    pub pages: u32,
}

/// Payload for creating a post; all fields required by the backend.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub image_src: String,
}

/// Partial payload for editing a post.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_src: Option<String>,
}

/// Result of toggling a like on a post.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeStatus {
    pub liked: bool,
    pub likes_count: i64,
}

/// Result of toggling a like on a comment. Field order differs from the
/// post variant on the wire (likes first), hence a separate type.
#[derive(Debug, Clone, Deserialize)]
pub struct CommentLikeStatus {
    pub likes: i64,
    pub liked: bool,
}

/// An uploaded image as reported by the upload endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadedImage {
    pub url: String,
    pub filename: String,
    #[serde(default)]
    pub size: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn author_json() -> &'static str {
        r#"{
            "_id": "u1",
            "name": "Maria",
            "email": "maria@escola.edu",
            "school": "Central",
            "age": 41,
            "userType": "professor"
        }"#
    }

    #[test]
    fn parse_post_with_embedded_author() {
        let json = format!(
            r#"{{
                "_id": "p1",
                "title": "Fractions",
                "content": "Long body",
                "excerpt": "Short",
                "imageSrc": "/uploads/frac.png",
                "author": {},
                "likes": 4,
                "comments": 2,
                "createdAt": "2024-05-01T10:00:00.000Z"
            }}"#,
            author_json()
        );

        let post: Post = serde_json::from_str(&json).expect("post should parse");
        assert_eq!(post.id, "p1");
        assert_eq!(post.author.name, "Maria");
        assert_eq!(post.likes, 4);
        assert_eq!(post.image_src, "/uploads/frac.png");
    }

    #[test]
    fn parse_comment_defaults() {
        let json = format!(
            r#"{{
                "_id": "c1",
                "content": "Nice post",
                "author": {},
                "post": "p1"
            }}"#,
            author_json()
        );

        let comment: Comment = serde_json::from_str(&json).expect("comment should parse");
        assert_eq!(comment.likes, 0);
        assert_eq!(comment.parent_comment, None);
        assert!(!comment.is_edited);
        assert_eq!(comment.user_liked, None);
    }

    #[test]
    fn pagination_accepts_field_aliases() {
        let p: Pagination =
            serde_json::from_str(r#"{"page":2,"limit":10,"totalItems":35,"totalPages":4}"#)
                .expect("aliased pagination should parse");
        assert_eq!(p.total, 35);
        assert_eq!(p.pages, 4);

        let p: Pagination = serde_json::from_str(r#"{"page":1,"limit":10,"total":3,"pages":1}"#)
            .expect("plain pagination should parse");
        assert_eq!(p.total, 3);
    }

    #[test]
    fn post_update_omits_unset_fields() {
        let update = PostUpdate {
            title: Some("Edited".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&update).expect("update should serialize");
        assert_eq!(json["title"], "Edited");
        assert!(json.get("content").is_none());
        assert!(json.get("imageSrc").is_none());
    }
}
