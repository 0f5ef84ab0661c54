//! API client for communicating with the EducaBlog REST API.
//!
//! This module provides the `ApiClient` struct for making authenticated
//! requests against the blog backend: auth/profile endpoints, posts,
//! comments, likes, and image uploads.
//!
//! Every response is wrapped in the backend's `{success, message, data,
//! pagination}` envelope; helpers here unwrap it and convert failures into
//! `ApiError` values. A 401 from any endpoint additionally emits a signal
//! on the unauthorized channel so the session layer can force a logout
//! without the transport reaching into session state.

use anyhow::{Context, Result};
use reqwest::{header, Client, Method, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::models::{
    Comment, CommentLikeStatus, LikeStatus, NewPost, Pagination, Post, PostUpdate,
    RegisterRequest, UploadedImage, User, UserUpdate,
};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Default base URL for a locally-run backend.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3001/api";

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default number of posts returned by the popular-posts endpoint.
const DEFAULT_POPULAR_LIMIT: u32 = 3;

/// Response envelope every backend endpoint uses.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    // No `default` here: it would force `T: Default` on the derived impl,
    // and a missing field already deserializes to `None`.
    data: Option<T>,
    #[serde(default)]
    pagination: Option<Pagination>,
}

/// Successful auth payload: the identity plus its bearer token.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthPayload {
    pub user: User,
    pub token: String,
}

/// Query parameters for the post list endpoint.
#[derive(Debug, Clone, Default)]
pub struct PostQuery {
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Query parameters for the comments-by-post endpoint.
#[derive(Debug, Clone, Default)]
pub struct CommentQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub sort_by: Option<String>,
    /// "asc" or "desc"
    pub sort_order: Option<String>,
}

/// API client for the EducaBlog backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    unauthorized_tx: mpsc::UnboundedSender<()>,
}

impl ApiClient {
    /// Create a new API client and the receiver half of its unauthorized
    /// channel. The caller (normally `SessionStore`) keeps the receiver and
    /// reacts to 401 signals; the client only ever sends.
    pub fn new(base_url: impl Into<String>) -> Result<(Self, mpsc::UnboundedReceiver<()>)> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;

        let (unauthorized_tx, unauthorized_rx) = mpsc::unbounded_channel();

        let base_url = base_url.into();
        let base_url = base_url.trim_end_matches('/').to_string();

        Ok((
            Self {
                client,
                base_url,
                token: None,
                unauthorized_tx,
            },
            unauthorized_rx,
        ))
    }

    /// Set the bearer token for authenticated requests
    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    /// Drop the bearer token; subsequent requests go out unauthenticated.
    pub fn clear_token(&mut self) {
        self.token = None;
    }

    /// Create a new ApiClient with the given token, sharing the connection
    /// pool and the unauthorized channel.
    pub fn with_token(&self, token: String) -> Self {
        Self {
            client: self.client.clone(), // Cheap clone, shares connection pool
            base_url: self.base_url.clone(),
            token: Some(token),
            unauthorized_tx: self.unauthorized_tx.clone(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut builder = self.client.request(method, self.url(path));
        if let Some(ref token) = self.token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder
    }

    /// Send a request and unwrap the response envelope, returning the data
    /// payload. Emits the unauthorized signal on any 401 before failing.
    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder, what: &str) -> Result<T> {
        let (data, _) = self.send_paginated(builder, what).await?;
        Ok(data)
    }

    /// Like `send`, but also returns the pagination block (default when the
    /// backend omitted it).
    async fn send_paginated<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        what: &str,
    ) -> Result<(T, Pagination)> {
        let envelope = self.send_envelope::<T>(builder, what).await?;

        let data = envelope
            .data
            .ok_or_else(|| ApiError::InvalidResponse(format!("Missing data in {} response", what)))?;
        Ok((data, envelope.pagination.unwrap_or_default()))
    }

    /// Send a request where only the envelope message matters (deletes).
    async fn send_for_message(&self, builder: RequestBuilder, what: &str) -> Result<String> {
        let envelope = self.send_envelope::<serde_json::Value>(builder, what).await?;
        Ok(envelope
            .message
            .unwrap_or_else(|| "OK".to_string()))
    }

    async fn send_envelope<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        what: &str,
    ) -> Result<Envelope<T>> {
        let response = builder
            .send()
            .await
            .with_context(|| format!("Failed to send {} request", what))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status.as_u16() == 401 {
                debug!(what, "Received 401, emitting unauthorized signal");
                // Receiver may already be gone during shutdown; nothing to do then.
                let _ = self.unauthorized_tx.send(());
            }
            // The backend puts its human-readable reason in the envelope
            // message even on error statuses; prefer it when present.
            if status.as_u16() != 401 {
                if let Ok(envelope) = serde_json::from_str::<Envelope<serde_json::Value>>(&body) {
                    if let Some(message) = envelope.message {
                        return Err(ApiError::Rejected(message).into());
                    }
                }
            }
            return Err(ApiError::from_status(status, &body).into());
        }

        let text = response
            .text()
            .await
            .with_context(|| format!("Failed to read {} response body", what))?;
        let envelope: Envelope<T> = serde_json::from_str(&text).map_err(|e| {
            warn!(what, error = %e, "Unparseable envelope");
            ApiError::InvalidResponse(format!("Failed to parse {} response: {}", what, e))
        })?;

        if !envelope.success {
            return Err(ApiError::rejected(envelope.message).into());
        }
        Ok(envelope)
    }

    // ===== Auth & profile endpoints =====

    /// POST /users/login - exchange credentials for an identity + token.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthPayload> {
        #[derive(Serialize)]
        struct Credentials<'a> {
            email: &'a str,
            password: &'a str,
        }

        debug!(email, "Logging in");
        let builder = self
            .request(Method::POST, "/users/login")
            .json(&Credentials { email, password });
        self.send(builder, "login").await
    }

    /// POST /users/register - create an account, yielding a live session.
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthPayload> {
        debug!(email = %request.email, role = %request.role, "Registering");
        let builder = self.request(Method::POST, "/users/register").json(request);
        self.send(builder, "register").await
    }

    /// GET /users/profile - the identity behind the current token.
    pub async fn get_profile(&self) -> Result<User> {
        let builder = self.request(Method::GET, "/users/profile");
        self.send(builder, "profile").await
    }

    /// PUT /users/profile - partial update, returns the full new identity.
    pub async fn update_profile(&self, update: &UserUpdate) -> Result<User> {
        let builder = self.request(Method::PUT, "/users/profile").json(update);
        self.send(builder, "profile update").await
    }

    /// PUT /users/password - change password for the current identity.
    pub async fn change_password(&self, current: &str, new: &str) -> Result<String> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct PasswordChange<'a> {
            current_password: &'a str,
            new_password: &'a str,
        }

        let builder = self.request(Method::PUT, "/users/password").json(&PasswordChange {
            current_password: current,
            new_password: new,
        });
        self.send_for_message(builder, "password change").await
    }

    /// GET /users/:id - public profile of any user.
    pub async fn get_user(&self, user_id: &str) -> Result<User> {
        let builder = self.request(Method::GET, &format!("/users/{}", user_id));
        self.send(builder, "user").await
    }

    // ===== Post endpoints =====

    /// GET /posts - paginated post list with optional search.
    pub async fn list_posts(&self, query: &PostQuery) -> Result<(Vec<Post>, Pagination)> {
        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(ref search) = query.search {
            params.push(("search", search.clone()));
        }
        if let Some(page) = query.page {
            params.push(("page", page.to_string()));
        }
        if let Some(limit) = query.limit {
            params.push(("limit", limit.to_string()));
        }

        let builder = self.request(Method::GET, "/posts").query(&params);
        self.send_paginated(builder, "posts").await
    }

    /// GET /posts/popular - the most-liked posts.
    pub async fn popular_posts(&self, limit: Option<u32>) -> Result<Vec<Post>> {
        let limit = limit.unwrap_or(DEFAULT_POPULAR_LIMIT);
        let builder = self
            .request(Method::GET, "/posts/popular")
            .query(&[("limit", limit.to_string())]);
        self.send(builder, "popular posts").await
    }

    /// GET /posts/:id
    pub async fn get_post(&self, post_id: &str) -> Result<Post> {
        let builder = self.request(Method::GET, &format!("/posts/{}", post_id));
        self.send(builder, "post").await
    }

    /// POST /posts - teachers only, enforced server-side.
    pub async fn create_post(&self, post: &NewPost) -> Result<Post> {
        debug!(title = %post.title, "Creating post");
        let builder = self.request(Method::POST, "/posts").json(post);
        self.send(builder, "post create").await
    }

    /// PUT /posts/:id
    pub async fn update_post(&self, post_id: &str, update: &PostUpdate) -> Result<Post> {
        let builder = self
            .request(Method::PUT, &format!("/posts/{}", post_id))
            .json(update);
        self.send(builder, "post update").await
    }

    /// DELETE /posts/:id - returns the backend's confirmation message.
    pub async fn delete_post(&self, post_id: &str) -> Result<String> {
        let builder = self.request(Method::DELETE, &format!("/posts/{}", post_id));
        self.send_for_message(builder, "post delete").await
    }

    /// POST /posts/:id/like - toggles; response says which way it went.
    pub async fn toggle_post_like(&self, post_id: &str) -> Result<LikeStatus> {
        let builder = self.request(Method::POST, &format!("/posts/{}/like", post_id));
        self.send(builder, "post like").await
    }

    // ===== Comment endpoints =====

    /// GET /comments/post/:id - comments for a post, newest-first by default.
    pub async fn comments_by_post(
        &self,
        post_id: &str,
        query: &CommentQuery,
    ) -> Result<(Vec<Comment>, Pagination)> {
        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(page) = query.page {
            params.push(("page", page.to_string()));
        }
        if let Some(limit) = query.limit {
            params.push(("limit", limit.to_string()));
        }
        if let Some(ref sort_by) = query.sort_by {
            params.push(("sortBy", sort_by.clone()));
        }
        if let Some(ref sort_order) = query.sort_order {
            params.push(("sortOrder", sort_order.clone()));
        }

        let builder = self
            .request(Method::GET, &format!("/comments/post/{}", post_id))
            .query(&params);
        self.send_paginated(builder, "comments").await
    }

    /// POST /posts/:id/comment
    pub async fn create_comment(&self, post_id: &str, content: &str) -> Result<Comment> {
        #[derive(Serialize)]
        struct NewComment<'a> {
            content: &'a str,
        }

        let builder = self
            .request(Method::POST, &format!("/posts/{}/comment", post_id))
            .json(&NewComment { content });
        self.send(builder, "comment create").await
    }

    /// PUT /comments/:id
    pub async fn update_comment(&self, comment_id: &str, content: &str) -> Result<Comment> {
        #[derive(Serialize)]
        struct EditedComment<'a> {
            content: &'a str,
        }

        let builder = self
            .request(Method::PUT, &format!("/comments/{}", comment_id))
            .json(&EditedComment { content });
        self.send(builder, "comment update").await
    }

    /// DELETE /comments/:id
    pub async fn delete_comment(&self, comment_id: &str) -> Result<String> {
        let builder = self.request(Method::DELETE, &format!("/comments/{}", comment_id));
        self.send_for_message(builder, "comment delete").await
    }

    /// PUT /comments/:id/like - toggles, like posts, but over PUT.
    pub async fn toggle_comment_like(&self, comment_id: &str) -> Result<CommentLikeStatus> {
        let builder = self.request(Method::PUT, &format!("/comments/{}/like", comment_id));
        self.send(builder, "comment like").await
    }

    // ===== Upload endpoints =====

    /// POST /upload/image - multipart upload of a single image.
    pub async fn upload_image(&self, bytes: Vec<u8>, filename: &str) -> Result<UploadedImage> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename.to_string());
        let form = reqwest::multipart::Form::new().part("image", part);

        let builder = self.request(Method::POST, "/upload/image").multipart(form);
        self.send(builder, "image upload").await
    }

    /// POST /upload/images - multipart upload of several images at once,
    /// one `images` part per file.
    pub async fn upload_images(
        &self,
        files: Vec<(Vec<u8>, String)>,
    ) -> Result<Vec<UploadedImage>> {
        let mut form = reqwest::multipart::Form::new();
        for (bytes, filename) in files {
            let part = reqwest::multipart::Part::bytes(bytes).file_name(filename);
            form = form.part("images", part);
        }

        let builder = self.request(Method::POST, "/upload/images").multipart(form);
        self.send(builder, "images upload").await
    }

    /// DELETE /upload/image/:filename
    pub async fn delete_image(&self, filename: &str) -> Result<String> {
        let builder = self.request(Method::DELETE, &format!("/upload/image/{}", filename));
        self.send_for_message(builder, "image delete").await
    }

    /// GET /upload/images - every image the current user may manage.
    pub async fn list_images(&self) -> Result<Vec<UploadedImage>> {
        let builder = self.request(Method::GET, "/upload/images");
        self.send(builder, "image list").await
    }
}
