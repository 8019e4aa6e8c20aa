use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use validator::Validate;

use crate::error::Result;
use crate::middleware::AuthUser;
use crate::models::{Comment, EditRecord, Post, Reply, Visibility};
use crate::services::{CommentView, FeedService, NewPost, PostView, ReplyView};
use crate::utils::{format_datetime, parse_object_id};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(feed))
        .route("/ping", get(ping))
        .route("/create", post(create_post))
        .route("/user/:user_id", get(user_posts))
        .route("/:post_id/like", post(toggle_like))
        .route("/:post_id/comment", post(add_comment))
        .route("/:post_id/comment/:comment_id/reply", post(add_reply))
        .route("/:post_id/comments", get(comments))
        .route("/:post_id/delete", post(delete_post))
        .route("/:post_id/archive", post(toggle_archive))
        .route("/:post_id/edit", post(edit_post))
        .route("/:post_id/history", get(history))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub text: String,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_photo: Option<String>,
}

impl From<Reply> for ReplyResponse {
    fn from(r: Reply) -> Self {
        Self {
            id: r.id.to_hex(),
            user_id: r.user_id,
            text: r.text,
            created_at: format_datetime(r.created_at),
            author_name: None,
            author_photo: None,
        }
    }
}

impl From<ReplyView> for ReplyResponse {
    fn from(view: ReplyView) -> Self {
        Self {
            author_name: Some(view.author_name),
            author_photo: Some(view.author_photo),
            ..ReplyResponse::from(view.reply)
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub text: String,
    pub created_at: String,
    pub replies: Vec<ReplyResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_photo: Option<String>,
}

impl From<Comment> for CommentResponse {
    fn from(c: Comment) -> Self {
        Self {
            id: c.id.to_hex(),
            user_id: c.user_id,
            text: c.text,
            created_at: format_datetime(c.created_at),
            replies: c.replies.into_iter().map(Into::into).collect(),
            author_name: None,
            author_photo: None,
        }
    }
}

impl From<CommentView> for CommentResponse {
    fn from(view: CommentView) -> Self {
        Self {
            id: view.id.to_hex(),
            user_id: view.user_id,
            text: view.text,
            created_at: format_datetime(view.created_at),
            replies: view.replies.into_iter().map(Into::into).collect(),
            author_name: Some(view.author_name),
            author_photo: Some(view.author_photo),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditRecordResponse {
    pub content: String,
    pub edited_at: String,
}

impl From<EditRecord> for EditRecordResponse {
    fn from(e: EditRecord) -> Self {
        Self {
            content: e.content,
            edited_at: format_datetime(e.edited_at),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub content: String,
    pub image_urls: Vec<String>,
    pub visibility: Visibility,
    pub author_department: String,
    pub likes: Vec<String>,
    pub comments: Vec<CommentResponse>,
    pub is_archived: bool,
    pub edit_history: Vec<EditRecordResponse>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_photo: Option<String>,
}

impl From<Post> for PostResponse {
    fn from(p: Post) -> Self {
        Self {
            id: p.id.to_hex(),
            user_id: p.user_id,
            content: p.content,
            image_urls: p.image_urls,
            visibility: p.visibility,
            author_department: p.author_department,
            likes: p.likes,
            comments: p.comments.into_iter().map(Into::into).collect(),
            is_archived: p.is_archived,
            edit_history: p.edit_history.into_iter().map(Into::into).collect(),
            created_at: format_datetime(p.created_at),
            updated_at: format_datetime(p.updated_at),
            author_name: None,
            author_photo: None,
        }
    }
}

impl From<PostView> for PostResponse {
    fn from(view: PostView) -> Self {
        Self {
            author_name: Some(view.author_name),
            author_photo: Some(view.author_photo),
            ..PostResponse::from(view.post)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<u64>,
}

async fn ping() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// `offset` is accepted for client compatibility; the feed is a random sample
async fn feed(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<PostResponse>>> {
    let posts = FeedService::new(&state).feed(&auth.uid, query.limit).await?;
    Ok(Json(posts.into_iter().map(Into::into).collect()))
}

async fn user_posts(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<PostResponse>>> {
    let posts = FeedService::new(&state)
        .user_posts(&user_id, query.limit, query.offset)
        .await?;
    Ok(Json(posts.into_iter().map(Into::into).collect()))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    #[validate(length(max = 5000))]
    #[serde(default)]
    pub content: String,
    #[validate(length(max = 10))]
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[serde(default)]
    pub visibility: Visibility,
}

async fn create_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<Json<PostResponse>> {
    payload.validate()?;
    let post = FeedService::new(&state)
        .create(
            &auth.uid,
            NewPost {
                content: payload.content,
                image_urls: payload.image_urls,
                visibility: payload.visibility,
            },
        )
        .await?;
    Ok(Json(post.into()))
}

async fn toggle_like(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(post_id): Path<String>,
) -> Result<Json<PostResponse>> {
    let id = parse_object_id(&post_id, "post")?;
    let post = FeedService::new(&state).toggle_like(id, &auth.uid).await?;
    Ok(Json(post.into()))
}

#[derive(Debug, Deserialize, Validate)]
pub struct TextRequest {
    #[validate(length(min = 1, max = 2000))]
    pub text: String,
}

async fn add_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(post_id): Path<String>,
    Json(payload): Json<TextRequest>,
) -> Result<Json<PostResponse>> {
    payload.validate()?;
    let id = parse_object_id(&post_id, "post")?;
    let post = FeedService::new(&state)
        .comment(id, &auth.uid, &payload.text)
        .await?;
    Ok(Json(post.into()))
}

async fn add_reply(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path((post_id, comment_id)): Path<(String, String)>,
    Json(payload): Json<TextRequest>,
) -> Result<Json<PostResponse>> {
    payload.validate()?;
    let id = parse_object_id(&post_id, "post")?;
    let comment_id = parse_object_id(&comment_id, "comment")?;
    let post = FeedService::new(&state)
        .reply(id, comment_id, &auth.uid, &payload.text)
        .await?;
    Ok(Json(post.into()))
}

async fn comments(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<Json<Vec<CommentResponse>>> {
    let id = parse_object_id(&post_id, "post")?;
    let comments = FeedService::new(&state).comments(id).await?;
    Ok(Json(comments.into_iter().map(Into::into).collect()))
}

async fn delete_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(post_id): Path<String>,
) -> Result<Json<Value>> {
    let id = parse_object_id(&post_id, "post")?;
    FeedService::new(&state).delete(id, &auth.uid).await?;
    Ok(Json(json!({ "success": true })))
}

async fn toggle_archive(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(post_id): Path<String>,
) -> Result<Json<PostResponse>> {
    let id = parse_object_id(&post_id, "post")?;
    let post = FeedService::new(&state).toggle_archive(id, &auth.uid).await?;
    Ok(Json(post.into()))
}

#[derive(Debug, Deserialize, Validate)]
pub struct EditPostRequest {
    #[validate(length(max = 5000))]
    pub content: String,
}

async fn edit_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(post_id): Path<String>,
    Json(payload): Json<EditPostRequest>,
) -> Result<Json<PostResponse>> {
    payload.validate()?;
    let id = parse_object_id(&post_id, "post")?;
    let post = FeedService::new(&state)
        .edit(id, &auth.uid, &payload.content)
        .await?;
    Ok(Json(post.into()))
}

async fn history(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<Json<Vec<EditRecordResponse>>> {
    let id = parse_object_id(&post_id, "post")?;
    let history = FeedService::new(&state).history(id).await?;
    Ok(Json(history.into_iter().map(Into::into).collect()))
}
