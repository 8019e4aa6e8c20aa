// Feed service - posts, reactions and threaded comments
use bson::{oid::ObjectId, DateTime};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::{
    Comment, EditRecord, FeedViewer, Post, Profile, Reply, Visibility, FALLBACK_DEPARTMENT,
};
use crate::repository::{PostRepository, ProfileRepository};
use crate::AppState;

const DEFAULT_FEED_LIMIT: i64 = 20;
const MAX_FEED_LIMIT: i64 = 50;
const UNKNOWN_AUTHOR: &str = "Unknown User";
const UNKNOWN_COMMENTER: &str = "Unknown";

pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_FEED_LIMIT).clamp(1, MAX_FEED_LIMIT)
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub content: String,
    pub image_urls: Vec<String>,
    pub visibility: Visibility,
}

/// A post together with its author's display data
#[derive(Debug, Clone)]
pub struct PostView {
    pub post: Post,
    pub author_name: String,
    pub author_photo: String,
}

#[derive(Debug, Clone)]
pub struct ReplyView {
    pub reply: Reply,
    pub author_name: String,
    pub author_photo: String,
}

#[derive(Debug, Clone)]
pub struct CommentView {
    pub id: ObjectId,
    pub user_id: String,
    pub text: String,
    pub created_at: DateTime,
    pub author_name: String,
    pub author_photo: String,
    pub replies: Vec<ReplyView>,
}

struct Authors(HashMap<String, Profile>);

impl Authors {
    fn name_or(&self, uid: &str, fallback: &str) -> String {
        self.0
            .get(uid)
            .map(|p| p.name.clone())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| fallback.to_string())
    }

    fn photo(&self, uid: &str) -> String {
        self.0
            .get(uid)
            .and_then(Profile::first_photo)
            .unwrap_or_default()
            .to_string()
    }
}

fn post_not_found() -> AppError {
    AppError::NotFound("Post not found".to_string())
}

fn not_owned() -> AppError {
    AppError::NotFound("Post not found or unauthorized".to_string())
}

pub struct FeedService {
    posts: Arc<dyn PostRepository>,
    profiles: Arc<dyn ProfileRepository>,
}

impl FeedService {
    pub fn new(state: &AppState) -> Self {
        Self {
            posts: state.repos.posts.clone(),
            profiles: state.repos.profiles.clone(),
        }
    }

    async fn viewer(&self, uid: &str) -> Result<FeedViewer> {
        let profile = self.profiles.find_by_user(uid).await?;
        let (department, friend_ids) = match profile {
            Some(p) => (p.department, p.friend_ids),
            None => (String::new(), Vec::new()),
        };
        Ok(FeedViewer {
            uid: uid.to_string(),
            department: if department.is_empty() {
                FALLBACK_DEPARTMENT.to_string()
            } else {
                department
            },
            friend_ids,
        })
    }

    async fn authors(&self, mut wanted: Vec<String>) -> Result<Authors> {
        wanted.sort();
        wanted.dedup();
        let profiles = self.profiles.find_by_users(&wanted).await?;
        Ok(Authors(
            profiles.into_iter().map(|p| (p.user_id.clone(), p)).collect(),
        ))
    }

    async fn with_authors(&self, posts: Vec<Post>) -> Result<Vec<PostView>> {
        let uids = posts.iter().map(|p| p.user_id.clone()).collect();
        let authors = self.authors(uids).await?;
        Ok(posts
            .into_iter()
            .map(|post| PostView {
                author_name: authors.name_or(&post.user_id, UNKNOWN_AUTHOR),
                author_photo: authors.photo(&post.user_id),
                post,
            })
            .collect())
    }

    pub async fn create(&self, uid: &str, input: NewPost) -> Result<Post> {
        let department = self.viewer(uid).await?.department;
        let post = Post::new(
            uid,
            input.content,
            input.image_urls,
            input.visibility,
            department,
        );
        let post = self.posts.insert(post).await?;
        tracing::info!(uid, post_id = %post.id, "Post created");
        Ok(post)
    }

    /// Random sample of posts visible to `uid`
    pub async fn feed(&self, uid: &str, limit: Option<i64>) -> Result<Vec<PostView>> {
        let viewer = self.viewer(uid).await?;
        let posts = self
            .posts
            .sample_visible(&viewer, clamp_limit(limit))
            .await?;
        self.with_authors(posts).await
    }

    pub async fn user_posts(
        &self,
        target: &str,
        limit: Option<i64>,
        offset: Option<u64>,
    ) -> Result<Vec<PostView>> {
        let posts = self
            .posts
            .list_by_user(target, offset.unwrap_or(0), clamp_limit(limit))
            .await?;
        self.with_authors(posts).await
    }

    async fn find(&self, id: ObjectId) -> Result<Post> {
        self.posts.find_by_id(id).await?.ok_or_else(post_not_found)
    }

    async fn find_owned(&self, id: ObjectId, uid: &str) -> Result<Post> {
        self.posts
            .find_by_id(id)
            .await?
            .filter(|p| p.user_id == uid)
            .ok_or_else(not_owned)
    }

    pub async fn toggle_like(&self, id: ObjectId, uid: &str) -> Result<Post> {
        let post = self.find(id).await?;
        let liked = !post.is_liked_by(uid);
        self.posts
            .set_like(id, uid, liked)
            .await?
            .ok_or_else(post_not_found)
    }

    pub async fn comment(&self, id: ObjectId, uid: &str, text: &str) -> Result<Post> {
        self.posts
            .push_comment(id, Comment::new(uid, text))
            .await?
            .ok_or_else(post_not_found)
    }

    pub async fn reply(
        &self,
        id: ObjectId,
        comment_id: ObjectId,
        uid: &str,
        text: &str,
    ) -> Result<Post> {
        self.posts
            .push_reply(id, comment_id, Reply::new(uid, text))
            .await?
            .ok_or_else(|| AppError::NotFound("Post or comment not found".to_string()))
    }

    /// Comments newest first, each with its replies oldest first
    pub async fn comments(&self, id: ObjectId) -> Result<Vec<CommentView>> {
        let post = self.find(id).await?;
        let uids: Vec<String> = post
            .comments
            .iter()
            .flat_map(|c| {
                std::iter::once(&c.user_id).chain(c.replies.iter().map(|r| &r.user_id))
            })
            .cloned()
            .collect();
        let authors = self.authors(uids).await?;

        let mut comments = post.comments;
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(comments
            .into_iter()
            .map(|comment| {
                let mut replies = comment.replies;
                replies.sort_by(|a, b| a.created_at.cmp(&b.created_at));
                CommentView {
                    author_name: authors.name_or(&comment.user_id, UNKNOWN_COMMENTER),
                    author_photo: authors.photo(&comment.user_id),
                    id: comment.id,
                    user_id: comment.user_id,
                    text: comment.text,
                    created_at: comment.created_at,
                    replies: replies
                        .into_iter()
                        .map(|reply| ReplyView {
                            author_name: authors.name_or(&reply.user_id, UNKNOWN_COMMENTER),
                            author_photo: authors.photo(&reply.user_id),
                            reply,
                        })
                        .collect(),
                }
            })
            .collect())
    }

    pub async fn delete(&self, id: ObjectId, uid: &str) -> Result<()> {
        if !self.posts.delete_owned(id, uid).await? {
            return Err(not_owned());
        }
        tracing::info!(uid, post_id = %id, "Post deleted");
        Ok(())
    }

    pub async fn toggle_archive(&self, id: ObjectId, uid: &str) -> Result<Post> {
        let post = self.find_owned(id, uid).await?;
        self.posts
            .set_archived_owned(id, uid, !post.is_archived)
            .await?
            .ok_or_else(not_owned)
    }

    pub async fn edit(&self, id: ObjectId, uid: &str, content: &str) -> Result<Post> {
        let post = self.find_owned(id, uid).await?;
        let previous = EditRecord {
            content: post.content,
            edited_at: DateTime::now(),
        };
        self.posts
            .edit_owned(id, uid, content, previous)
            .await?
            .ok_or_else(not_owned)
    }

    pub async fn history(&self, id: ObjectId) -> Result<Vec<EditRecord>> {
        Ok(self.find(id).await?.edit_history)
    }
}
