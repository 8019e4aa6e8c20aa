use bson::{doc, oid::ObjectId, DateTime, Document};
use serde::{Deserialize, Serialize};

/// Collection name for posts
pub const POST_COLLECTION: &str = "posts";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Friends,
    Department,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user_id: String,
    pub text: String,
    pub created_at: DateTime,
}

impl Reply {
    pub fn new(user_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: ObjectId::new(),
            user_id: user_id.into(),
            text: text.into(),
            created_at: DateTime::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user_id: String,
    pub text: String,
    pub created_at: DateTime,
    #[serde(default)]
    pub replies: Vec<Reply>,
}

impl Comment {
    pub fn new(user_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: ObjectId::new(),
            user_id: user_id.into(),
            text: text.into(),
            created_at: DateTime::now(),
            replies: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditRecord {
    pub content: String,
    pub edited_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user_id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[serde(default)]
    pub visibility: Visibility,
    /// Author's department when the post was created
    pub author_department: String,
    #[serde(default)]
    pub likes: Vec<String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default)]
    pub edit_history: Vec<EditRecord>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Post {
    pub fn new(
        user_id: impl Into<String>,
        content: impl Into<String>,
        image_urls: Vec<String>,
        visibility: Visibility,
        author_department: impl Into<String>,
    ) -> Self {
        let now = DateTime::now();
        Self {
            id: ObjectId::new(),
            user_id: user_id.into(),
            content: content.into(),
            image_urls,
            visibility,
            author_department: author_department.into(),
            likes: Vec::new(),
            comments: Vec::new(),
            is_archived: false,
            edit_history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_liked_by(&self, uid: &str) -> bool {
        self.likes.iter().any(|id| id == uid)
    }
}

/// Who is reading the feed. Decides which posts they may see.
#[derive(Debug, Clone)]
pub struct FeedViewer {
    pub uid: String,
    pub department: String,
    pub friend_ids: Vec<String>,
}

impl FeedViewer {
    pub fn can_see(&self, post: &Post) -> bool {
        if post.is_archived {
            return false;
        }
        if post.user_id == self.uid {
            return true;
        }
        match post.visibility {
            Visibility::Public => true,
            Visibility::Department => post.author_department == self.department,
            Visibility::Friends => self.friend_ids.iter().any(|id| *id == post.user_id),
        }
    }

    /// MongoDB filter equivalent to [`FeedViewer::can_see`]
    pub fn to_filter(&self) -> Document {
        doc! {
            "isArchived": { "$ne": true },
            "$or": [
                { "visibility": "public" },
                { "visibility": "department", "authorDepartment": self.department.as_str() },
                { "visibility": "friends", "userId": { "$in": self.friend_ids.clone() } },
                { "userId": self.uid.as_str() },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewer() -> FeedViewer {
        FeedViewer {
            uid: "me".into(),
            department: "CSE".into(),
            friend_ids: vec!["friend".into()],
        }
    }

    fn post(author: &str, visibility: Visibility, dept: &str) -> Post {
        Post::new(author, "hi", vec![], visibility, dept)
    }

    #[test]
    fn test_public_posts_visible() {
        assert!(viewer().can_see(&post("stranger", Visibility::Public, "Law")));
    }

    #[test]
    fn test_department_posts_need_same_department() {
        let v = viewer();
        assert!(v.can_see(&post("stranger", Visibility::Department, "CSE")));
        assert!(!v.can_see(&post("stranger", Visibility::Department, "EEE")));
    }

    #[test]
    fn test_friends_posts_need_friendship() {
        let v = viewer();
        assert!(v.can_see(&post("friend", Visibility::Friends, "Law")));
        assert!(!v.can_see(&post("stranger", Visibility::Friends, "CSE")));
    }

    #[test]
    fn test_own_posts_always_visible() {
        let v = viewer();
        assert!(v.can_see(&post("me", Visibility::Friends, "Law")));
        assert!(v.can_see(&post("me", Visibility::Department, "Law")));
    }

    #[test]
    fn test_archived_posts_hidden_even_from_author() {
        let v = viewer();
        let mut own = post("me", Visibility::Public, "CSE");
        own.is_archived = true;
        assert!(!v.can_see(&own));
    }

    #[test]
    fn test_filter_shape() {
        let filter = viewer().to_filter();
        let clauses = filter.get_array("$or").unwrap();
        assert_eq!(clauses.len(), 4);
        assert!(filter.get_document("isArchived").is_ok());
    }
}
