use bson::{doc, oid::ObjectId, DateTime, Document};
use serde::{Deserialize, Serialize};

/// Collection name for users
pub const USER_COLLECTION: &str = "users";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Pending,
    Approved,
    Banned,
    Admin,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Pending => "pending",
            UserStatus::Approved => "approved",
            UserStatus::Banned => "banned",
            UserStatus::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Admin,
    Student,
    Faculty,
    Staff,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
            UserRole::Student => "student",
            UserRole::Faculty => "faculty",
            UserRole::Staff => "staff",
        }
    }
}

/// Identity documents submitted for manual review
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verification {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_card_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selfie_url: Option<String>,
    #[serde(default)]
    pub submitted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

/// User document stored in MongoDB, keyed by Firebase uid
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub firebase_uid: String,
    pub email: String,
    #[serde(default)]
    pub status: UserStatus,
    #[serde(default)]
    pub onboarding_completed: bool,
    #[serde(default)]
    pub welcome_seen: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default)]
    pub verification: Verification,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facebook_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    #[serde(default)]
    pub is_online: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl User {
    /// A freshly signed-in account awaiting verification
    pub fn new(firebase_uid: impl Into<String>, email: impl Into<String>) -> Self {
        let now = DateTime::now();
        Self {
            id: ObjectId::new(),
            firebase_uid: firebase_uid.into(),
            email: email.into(),
            status: UserStatus::Pending,
            onboarding_completed: false,
            welcome_seen: false,
            name: None,
            department: None,
            bio: None,
            verification: Verification::default(),
            role: UserRole::User,
            linkedin_url: None,
            facebook_url: None,
            notification_token: None,
            profile_image: None,
            is_online: false,
            last_seen: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin || self.status == UserStatus::Admin
    }

    pub fn is_verified(&self) -> bool {
        matches!(self.status, UserStatus::Approved | UserStatus::Admin)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum VerificationUpdate {
    /// New documents; clears any earlier rejection
    Submitted {
        id_card_url: String,
        selfie_url: String,
    },
    Rejected { reason: Option<String> },
}

/// Partial update of a user document. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub department: Option<String>,
    pub onboarding_completed: Option<bool>,
    pub welcome_seen: Option<bool>,
    pub profile_image: Option<String>,
    pub notification_token: Option<String>,
    pub is_online: Option<bool>,
    pub last_seen: Option<DateTime>,
    pub status: Option<UserStatus>,
    pub role: Option<UserRole>,
    pub verification: Option<VerificationUpdate>,
}

impl UserUpdate {
    /// MongoDB update document (`$set` plus `$unset` when a field is cleared)
    pub fn to_update_document(&self, now: DateTime) -> Document {
        let mut set = doc! { "updatedAt": now };
        let mut unset = Document::new();

        if let Some(name) = &self.name {
            set.insert("name", name.clone());
        }
        if let Some(department) = &self.department {
            set.insert("department", department.clone());
        }
        if let Some(v) = self.onboarding_completed {
            set.insert("onboardingCompleted", v);
        }
        if let Some(v) = self.welcome_seen {
            set.insert("welcomeSeen", v);
        }
        if let Some(image) = &self.profile_image {
            set.insert("profileImage", image.clone());
        }
        if let Some(token) = &self.notification_token {
            set.insert("notificationToken", token.clone());
        }
        if let Some(v) = self.is_online {
            set.insert("isOnline", v);
        }
        if let Some(seen) = self.last_seen {
            set.insert("lastSeen", seen);
        }
        if let Some(status) = self.status {
            set.insert("status", status.as_str());
        }
        if let Some(role) = self.role {
            set.insert("role", role.as_str());
        }
        match &self.verification {
            Some(VerificationUpdate::Submitted {
                id_card_url,
                selfie_url,
            }) => {
                set.insert("verification.idCardUrl", id_card_url.clone());
                set.insert("verification.selfieUrl", selfie_url.clone());
                set.insert("verification.submitted", true);
                unset.insert("verification.rejectionReason", "");
            }
            Some(VerificationUpdate::Rejected { reason }) => {
                set.insert("verification.submitted", false);
                match reason {
                    Some(reason) => {
                        set.insert("verification.rejectionReason", reason.clone());
                    }
                    None => {
                        unset.insert("verification.rejectionReason", "");
                    }
                }
            }
            None => {}
        }

        let mut update = doc! { "$set": set };
        if !unset.is_empty() {
            update.insert("$unset", unset);
        }
        update
    }

    /// Same update applied to an in-memory document
    pub fn apply(&self, user: &mut User, now: DateTime) {
        user.updated_at = now;
        if let Some(name) = &self.name {
            user.name = Some(name.clone());
        }
        if let Some(department) = &self.department {
            user.department = Some(department.clone());
        }
        if let Some(v) = self.onboarding_completed {
            user.onboarding_completed = v;
        }
        if let Some(v) = self.welcome_seen {
            user.welcome_seen = v;
        }
        if let Some(image) = &self.profile_image {
            user.profile_image = Some(image.clone());
        }
        if let Some(token) = &self.notification_token {
            user.notification_token = Some(token.clone());
        }
        if let Some(v) = self.is_online {
            user.is_online = v;
        }
        if let Some(seen) = self.last_seen {
            user.last_seen = Some(seen);
        }
        if let Some(status) = self.status {
            user.status = status;
        }
        if let Some(role) = self.role {
            user.role = role;
        }
        match &self.verification {
            Some(VerificationUpdate::Submitted {
                id_card_url,
                selfie_url,
            }) => {
                user.verification.id_card_url = Some(id_card_url.clone());
                user.verification.selfie_url = Some(selfie_url.clone());
                user.verification.submitted = true;
                user.verification.rejection_reason = None;
            }
            Some(VerificationUpdate::Rejected { reason }) => {
                user.verification.submitted = false;
                user.verification.rejection_reason = reason.clone();
            }
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_defaults() {
        let user = User::new("uid-1", "a@nwu.ac.bd");
        assert_eq!(user.status, UserStatus::Pending);
        assert_eq!(user.role, UserRole::User);
        assert!(!user.verification.submitted);
        assert!(!user.is_verified());
        assert!(!user.is_admin());
    }

    #[test]
    fn test_admin_by_role_or_status() {
        let mut user = User::new("uid-1", "a@nwu.ac.bd");
        user.role = UserRole::Admin;
        assert!(user.is_admin());

        let mut user = User::new("uid-2", "b@nwu.ac.bd");
        user.status = UserStatus::Admin;
        assert!(user.is_admin());
        assert!(user.is_verified());
    }

    #[test]
    fn test_submission_clears_rejection() {
        let update = UserUpdate {
            verification: Some(VerificationUpdate::Submitted {
                id_card_url: "https://cdn/id.jpg".into(),
                selfie_url: "https://cdn/selfie.jpg".into(),
            }),
            ..Default::default()
        };
        let now = DateTime::now();

        let doc = update.to_update_document(now);
        let set = doc.get_document("$set").unwrap();
        assert_eq!(set.get_bool("verification.submitted").unwrap(), true);
        assert!(doc
            .get_document("$unset")
            .unwrap()
            .contains_key("verification.rejectionReason"));

        let mut user = User::new("uid-1", "a@nwu.ac.bd");
        user.verification.rejection_reason = Some("blurry".into());
        update.apply(&mut user, now);
        assert!(user.verification.submitted);
        assert!(user.verification.rejection_reason.is_none());
    }

    #[test]
    fn test_rejection_records_reason() {
        let update = UserUpdate {
            verification: Some(VerificationUpdate::Rejected {
                reason: Some("ID unreadable".into()),
            }),
            ..Default::default()
        };
        let doc = update.to_update_document(DateTime::now());
        let set = doc.get_document("$set").unwrap();
        assert_eq!(set.get_bool("verification.submitted").unwrap(), false);
        assert_eq!(
            set.get_str("verification.rejectionReason").unwrap(),
            "ID unreadable"
        );
        assert!(!doc.contains_key("$unset"));
    }

    #[test]
    fn test_empty_update_only_touches_timestamp() {
        let doc = UserUpdate::default().to_update_document(DateTime::now());
        let set = doc.get_document("$set").unwrap();
        assert_eq!(set.len(), 1);
        assert!(set.contains_key("updatedAt"));
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let user = User::new("uid-1", "a@nwu.ac.bd");
        let doc = bson::to_document(&user).unwrap();
        assert_eq!(doc.get_str("status").unwrap(), "pending");
        assert_eq!(doc.get_str("firebaseUid").unwrap(), "uid-1");
        assert!(doc.get_object_id("_id").is_ok());
    }
}
