pub mod audit_log;
pub mod chat;
pub mod connect;
pub mod notification;
pub mod post;
pub mod profile;
pub mod report;
pub mod user;

pub use audit_log::{AuditAction, AuditLog, CreateAuditLog};
pub use chat::{Conversation, Message, MessageStatus, MessageType};
pub use connect::{pair_key, Match, Swipe, SwipeAction};
pub use notification::Notification;
pub use post::{Comment, EditRecord, FeedViewer, Post, Reply, Visibility};
pub use profile::{
    is_valid_department, prepend_photo, Location, PrivacyLevel, PrivacySettings, Profile,
    ProfileUpdate, DEPARTMENTS, FALLBACK_DEPARTMENT, MAX_PROFILE_PHOTOS,
};
pub use report::{Report, ReportStatus};
pub use user::{User, UserRole, UserStatus, UserUpdate, Verification, VerificationUpdate};
