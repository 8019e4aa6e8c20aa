pub mod admin_service;
pub mod audit_service;
pub mod chat_service;
pub mod connect_service;
pub mod feed_service;
pub mod notification_service;
pub mod profile_service;
pub mod report_service;
pub mod user_service;

pub use admin_service::{
    AdminService, AdminStats, AuditLogView, GrowthPoint, ReportView, UserSummary,
};
pub use audit_service::AuditService;
pub use chat_service::{ChatService, ConversationView, SendMessage};
pub use connect_service::{rank_candidates, ConnectService, SwipeOutcome};
pub use feed_service::{CommentView, FeedService, NewPost, PostView, ReplyView};
pub use notification_service::{notification_data, NotificationService};
pub use profile_service::{ProfileInput, ProfileService};
pub use report_service::{NewReport, ReportService};
pub use user_service::{
    AccountView, ConnectionStatus, OnboardingProfile, PublicProfile, UserService,
};
