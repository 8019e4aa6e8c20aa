/// Firebase shared library
///
/// Server-side Firebase access for the NWU Connect backend:
/// - OAuth2 access tokens for a service account, cached until shortly before expiry
/// - Firebase Cloud Messaging (HTTP v1) single-device sends
/// - Realtime Database REST reads and writes
/// - Firebase Auth ID token verification against Google's published keys

pub mod client;
pub mod credentials;
pub mod errors;
pub mod id_token;
pub mod models;
pub mod rtdb;

pub use client::FcmClient;
pub use credentials::{ServiceAccountKey, TokenProvider};
pub use errors::FirebaseError;
pub use id_token::{FirebaseClaims, IdTokenVerifier};
pub use models::{FcmSendResult, PushMessage};
pub use rtdb::RealtimeDatabaseClient;
