//! Promote an existing account to administrator
//! Run with: cargo run --bin set-admin -- <email>

use connect_api::{
    config::Config,
    db::Database,
    models::{UserRole, UserStatus, UserUpdate},
    repository::Repositories,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let Some(email) = std::env::args().nth(1) else {
        eprintln!("Usage: set-admin <email>");
        std::process::exit(2);
    };

    let config = Config::load()?;
    println!("Connecting to database...");
    let db = Database::connect(&config).await?;
    let repos = Repositories::mongo(&db);

    let Some(user) = repos.users.find_by_email(&email).await? else {
        eprintln!("No user found with email {}", email);
        std::process::exit(1);
    };

    let update = UserUpdate {
        status: Some(UserStatus::Admin),
        role: Some(UserRole::Admin),
        ..Default::default()
    };
    repos.users.update_by_id(user.id, update).await?;

    println!("{} ({}) is now an admin", email, user.firebase_uid);
    Ok(())
}
