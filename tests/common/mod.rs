// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use cash_manager::application::{LedgerService, RegistrationRequest};
use cash_manager::config::ServiceOptions;
use cash_manager::domain::User;
use tempfile::TempDir;

/// Lowest cost bcrypt accepts; keeps hashing fast in tests.
pub const TEST_PASSWORD_COST: u32 = 4;

pub const PASSWORD: &str = "correct horse";

/// Options for a database inside the given directory
pub fn test_options(temp_dir: &TempDir) -> ServiceOptions {
    let db_path = temp_dir.path().join("test.db");
    ServiceOptions::new(db_path.to_str().unwrap()).with_password_cost(TEST_PASSWORD_COST)
}

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let service = LedgerService::init(&test_options(&temp_dir)).await?;
    Ok((service, temp_dir))
}

/// Registration form filled in consistently
pub fn registration(full_name: &str, email: &str) -> RegistrationRequest {
    RegistrationRequest {
        full_name: full_name.to_string(),
        email: email.to_string(),
        password: PASSWORD.to_string(),
        confirm_password: PASSWORD.to_string(),
    }
}

/// Register a user, leaving them signed in
pub async fn register(service: &LedgerService, full_name: &str, email: &str) -> Result<User> {
    Ok(service.register(registration(full_name, email)).await?)
}
