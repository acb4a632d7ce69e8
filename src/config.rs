use crate::identity::LocalIdentityProvider;

/// Settings needed to open a ledger service over a local database.
#[derive(Debug, Clone)]
pub struct ServiceOptions {
    /// SQLite database file path
    pub database_path: String,
    /// bcrypt work factor for new passwords
    pub password_cost: u32,
}

impl ServiceOptions {
    pub fn new(database_path: impl Into<String>) -> Self {
        Self {
            database_path: database_path.into(),
            password_cost: LocalIdentityProvider::DEFAULT_COST,
        }
    }

    pub fn with_password_cost(mut self, cost: u32) -> Self {
        self.password_cost = cost;
        self
    }

    /// URL that opens the database, creating the file if needed.
    pub fn create_url(&self) -> String {
        format!("sqlite:{}?mode=rwc", self.database_path)
    }

    /// URL that opens an existing database.
    pub fn connect_url(&self) -> String {
        format!("sqlite:{}", self.database_path)
    }
}
