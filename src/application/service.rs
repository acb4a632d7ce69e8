use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tokio::sync::watch;

use crate::config::ServiceOptions;
use crate::domain::{
    compute_balance, required, sort_by_recency, Cents, Ledger, NewTransaction, Transaction,
    TransactionType, User, UserId, ValidationError, TRANSACTIONS_COLLECTION, USERS_COLLECTION,
};
use crate::identity::{AuthUser, IdentityProvider, LocalIdentityProvider};
use crate::storage::{self, record_fields, DocumentStore, SqliteDocumentStore, StoreError};

use super::AppError;

/// Application service providing the ledger operations.
/// This is the primary interface for any client (CLI, API, TUI, etc.).
///
/// Every operation is an independent round trip to the identity provider or
/// the document store; nothing is cached between calls.
pub struct LedgerService {
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn DocumentStore>,
}

/// Input collected by a registration form.
#[derive(Debug, Clone, Default)]
pub struct RegistrationRequest {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// Everything shown to a signed-in user.
pub struct Dashboard {
    pub user: AuthUser,
    pub profile: Option<User>,
    pub ledger: Ledger,
}

impl Dashboard {
    /// The profile's full name, or the account email when no profile exists.
    pub fn display_name(&self) -> &str {
        self.profile
            .as_ref()
            .map(|profile| profile.full_name.as_str())
            .unwrap_or(&self.user.email)
    }
}

impl LedgerService {
    /// Create a ledger service over the given identity provider and document store.
    pub fn new(identity: Arc<dyn IdentityProvider>, store: Arc<dyn DocumentStore>) -> Self {
        Self { identity, store }
    }

    /// Initialize a new database and open the service over it.
    pub async fn init(options: &ServiceOptions) -> Result<Self, AppError> {
        let pool = storage::connect(&options.create_url()).await?;
        storage::migrate(&pool).await?;
        Self::open(pool, options).await
    }

    /// Connect to an existing database.
    pub async fn connect(options: &ServiceOptions) -> Result<Self, AppError> {
        let pool = storage::connect(&options.connect_url()).await?;
        Self::open(pool, options).await
    }

    async fn open(pool: sqlx::SqlitePool, options: &ServiceOptions) -> Result<Self, AppError> {
        let identity = LocalIdentityProvider::load(pool.clone(), options.password_cost).await?;
        let store = SqliteDocumentStore::new(pool);
        Ok(Self::new(Arc::new(identity), Arc::new(store)))
    }

    // ========================
    // Account operations
    // ========================

    /// Create an account, sign it in and write its profile document.
    pub async fn register(&self, request: RegistrationRequest) -> Result<User, AppError> {
        let full_name = required("full name", &request.full_name)?;
        let email = required("email", &request.email)?;
        if request.password.is_empty() {
            return Err(ValidationError::MissingField("password").into());
        }
        if request.password != request.confirm_password {
            return Err(ValidationError::PasswordMismatch.into());
        }

        let account = self.identity.create_account(email, &request.password).await?;
        let user = User::new(account.uid, full_name, account.email);

        self.store
            .set_document(USERS_COLLECTION, &user.id, record_fields(&user)?)
            .await?;

        tracing::info!(uid = %user.id, "registered user");
        Ok(user)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, AppError> {
        let email = required("email", email)?;
        if password.is_empty() {
            return Err(ValidationError::MissingField("password").into());
        }
        Ok(self.identity.sign_in(email, password).await?)
    }

    pub async fn sign_out(&self) -> Result<(), AppError> {
        Ok(self.identity.sign_out().await?)
    }

    pub fn current_user(&self) -> Option<AuthUser> {
        self.identity.current_user()
    }

    /// The signed-in user, or `NotSignedIn`.
    pub fn require_user(&self) -> Result<AuthUser, AppError> {
        self.current_user().ok_or(AppError::NotSignedIn)
    }

    /// Receiver notified whenever the signed-in user changes.
    pub fn subscribe(&self) -> watch::Receiver<Option<AuthUser>> {
        self.identity.subscribe()
    }

    /// Fetch a user's profile document.
    pub async fn profile(&self, user_id: &str) -> Result<Option<User>, AppError> {
        let doc = self.store.get_document(USERS_COLLECTION, user_id).await?;
        Ok(doc.map(|doc| doc.into_record()).transpose()?)
    }

    // ========================
    // Transaction operations
    // ========================

    /// Record a new transaction for `user_id`.
    ///
    /// The description and amount are validated before anything is sent to
    /// the store. The owner must have a profile.
    pub async fn add_transaction(
        &self,
        user_id: &str,
        description: &str,
        amount: &str,
        kind: TransactionType,
    ) -> Result<Transaction, AppError> {
        let new = NewTransaction::parse(description, amount, kind)?;

        if self.profile(user_id).await?.is_none() {
            return Err(AppError::UserNotFound(user_id.to_string()));
        }

        let mut transaction = new.into_transaction(user_id.to_string(), Utc::now());
        transaction.id = self
            .store
            .add_document(TRANSACTIONS_COLLECTION, record_fields(&transaction)?)
            .await?;

        tracing::info!(
            uid = %user_id,
            id = %transaction.id,
            kind = %transaction.kind,
            amount_cents = transaction.amount_cents,
            "added transaction"
        );
        Ok(transaction)
    }

    /// Delete one of `user_id`'s transactions.
    ///
    /// Fails with `TransactionNotFound` if the id does not exist or belongs to
    /// another user, including when it was already deleted.
    pub async fn delete_transaction(&self, user_id: &str, id: &str) -> Result<(), AppError> {
        let transaction: Transaction = self
            .store
            .get_document(TRANSACTIONS_COLLECTION, id)
            .await?
            .ok_or_else(|| AppError::TransactionNotFound(id.to_string()))?
            .into_record()?;

        if transaction.user_id != user_id {
            tracing::warn!(uid = %user_id, id, "refused to delete another user's transaction");
            return Err(AppError::TransactionNotFound(id.to_string()));
        }

        match self.store.delete_document(TRANSACTIONS_COLLECTION, id).await {
            Ok(()) => {}
            Err(StoreError::NotFound { .. }) => {
                return Err(AppError::TransactionNotFound(id.to_string()));
            }
            Err(err) => return Err(err.into()),
        }

        tracing::info!(uid = %user_id, id, "deleted transaction");
        Ok(())
    }

    /// List a user's transactions, newest first.
    pub async fn list_transactions(&self, user_id: &str) -> Result<Vec<Transaction>, AppError> {
        let docs = self
            .store
            .query(
                TRANSACTIONS_COLLECTION,
                "userId",
                &Value::String(user_id.to_string()),
            )
            .await?;

        let mut transactions = docs
            .into_iter()
            .map(|doc| doc.into_record())
            .collect::<Result<Vec<Transaction>, _>>()?;
        sort_by_recency(&mut transactions);
        Ok(transactions)
    }

    /// Current balance for a user.
    pub async fn balance(&self, user_id: &str) -> Result<Cents, AppError> {
        let transactions = self.list_transactions(user_id).await?;
        Ok(compute_balance(&transactions)?)
    }

    /// A user's transactions together with derived totals.
    pub async fn ledger(&self, user_id: &str) -> Result<Ledger, AppError> {
        Ok(Ledger::new(self.list_transactions(user_id).await?)?)
    }

    /// Profile and ledger of the signed-in user.
    pub async fn dashboard(&self) -> Result<Dashboard, AppError> {
        let user = self.require_user()?;
        let profile = self.profile(&user.uid).await?;
        let ledger = self.ledger(&user.uid).await?;

        Ok(Dashboard {
            user,
            profile,
            ledger,
        })
    }

    /// Convenience for front ends: add a transaction for the signed-in user.
    pub async fn add_own_transaction(
        &self,
        description: &str,
        amount: &str,
        kind: TransactionType,
    ) -> Result<Transaction, AppError> {
        // Validation comes first so that bad input is reported even when signed out.
        NewTransaction::parse(description, amount, kind)?;
        let user = self.require_user()?;
        self.add_transaction(&user.uid, description, amount, kind)
            .await
    }

    /// Convenience for front ends: delete a transaction of the signed-in user.
    pub async fn delete_own_transaction(&self, id: &str) -> Result<(), AppError> {
        let user = self.require_user()?;
        self.delete_transaction(&user.uid, id).await
    }

    /// Id of the signed-in user, for reads scoped to them.
    pub fn current_user_id(&self) -> Result<UserId, AppError> {
        Ok(self.require_user()?.uid)
    }
}
