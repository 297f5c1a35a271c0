// SPDX-License-Identifier: MIT

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (identity records, keyed by internal id)
//! - Uniqueness indexes (provider id and email, keyed by the value itself)
//! - Sessions (OAuth-hop records with TTL)
//!
//! Uniqueness is enforced by the store, not by check-then-insert: the
//! index collections are written with create-only semantics, so two
//! concurrent creates for the same provider id or email cannot both
//! succeed.

use crate::db::collections;
use crate::error::AppError;
use crate::models::{SessionRecord, User};
use futures_util::{stream, StreamExt};
use serde::{Deserialize, Serialize};

const MAX_CONCURRENT_DB_OPS: usize = 50;
/// Upper bound per expired-session sweep; leftovers go to the next run.
const PURGE_BATCH_LIMIT: u32 = 400;

/// Outcome of an attempted identity creation.
///
/// `ProviderExists` means another request claimed the provider id first
/// (the caller should re-read and converge). `EmailExists` means the email
/// is already owned by a different identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateUserOutcome {
    Created,
    ProviderExists,
    EmailExists,
}

/// Entry in a uniqueness index collection, pointing back at the owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexRef {
    user_id: String,
}

enum InsertError {
    Exists,
    Other(AppError),
}

/// Firestore database client.
#[derive(Clone)]
pub struct Db {
    client: Option<firestore::FirestoreDb>,
}

impl Db {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated
        // connection to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user by internal id.
    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Look up a user by OAuth provider id via the uniqueness index.
    pub async fn find_user_by_google_id(&self, google_id: &str) -> Result<Option<User>, AppError> {
        let index: Option<IndexRef> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USER_PROVIDERS)
            .obj()
            .one(google_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let Some(index) = index else {
            return Ok(None);
        };

        let user = self.get_user(&index.user_id).await?;
        if user.is_none() {
            tracing::warn!(
                google_id,
                user_id = %index.user_id,
                "Provider index points at a missing user document"
            );
        }
        Ok(user)
    }

    /// Create a new identity together with its uniqueness index entries.
    ///
    /// The provider index insert is the linearization point: of two
    /// concurrent creates for the same provider id, exactly one observes
    /// `Created` and the other `ProviderExists`.
    pub async fn create_user(&self, user: &User) -> Result<CreateUserOutcome, AppError> {
        let google_id = user
            .google_id
            .as_deref()
            .ok_or_else(|| AppError::Database("new user must carry a provider id".to_string()))?;

        match self
            .insert_index(collections::USER_PROVIDERS, google_id, &user.id)
            .await
        {
            Ok(()) => {}
            Err(InsertError::Exists) => return Ok(CreateUserOutcome::ProviderExists),
            Err(InsertError::Other(e)) => return Err(e),
        }

        match self
            .insert_index(collections::USER_EMAILS, &user.email, &user.id)
            .await
        {
            Ok(()) => {}
            Err(InsertError::Exists) => {
                // Release the provider claim so a later attempt can retry.
                self.delete_doc(collections::USER_PROVIDERS, google_id)
                    .await
                    .ok();
                return Ok(CreateUserOutcome::EmailExists);
            }
            Err(InsertError::Other(e)) => {
                self.delete_doc(collections::USER_PROVIDERS, google_id)
                    .await
                    .ok();
                return Err(e);
            }
        }

        let _: () = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(CreateUserOutcome::Created)
    }

    /// Update an existing user document in place.
    pub async fn update_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete a user and its uniqueness index entries.
    ///
    /// Indexes go first: a partial failure may orphan the user document,
    /// but must never leave a claimed email without its user.
    pub async fn delete_user(&self, user: &User) -> Result<(), AppError> {
        if let Some(google_id) = user.google_id.as_deref() {
            self.delete_doc(collections::USER_PROVIDERS, google_id)
                .await?;
        }
        self.delete_doc(collections::USER_EMAILS, &user.email).await?;
        self.delete_doc(collections::USERS, &user.id).await?;
        Ok(())
    }

    // ─── Session Operations ──────────────────────────────────────

    /// Store a session record (keyed by its id).
    pub async fn put_session(&self, session: &SessionRecord) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::SESSIONS)
            .document_id(&session.id)
            .object(session)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Get a session record by id. TTL is enforced by the caller
    /// (`SessionStore`), which deletes expired records on read.
    pub async fn get_session(&self, session_id: &str) -> Result<Option<SessionRecord>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::SESSIONS)
            .obj()
            .one(session_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a session record.
    pub async fn delete_session(&self, session_id: &str) -> Result<(), AppError> {
        self.delete_doc(collections::SESSIONS, session_id).await
    }

    /// Query session records whose expiry is before `cutoff` (RFC 3339).
    pub async fn expired_sessions(&self, cutoff: &str) -> Result<Vec<SessionRecord>, AppError> {
        let cutoff = cutoff.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::SESSIONS)
            .filter(move |q| q.field("expires_at").less_than(cutoff.clone()))
            .limit(PURGE_BATCH_LIMIT)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete many sessions with bounded concurrency.
    pub async fn delete_sessions(&self, session_ids: &[String]) -> Result<(), AppError> {
        let client = self.get_client()?;

        stream::iter(session_ids.to_vec())
            .map(|id| async move {
                client
                    .fluent()
                    .delete()
                    .from(collections::SESSIONS)
                    .document_id(&id)
                    .execute()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))
            })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<(), AppError>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<()>, AppError>>()?;

        Ok(())
    }

    // ─── Internals ───────────────────────────────────────────────

    /// Insert an index document with create-only semantics.
    async fn insert_index(
        &self,
        collection: &str,
        key: &str,
        user_id: &str,
    ) -> Result<(), InsertError> {
        let index = IndexRef {
            user_id: user_id.to_string(),
        };

        let result: Result<(), firestore::errors::FirestoreError> = self
            .get_client()
            .map_err(InsertError::Other)?
            .fluent()
            .insert()
            .into(collection)
            .document_id(key)
            .object(&index)
            .execute()
            .await;

        result.map_err(|e| match e {
            firestore::errors::FirestoreError::DataConflictError(_) => InsertError::Exists,
            other => InsertError::Other(AppError::Database(other.to_string())),
        })
    }

    async fn delete_doc(&self, collection: &str, doc_id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collection)
            .document_id(doc_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
