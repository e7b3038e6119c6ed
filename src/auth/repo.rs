use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
///
/// `password_hash` is null for users that only ever signed in through Google;
/// the schema enforces that at least one credential is present.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub google_id: Option<String>,
    pub google_access_token: Option<String>,
    pub google_refresh_token: Option<String>,
    pub google_token_expires_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

const USER_COLUMNS: &str = "id, name, email, password_hash, google_id, \
     google_access_token, google_refresh_token, google_token_expires_at, \
     created_at, updated_at";

impl User {
    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_google_id(db: &PgPool, google_id: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE google_id = $1"
        ))
        .bind(google_id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Create a user with a hashed password (local signup).
    pub async fn create_local(
        db: &PgPool,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (name, email, password_hash) VALUES ($1, $2, $3) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Create a user from a Google profile (no local password).
    pub async fn create_from_google(
        db: &PgPool,
        name: &str,
        email: &str,
        google_id: &str,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (name, email, google_id) VALUES ($1, $2, $3) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(name)
        .bind(email)
        .bind(google_id)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Attach (or re-attach) a Google identity and its tokens to a user.
    pub async fn link_google(
        db: &PgPool,
        id: Uuid,
        google_id: &str,
        access_token: &str,
        refresh_token: Option<&str>,
        expires_at: Option<OffsetDateTime>,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET google_id = $2, google_access_token = $3, \
             google_refresh_token = COALESCE($4, google_refresh_token), \
             google_token_expires_at = $5, updated_at = now() \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(google_id)
        .bind(access_token)
        .bind(refresh_token)
        .bind(expires_at)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Persist a refreshed access token without touching the refresh token.
    pub async fn update_google_access_token(
        db: &PgPool,
        id: Uuid,
        access_token: &str,
        expires_at: Option<OffsetDateTime>,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE users SET google_access_token = $2, google_token_expires_at = $3, \
             updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(access_token)
        .bind(expires_at)
        .execute(db)
        .await?;
        Ok(())
    }
}

/// Pending OAuth handshakes: csrf state keyed, holding the PKCE verifier that
/// must be replayed at code exchange.
pub struct OAuthState;

impl OAuthState {
    pub async fn insert(db: &PgPool, state: &str, pkce_verifier: &str) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO oauth_states (state, pkce_verifier) VALUES ($1, $2)")
            .bind(state)
            .bind(pkce_verifier)
            .execute(db)
            .await?;
        Ok(())
    }

    /// Consume a pending handshake, returning its PKCE verifier. Entries
    /// older than ten minutes are treated as expired; stale rows are cleared
    /// on the way through.
    pub async fn take(db: &PgPool, state: &str) -> anyhow::Result<Option<String>> {
        sqlx::query("DELETE FROM oauth_states WHERE created_at < now() - interval '10 minutes'")
            .execute(db)
            .await?;
        let row: Option<(String,)> = sqlx::query_as(
            "DELETE FROM oauth_states WHERE state = $1 RETURNING pkce_verifier",
        )
        .bind(state)
        .fetch_optional(db)
        .await?;
        Ok(row.map(|(verifier,)| verifier))
    }
}
