use axum::{
    extract::{FromRef, Query, State},
    response::Redirect,
    routing::{get, post},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthResponse, GoogleCallbackQuery, LoginRequest, PublicUser, RefreshRequest,
            SignupRequest,
        },
        google,
        jwt::{AuthUser, JwtKeys},
        password::{self, MIN_PASSWORD_LEN},
        repo::{OAuthState, User},
    },
    error::ApiError,
    response::MessageResponse,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
        .route("/auth/google", get(google_start))
        .route("/auth/google/callback", get(google_callback))
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn signed_pair(state: &AppState, user: &User) -> Result<AuthResponse, ApiError> {
    let keys = JwtKeys::from_ref(state);
    let access_token = keys.sign_access(user.id)?;
    let refresh_token = keys.sign_refresh(user.id)?;
    Ok(AuthResponse {
        success: true,
        user: PublicUser::from(user),
        access_token,
        refresh_token,
    })
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(mut payload): Json<SignupRequest>,
) -> Result<(axum::http::StatusCode, Json<AuthResponse>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();
    payload.name = payload.name.trim().to_string();

    if payload.name.chars().count() < 3 {
        return Err(ApiError::Validation(
            "Name must be atleast 3 characters long".into(),
        ));
    }
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::Validation("Invalid email address".into()));
    }
    if payload.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(
            "Password must be atleast 6 characters long".into(),
        ));
    }

    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::Duplicate("User"));
    }

    let hash = password::hash_password(&payload.password)?;
    let user = User::create_local(&state.db, &payload.name, &payload.email, &hash).await?;

    info!(user_id = %user.id, email = %user.email, "user signed up");
    Ok((axum::http::StatusCode::CREATED, Json(signed_pair(&state, &user)?)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::Validation("Invalid email address".into()));
    }

    let user = match User::find_by_email(&state.db, &payload.email).await? {
        Some(u) => u,
        None => {
            warn!(email = %payload.email, "login unknown email");
            return Err(ApiError::Unauthenticated("Invalid credentials"));
        }
    };

    // Google-only accounts have no password to check against.
    let Some(hash) = user.password_hash.as_deref() else {
        warn!(user_id = %user.id, "login attempt against google-only account");
        return Err(ApiError::Unauthenticated("Invalid credentials"));
    };

    if !password::verify_password(&payload.password, hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::Unauthenticated("Invalid credentials"));
    }

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(signed_pair(&state, &user)?))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|_| ApiError::Unauthenticated("Invalid or expired token"))?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or(ApiError::Unauthenticated("User not found"))?;

    Ok(Json(signed_pair(&state, &user)?))
}

/// Tokens are stateless, so logout is an acknowledgement; the client discards
/// its pair.
#[instrument]
pub async fn logout() -> Json<MessageResponse> {
    Json(MessageResponse::new("Logged out successfully"))
}

#[instrument(skip(state))]
pub async fn me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or(ApiError::Unauthenticated("Not authenticated"))?;

    Ok(Json(serde_json::json!({
        "success": true,
        "user": PublicUser::from(&user),
    })))
}

/// Kick off the Google consent flow. The csrf state and PKCE verifier are
/// parked in the database until the callback returns.
#[instrument(skip(state))]
pub async fn google_start(State(state): State<AppState>) -> Result<Redirect, ApiError> {
    let (url, csrf_token, pkce_verifier) = state.oauth.authorize_url();
    OAuthState::insert(&state.db, csrf_token.secret(), pkce_verifier.secret()).await?;
    Ok(Redirect::temporary(&url))
}

#[instrument(skip(state, query))]
pub async fn google_callback(
    State(state): State<AppState>,
    Query(query): Query<GoogleCallbackQuery>,
) -> Redirect {
    match run_google_callback(&state, query).await {
        Ok(response) => {
            let target = format!(
                "{}/dashboard#accessToken={}&refreshToken={}",
                state.config.frontend_origin, response.access_token, response.refresh_token
            );
            Redirect::temporary(&target)
        }
        Err(e) => {
            warn!(error = %e, "google callback failed");
            Redirect::temporary(&format!("{}/login", state.config.frontend_origin))
        }
    }
}

async fn run_google_callback(
    state: &AppState,
    query: GoogleCallbackQuery,
) -> Result<AuthResponse, ApiError> {
    if let Some(error) = query.error {
        warn!(%error, "google consent denied");
        return Err(ApiError::Unauthenticated("Google consent denied"));
    }
    let (code, csrf_state) = match (query.code, query.state) {
        (Some(code), Some(state)) => (code, state),
        _ => return Err(ApiError::Validation("missing code or state".into())),
    };

    let verifier = OAuthState::take(&state.db, &csrf_state)
        .await?
        .ok_or(ApiError::Unauthenticated("unknown or expired oauth state"))?;

    let tokens = state
        .oauth
        .exchange_code(&code, oauth2::PkceCodeVerifier::new(verifier))
        .await
        .map_err(ApiError::External)?;
    let profile = state
        .oauth
        .fetch_userinfo(&tokens.access_token)
        .await
        .map_err(ApiError::External)?;

    let user = google::resolve_google_user(&state.db, &profile, &tokens).await?;
    info!(user_id = %user.id, "google login");
    signed_pair(state, &user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_addresses() {
        assert!(is_valid_email("student@example.com"));
        assert!(is_valid_email("a.b+c@uni.edu"));
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("two@@example.com"));
        assert!(!is_valid_email("spaces in@example.com"));
        assert!(!is_valid_email("missing@tld"));
    }
}
