use anyhow::Context;
use oauth2::{
    basic::BasicClient, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken,
    PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, RefreshToken, Scope, TokenResponse,
    TokenUrl,
};
use serde::Deserialize;
use sqlx::PgPool;
use time::{Duration, OffsetDateTime};
use tracing::info;

use crate::auth::repo::User;
use crate::config::GoogleConfig;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";

const SCOPES: &[&str] = &[
    "openid",
    "email",
    "profile",
    "https://www.googleapis.com/auth/calendar.events",
];

/// Profile fields returned by Google's userinfo endpoint.
#[derive(Debug, Deserialize)]
pub struct GoogleUserInfo {
    pub sub: String, // Google's unique user ID
    pub email: String,
    pub name: String,
}

/// Token set obtained from a code exchange or a refresh.
#[derive(Debug, Clone)]
pub struct GoogleTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<OffsetDateTime>,
}

type ConfiguredClient = oauth2::Client<
    oauth2::basic::BasicErrorResponse,
    oauth2::basic::BasicTokenResponse,
    oauth2::basic::BasicTokenIntrospectionResponse,
    oauth2::StandardRevocableToken,
    oauth2::basic::BasicRevocationErrorResponse,
    oauth2::EndpointSet,
    oauth2::EndpointNotSet,
    oauth2::EndpointNotSet,
    oauth2::EndpointNotSet,
    oauth2::EndpointSet,
>;

/// Google authorization-code client with PKCE.
pub struct GoogleOAuth {
    client: ConfiguredClient,
    http_client: reqwest::Client,
}

impl GoogleOAuth {
    pub fn new(config: &GoogleConfig) -> anyhow::Result<Self> {
        let auth_url = AuthUrl::new(GOOGLE_AUTH_URL.to_string())?;
        let token_url = TokenUrl::new(GOOGLE_TOKEN_URL.to_string())?;
        let redirect = RedirectUrl::new(config.redirect_url.clone())?;

        let client = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_client_secret(ClientSecret::new(config.client_secret.clone()))
            .set_auth_uri(auth_url)
            .set_token_uri(token_url)
            .set_redirect_uri(redirect);

        Ok(Self {
            client,
            http_client: reqwest::Client::new(),
        })
    }

    /// Build the consent URL. `access_type=offline` + `prompt=consent` make
    /// Google hand back a refresh token.
    pub fn authorize_url(&self) -> (String, CsrfToken, PkceCodeVerifier) {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let mut request = self
            .client
            .authorize_url(CsrfToken::new_random)
            .set_pkce_challenge(pkce_challenge)
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent");
        for scope in SCOPES {
            request = request.add_scope(Scope::new((*scope).to_string()));
        }
        let (url, csrf_token) = request.url();

        (url.to_string(), csrf_token, pkce_verifier)
    }

    /// Exchange the authorization code for a token set.
    pub async fn exchange_code(
        &self,
        code: &str,
        pkce_verifier: PkceCodeVerifier,
    ) -> anyhow::Result<GoogleTokens> {
        let http_client = oauth2::reqwest::ClientBuilder::new()
            .redirect(oauth2::reqwest::redirect::Policy::none())
            .build()
            .context("build oauth http client")?;

        let token = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .set_pkce_verifier(pkce_verifier)
            .request_async(&http_client)
            .await
            .map_err(|e| anyhow::anyhow!("token exchange failed: {e:?}"))?;

        Ok(Self::into_tokens(&token))
    }

    /// Exchange a refresh token for a fresh access token.
    pub async fn refresh(&self, refresh_token: &str) -> anyhow::Result<GoogleTokens> {
        let http_client = oauth2::reqwest::ClientBuilder::new()
            .redirect(oauth2::reqwest::redirect::Policy::none())
            .build()
            .context("build oauth http client")?;

        let token = self
            .client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(&http_client)
            .await
            .map_err(|e| anyhow::anyhow!("token refresh failed: {e:?}"))?;

        Ok(Self::into_tokens(&token))
    }

    fn into_tokens(token: &oauth2::basic::BasicTokenResponse) -> GoogleTokens {
        let expires_at = token
            .expires_in()
            .map(|ttl| OffsetDateTime::now_utc() + Duration::seconds(ttl.as_secs() as i64));
        GoogleTokens {
            access_token: token.access_token().secret().clone(),
            refresh_token: token.refresh_token().map(|t| t.secret().clone()),
            expires_at,
        }
    }

    /// Fetch the authenticated user's profile.
    pub async fn fetch_userinfo(&self, access_token: &str) -> anyhow::Result<GoogleUserInfo> {
        let info = self
            .http_client
            .get(GOOGLE_USERINFO_URL)
            .bearer_auth(access_token)
            .send()
            .await
            .context("userinfo request")?
            .error_for_status()
            .context("userinfo status")?
            .json::<GoogleUserInfo>()
            .await
            .context("userinfo body")?;
        Ok(info)
    }
}

/// Resolve a Google profile to a local account the way the original login
/// flow did: match on google_id first, then link by email, else create.
/// Tokens are stored on every pass so reconnects pick up fresh credentials.
pub async fn resolve_google_user(
    db: &PgPool,
    profile: &GoogleUserInfo,
    tokens: &GoogleTokens,
) -> anyhow::Result<User> {
    let email = profile.email.trim().to_lowercase();

    let existing = match User::find_by_google_id(db, &profile.sub).await? {
        Some(user) => Some(user),
        None => User::find_by_email(db, &email).await?,
    };

    let user = match existing {
        Some(user) => user,
        None => {
            let created = User::create_from_google(db, &profile.name, &email, &profile.sub).await?;
            info!(user_id = %created.id, "created user from google profile");
            created
        }
    };

    User::link_google(
        db,
        user.id,
        &profile.sub,
        &tokens.access_token,
        tokens.refresh_token.as_deref(),
        tokens.expires_at,
    )
    .await
}
