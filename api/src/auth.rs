use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue},
    response::IntoResponse,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use noticeboard_shared::{LoginRequest, RefreshRequest, RegisterUser, TokenResponse, UserProfile};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    config::Config,
    data::user::{NewUser, Taken, UserRecord, UserRepository},
    db,
    error::AppError,
    extract::Json,
    AppState,
};

pub const ACCESS_COOKIE: &str = "access_token";

// ── JWT Claims ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,   // user id
    pub exp: usize, // expiry (unix timestamp)
    pub kind: TokenKind,
}

impl Claims {
    pub fn new(user_id: i64, kind: TokenKind, ttl: Duration) -> Self {
        let exp = (Utc::now() + ttl).timestamp().max(0) as usize;
        Self {
            sub: user_id,
            exp,
            kind,
        }
    }
}

fn ttl(kind: TokenKind, config: &Config) -> Duration {
    match kind {
        TokenKind::Access => Duration::minutes(config.access_token_ttl_minutes),
        TokenKind::Refresh => Duration::days(config.refresh_token_ttl_days),
    }
}

pub fn issue_token(user_id: i64, kind: TokenKind, config: &Config) -> Result<String, AppError> {
    let claims = Claims::new(user_id, kind, ttl(kind, config));
    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )?)
}

fn issue_pair(user_id: i64, config: &Config) -> Result<TokenResponse, AppError> {
    Ok(TokenResponse {
        access_token: issue_token(user_id, TokenKind::Access, config)?,
        refresh_token: issue_token(user_id, TokenKind::Refresh, config)?,
        token_type: "bearer".to_string(),
    })
}

/// Validates signature, expiry and token kind; returns the user id.
pub fn decode_token(token: &str, jwt_secret: &str, expected: TokenKind) -> Result<i64, AppError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized("Invalid token".to_string()))?;

    if data.claims.kind != expected {
        return Err(AppError::Unauthorized("Invalid token".to_string()));
    }

    Ok(data.claims.sub)
}

// ── Extract authenticated user from Authorization header or cookie ──

fn token_from_headers(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    if bearer.is_some() {
        return bearer;
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|pair| {
            pair.trim()
                .strip_prefix(ACCESS_COOKIE)
                .and_then(|rest| rest.strip_prefix('='))
        })
}

pub fn extract_user_id(headers: &HeaderMap, jwt_secret: &str) -> Result<i64, AppError> {
    let token = token_from_headers(headers).ok_or_else(AppError::unauthorized)?;
    decode_token(token, jwt_secret, TokenKind::Access)
}

/// Resolves the caller to an active user row.
pub async fn require_user(state: &AppState, headers: &HeaderMap) -> Result<UserRecord, AppError> {
    let user_id = extract_user_id(headers, &state.config.jwt_secret)?;

    db::run(&state.db, move |conn| {
        UserRepository::new(conn)
            .find_by_id(user_id)?
            .filter(|user| user.is_active)
            .ok_or_else(AppError::unauthorized)
    })
    .await
}

// ── Passwords ──

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))
}

pub fn verify_password(password: &str, hashed: &str) -> bool {
    PasswordHash::new(hashed)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

fn access_cookie(token: &str, config: &Config) -> Result<HeaderValue, AppError> {
    let max_age = config.access_token_ttl_minutes * 60;
    HeaderValue::from_str(&format!(
        "{ACCESS_COOKIE}={token}; HttpOnly; Path=/; SameSite=Lax; Max-Age={max_age}"
    ))
    .map_err(|e| AppError::Internal(e.to_string()))
}

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("Invalid username or password".to_string())
}

fn taken(field: Taken) -> AppError {
    AppError::BadRequest(field.message().to_string())
}

// ── Handlers ──

/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterUser>,
) -> Result<Json<UserProfile>, AppError> {
    if payload.username.trim().is_empty()
        || payload.email.trim().is_empty()
        || payload.password.is_empty()
    {
        return Err(AppError::BadRequest(
            "Username, email and password are required".to_string(),
        ));
    }
    if payload.password != payload.password2 {
        return Err(AppError::BadRequest("Passwords do not match".to_string()));
    }

    let profile = db::run(&state.db, move |conn| {
        let users = UserRepository::new(conn);

        if users.username_exists(&payload.username)? {
            return Err(taken(Taken::Username));
        }
        if users.email_exists(&payload.email)? {
            return Err(taken(Taken::Email));
        }

        let hashed_password = hash_password(&payload.password)?;
        let id = users
            .create(&NewUser {
                email: &payload.email,
                username: &payload.username,
                first_name: &payload.first_name,
                last_name: &payload.last_name,
                hashed_password: &hashed_password,
            })
            .map_err(|e| match Taken::from_error(&e) {
                Some(field) => taken(field),
                None => e.into(),
            })?;

        users
            .find_by_id(id)?
            .map(|user| user.profile())
            .ok_or_else(|| AppError::Internal(format!("user {id} missing after insert")))
    })
    .await?;

    info!(user_id = profile.id, username = %profile.username, "registered user");
    Ok(Json(profile))
}

/// POST /auth/login — verify credentials, return tokens and set the access cookie
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = db::run(&state.db, move |conn| {
        let user = UserRepository::new(conn)
            .find_by_username(&payload.username)?
            .filter(|user| user.is_active)
            .ok_or_else(invalid_credentials)?;

        if !verify_password(&payload.password, &user.hashed_password) {
            return Err(invalid_credentials());
        }
        Ok(user)
    })
    .await?;

    let tokens = issue_pair(user.id, &state.config)?;
    let cookie = access_cookie(&tokens.access_token, &state.config)?;

    info!(user_id = user.id, "user logged in");
    Ok(([(header::SET_COOKIE, cookie)], Json(tokens)))
}

/// POST /auth/refresh — trade a refresh token for a fresh pair
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = decode_token(
        &payload.refresh_token,
        &state.config.jwt_secret,
        TokenKind::Refresh,
    )?;

    let active = db::run(&state.db, move |conn| {
        Ok(UserRepository::new(conn)
            .find_by_id(user_id)?
            .is_some_and(|user| user.is_active))
    })
    .await?;
    if !active {
        return Err(AppError::unauthorized());
    }

    let tokens = issue_pair(user_id, &state.config)?;
    let cookie = access_cookie(&tokens.access_token, &state.config)?;
    Ok(([(header::SET_COOKIE, cookie)], Json(tokens)))
}

/// GET /auth/me — return current user
pub async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UserProfile>, AppError> {
    let user = require_user(&state, &headers).await?;
    Ok(Json(user.profile()))
}
