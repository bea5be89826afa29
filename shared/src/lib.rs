use serde::{Deserialize, Serialize};

// ── Auth ──

/// Public view of a notice or comment owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub is_staff: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterUser {
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub password: String,
    pub password2: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
}

// ── Notices ──

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notice {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub views: i64,
    pub created_at: String,
    pub updated_at: String,
    pub owner: User,
    pub like_cnt: i64,
    pub hate_cnt: i64,
    pub comment_cnt: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoticeDetail {
    #[serde(flatten)]
    pub notice: Notice,
    pub files: Vec<NoticeFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateNotice {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoticeFile {
    pub id: i64,
    pub notice_id: i64,
    pub name: String,
    pub size: i64,
    pub content_type: String,
    pub download_cnt: i64,
    pub created_at: String,
}

// ── Comments ──

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub notice_id: i64,
    pub owner: User,
    pub text: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateComment {
    pub text: String,
}

// ── Likes ──

/// A caller's vote on a notice together with the notice's totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LikeState {
    pub like: bool,
    pub hate: bool,
    pub like_cnt: i64,
    pub hate_cnt: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
