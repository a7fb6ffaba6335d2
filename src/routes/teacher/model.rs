use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct TeacherLoginRequest {
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TeacherLoginResponse {
    pub success: bool,
    pub token: String,
    pub expires_at: i64,
}

#[derive(Debug, Serialize)]
pub struct CheckTokenResponse {
    pub role: String,
    pub expires_at: i64,
}
