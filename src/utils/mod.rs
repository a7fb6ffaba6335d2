use axum::Json;
use bcrypt::verify;
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::config::Config;

/// 统一的响应结构
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resp_data: Option<T>,
}

pub fn success_to_api_response<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        code: error_codes::SUCCESS,
        msg: "success".into(),
        resp_data: Some(data),
    })
}

pub fn error_to_api_response<T>(code: i32, msg: String) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        code,
        msg,
        resp_data: None,
    })
}

pub mod error_codes {
    pub const SUCCESS: i32 = 0;
    pub const VALIDATION_ERROR: i32 = 1000;
    pub const AUTH_FAILED: i32 = 1002;
    pub const NOT_FOUND: i32 = 1004;
    pub const RATE_LIMIT: i32 = 1005;
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const UNAVAILABLE: i32 = 5003;
}

/// 教师令牌中的角色
pub const TEACHER_ROLE: &str = "teacher";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,  // 主体
    pub role: String, // 角色
    pub exp: i64,     // 过期时间
    pub iat: i64,     // 签发时间
}

impl Claims {
    pub fn is_teacher(&self) -> bool {
        self.role == TEACHER_ROLE
    }
}

/// 签发教师令牌，返回令牌和过期时间戳
pub fn generate_teacher_token(config: &Config) -> Result<(String, i64), jsonwebtoken::errors::Error> {
    let now = Utc::now().timestamp();
    let expiration = now + config.jwt_expiration().as_secs() as i64;

    let claims = Claims {
        sub: TEACHER_ROLE.to_string(),
        role: TEACHER_ROLE.to_string(),
        exp: expiration,
        iat: now,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )?;

    Ok((token, expiration))
}

pub fn verify_token(token: &str, config: &Config) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}

/// 校验教师密码
///
/// 配置值为 bcrypt 哈希时用 bcrypt 校验，否则以常量时间比较两者的 SHA-256 摘要。
/// 未配置密码时一律失败。
pub fn verify_teacher_password(candidate: &str, configured: Option<&str>) -> bool {
    let Some(configured) = configured.filter(|c| !c.is_empty()) else {
        return false;
    };

    if is_bcrypt_hash(configured) {
        return verify(candidate.as_bytes(), configured).unwrap_or_else(|e| {
            tracing::error!("Configured teacher password hash is unusable: {}", e);
            false
        });
    }

    // 摘要长度固定，常量时间比较
    let candidate = Sha256::digest(candidate.as_bytes());
    let configured = Sha256::digest(configured.as_bytes());
    candidate.as_slice().ct_eq(configured.as_slice()).into()
}

fn is_bcrypt_hash(value: &str) -> bool {
    ["$2a$", "$2b$", "$2x$", "$2y$"]
        .iter()
        .any(|prefix| value.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config::from_lookup(|k| match k {
            "JWT_SECRET" => Some("test-secret".to_string()),
            _ => None,
        })
        .unwrap()
    }

    #[test]
    fn plain_password_check() {
        assert!(verify_teacher_password("profesor2024", Some("profesor2024")));
        assert!(!verify_teacher_password("profesor2025", Some("profesor2024")));
        assert!(!verify_teacher_password("", Some("profesor2024")));
        assert!(!verify_teacher_password("profesor2024 ", Some("profesor2024")));
        assert!(!verify_teacher_password("profesor", Some("profesor2024")));
    }

    #[test]
    fn missing_secret_never_grants_access() {
        assert!(!verify_teacher_password("anything", None));
        assert!(!verify_teacher_password("", None));
        assert!(!verify_teacher_password("", Some("")));
    }

    #[test]
    fn bcrypt_secret() {
        let hashed = bcrypt::hash("profesor2024", 4).unwrap();
        assert!(verify_teacher_password("profesor2024", Some(&hashed)));
        assert!(!verify_teacher_password("wrong", Some(&hashed)));
    }

    #[test]
    fn token_roundtrip() {
        let config = config();
        let (token, exp) = generate_teacher_token(&config).unwrap();
        let claims = verify_token(&token, &config).unwrap();
        assert!(claims.is_teacher());
        assert_eq!(claims.exp, exp);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let config = config();
        let (token, _) = generate_teacher_token(&config).unwrap();
        let other = Config {
            jwt_secret: "other".into(),
            ..config
        };
        assert!(verify_token(&token, &other).is_err());
    }
}
