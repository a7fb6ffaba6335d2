use std::env;
use std::time::Duration;

use crate::models::group::SUPPORTED_STAGE_COUNTS;

/// 配置错误
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// 未配置时使用内存存储
    pub database_url: Option<String>,
    /// 配置后启用群组缓存和限流
    pub redis_url: Option<String>,
    /// 教师密码，明文或 bcrypt 哈希
    pub teacher_password: Option<String>,
    pub jwt_secret: String,
    pub jwt_expiration_secs: u64,
    pub stage_count: usize,
    pub server_host: String,
    pub server_port: u16,
    pub api_base_uri: String,
    pub rate_limit_window_secs: u64,
    pub rate_limit_requests: u32,
    /// 仅在反向代理之后部署时开启，限流才会读取 X-Real-IP / X-Forwarded-For
    pub trust_proxy_headers: bool,
    pub group_cache_ttl_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 从任意键值来源读取配置，空白值视为未设置
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let jwt_expiration_hours: u64 = parse_or(
            "JWT_EXPIRATION",
            get("JWT_EXPIRATION").map(|v| v.trim_end_matches('h').to_string()),
            12,
        )?;

        let stage_count: usize = parse_or("STAGE_COUNT", get("STAGE_COUNT"), 5)?;
        if !SUPPORTED_STAGE_COUNTS.contains(&stage_count) {
            return Err(ConfigError::Invalid {
                key: "STAGE_COUNT",
                value: stage_count.to_string(),
            });
        }

        let api_base_uri = match get("API_BASE_URI") {
            Some(base) => format!("/{}", base.trim_matches('/')),
            None => "/api".to_string(),
        };

        Ok(Config {
            database_url: get("DATABASE_URL"),
            redis_url: get("REDIS_URL"),
            teacher_password: get("TEACHER_PASSWORD"),
            jwt_secret: get("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?,
            jwt_expiration_secs: jwt_expiration_hours * 3600,
            stage_count,
            server_host: get("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            server_port: parse_or("SERVER_PORT", get("SERVER_PORT"), 8001)?,
            api_base_uri,
            rate_limit_window_secs: parse_or("RATE_LIMIT_WINDOW", get("RATE_LIMIT_WINDOW"), 60)?,
            rate_limit_requests: parse_or("RATE_LIMIT_REQUESTS", get("RATE_LIMIT_REQUESTS"), 300)?,
            trust_proxy_headers: parse_or(
                "TRUST_PROXY_HEADERS",
                get("TRUST_PROXY_HEADERS").map(|v| v.to_ascii_lowercase()),
                false,
            )?,
            group_cache_ttl_secs: parse_or("GROUP_CACHE_TTL", get("GROUP_CACHE_TTL"), 600)?,
        })
    }

    pub fn jwt_expiration(&self) -> Duration {
        Duration::from_secs(self.jwt_expiration_secs)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }
}

fn parse_or<T: std::str::FromStr>(
    key: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(v) => v.parse().map_err(|_| ConfigError::Invalid { key, value: v }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults() {
        let config = load(&[("JWT_SECRET", "s")]).unwrap();
        assert_eq!(config.stage_count, 5);
        assert_eq!(config.server_port, 8001);
        assert_eq!(config.api_base_uri, "/api");
        assert_eq!(config.jwt_expiration_secs, 12 * 3600);
        assert!(config.database_url.is_none());
        assert!(config.teacher_password.is_none());
        assert!(!config.trust_proxy_headers);
    }

    #[test]
    fn trust_proxy_headers_is_opt_in() {
        let config = load(&[("JWT_SECRET", "s"), ("TRUST_PROXY_HEADERS", "TRUE")]).unwrap();
        assert!(config.trust_proxy_headers);
        let config = load(&[("JWT_SECRET", "s"), ("TRUST_PROXY_HEADERS", "false")]).unwrap();
        assert!(!config.trust_proxy_headers);
        assert!(matches!(
            load(&[("JWT_SECRET", "s"), ("TRUST_PROXY_HEADERS", "yes")]),
            Err(ConfigError::Invalid { key: "TRUST_PROXY_HEADERS", .. })
        ));
    }

    #[test]
    fn jwt_secret_is_required() {
        assert!(matches!(load(&[]), Err(ConfigError::Missing("JWT_SECRET"))));
        assert!(matches!(
            load(&[("JWT_SECRET", "  ")]),
            Err(ConfigError::Missing("JWT_SECRET"))
        ));
    }

    #[test]
    fn stage_count_must_be_five_or_six() {
        let config = load(&[("JWT_SECRET", "s"), ("STAGE_COUNT", "6")]).unwrap();
        assert_eq!(config.stage_count, 6);
        assert!(matches!(
            load(&[("JWT_SECRET", "s"), ("STAGE_COUNT", "7")]),
            Err(ConfigError::Invalid { key: "STAGE_COUNT", .. })
        ));
    }

    #[test]
    fn blank_teacher_password_is_unset() {
        let config = load(&[("JWT_SECRET", "s"), ("TEACHER_PASSWORD", "   ")]).unwrap();
        assert!(config.teacher_password.is_none());
    }

    #[test]
    fn parses_overrides() {
        let config = load(&[
            ("JWT_SECRET", "s"),
            ("JWT_EXPIRATION", "2h"),
            ("API_BASE_URI", "v1/"),
            ("SERVER_PORT", "9000"),
        ])
        .unwrap();
        assert_eq!(config.jwt_expiration().as_secs(), 7200);
        assert_eq!(config.api_base_uri, "/v1");
        assert_eq!(config.server_port, 9000);
        assert!(load(&[("JWT_SECRET", "s"), ("SERVER_PORT", "x")]).is_err());
    }
}
