/// 限流计数键前缀
const RATE_LIMIT_PREFIX: &str = "journal:rate_limit:";

/// 按客户端 IP 生成限流键
pub fn rate_limit_key(ip: &str) -> String {
    format!("{}{}", RATE_LIMIT_PREFIX, ip)
}
