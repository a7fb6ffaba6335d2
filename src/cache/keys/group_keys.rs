/// 群组缓存键前缀
const GROUP_ID_PREFIX: &str = "journal:group:";

/// 生成群组ID缓存键
pub fn group_id_key(group_id: &str) -> String {
    format!("{}{}", GROUP_ID_PREFIX, group_id)
}

/// 群组版本号键，每次写入或删除都会递增
pub fn group_generation_key(group_id: &str) -> String {
    format!("{}{}:gen", GROUP_ID_PREFIX, group_id)
}
