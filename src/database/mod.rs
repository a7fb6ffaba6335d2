// 数据库模块
// 包含群组存储接口及其内存、Postgres 实现

pub mod memory;
pub mod postgres;
pub mod store;

// 重新导出常用类型，方便其他模块使用
pub use memory::MemoryGroupStore;
pub use postgres::PgGroupStore;
pub use store::{GroupStore, StoreError};
