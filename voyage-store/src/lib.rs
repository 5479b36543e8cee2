pub mod app_config;
pub mod redis_repo;
pub mod search_cache;

pub use redis_repo::RedisClient;
pub use search_cache::{CachedSearchProvider, ResponseCache};
