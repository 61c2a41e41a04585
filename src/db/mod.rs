pub mod memory;
pub mod postgres;
pub mod redis;
pub mod store;

pub use self::memory::MemoryWardrobeStore;
pub use self::postgres::{create_pool, PgWardrobeStore};
pub use self::redis::{create_redis_client, Cache, CacheKey, CacheWriterHandle};
pub use self::store::WardrobeStore;
