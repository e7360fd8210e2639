pub mod app_config;
pub mod database;
pub mod graph_repo;
pub mod memory;
pub mod redis_repo;

pub use database::DbClient;
pub use graph_repo::Neo4jClient;
pub use memory::{InMemoryCache, InMemoryDocumentStore, InMemoryGraph};
pub use redis_repo::RedisClient;
