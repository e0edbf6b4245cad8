mod elasticsearch_storage;
mod memory_storage;

pub use elasticsearch_storage::{ElasticsearchConnection, ElasticsearchStore};
pub use memory_storage::{InMemoryConnection, InMemoryStore};
