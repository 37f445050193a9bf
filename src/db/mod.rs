pub mod guard;
pub mod pool;
pub mod schema;
pub mod service;

pub use schema::SchemaDescription;
pub use service::DatabaseService;
