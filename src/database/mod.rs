pub mod connection;
pub mod operations;
pub mod store;

pub use operations::PostgresStore;
pub use store::ReadingStore;
