mod file;
mod mem;
mod postgres;

pub use file::FileStore;
pub use mem::MemStore;
pub use postgres::PostgresStore;
