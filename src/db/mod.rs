pub mod handle;
pub mod merge;
pub mod models;
pub mod store;

pub use handle::Db;
pub use store::ListingStore;
