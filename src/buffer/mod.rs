pub mod store;
pub mod tag;

pub use store::LogBuffer;
pub use tag::TagAllocator;
