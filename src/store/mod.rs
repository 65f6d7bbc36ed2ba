pub mod document_cache;
pub mod mem;
pub mod postgres;
pub mod traits;

pub use document_cache::*;
pub use mem::*;
pub use postgres::*;
pub use traits::*;
