pub mod common;
pub mod conformity;
pub mod crm;
pub mod document;
pub mod field;
pub mod query_params;
pub mod user_context;

pub use common::*;
pub use conformity::*;
pub use crm::*;
pub use document::*;
pub use field::*;
pub use query_params::*;
pub use user_context::*;
