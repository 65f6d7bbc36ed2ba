pub mod editor;
pub mod leads;
pub mod resolvers;
pub mod sidebar;
pub mod validate;
pub mod visibility;

pub use editor::*;
pub use leads::*;
pub use resolvers::*;
pub use sidebar::*;
pub use validate::*;
pub use visibility::*;
