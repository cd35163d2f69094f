//! Link management commands

mod create;
mod delete;
mod republish;
mod resolve;

pub use create::create_link;
pub use delete::delete_link;
pub use republish::republish_link;
pub use resolve::resolve_link;
