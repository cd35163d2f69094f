mod config_gen;
mod link_management;

pub use config_gen::config_generate;
pub use link_management::{create_link, delete_link, republish_link, resolve_link};
