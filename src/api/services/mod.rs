pub mod redirect;

pub use redirect::{RedirectService, RedirectSettings, redirect_routes};
