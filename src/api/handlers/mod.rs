//! HTTP request handlers for the shortening service.

pub mod count;
pub mod health;
pub mod redirect;
pub mod shorten;
pub mod valid;

pub use count::count_handler;
pub use health::health_handler;
pub use redirect::redirect_handler;
pub use shorten::shorten_handler;
pub use valid::valid_handler;
