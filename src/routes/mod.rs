pub mod api;
pub mod health;

pub use api::get_api_routes;
