pub mod api_client;
pub mod endpoints;
pub mod resources;
