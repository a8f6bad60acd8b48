pub mod auth;
pub mod request;

pub use auth::{LoginRequest, RefreshRequest, RefreshResponse, RegistrationRequest, TokenPair};
pub use request::ApiRequest;
