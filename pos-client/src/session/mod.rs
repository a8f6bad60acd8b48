//! Client-side session: token storage, expiry checks, renewal and the
//! manager that ties them to outbound requests.

pub mod claims;
pub mod clock;
pub mod manager;
pub mod navigator;
pub mod single_flight;
pub mod state;
pub mod storage;

pub use claims::{Claims, UserId};
pub use clock::{Clock, SystemClock};
pub use manager::SessionManager;
pub use navigator::{Navigator, TracingNavigator};
pub use state::SessionState;
pub use storage::{FileTokenStore, MemoryTokenStore, TokenStore};
