//! Backend paths, relative to the configured API base URL.

pub const TOKEN_OBTAIN: &str = "token/";
pub const TOKEN_REFRESH: &str = "token/refresh/";
pub const REGISTER: &str = "auth/registro/";

pub const AUTH_ENDPOINTS: [&str; 3] = [TOKEN_OBTAIN, TOKEN_REFRESH, REGISTER];

pub const PRODUCTS: &str = "inventory/products/";
pub const SUPPLIERS: &str = "inventory/suppliers/";
pub const SALES: &str = "sales/sales/";
pub const USERS: &str = "users/";
pub const REPORTS: &str = "reports/";
pub const SETTINGS: &str = "settings/";
