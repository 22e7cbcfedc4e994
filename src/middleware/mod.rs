pub mod cookies;
pub mod gate;
pub mod response;

pub use cookies::{CookiePolicy, RequestCredentials};
pub use gate::{gate_middleware, Gate, GateDecision};
pub use response::{ApiResponse, ApiResult};
