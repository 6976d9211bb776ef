pub mod audit;
pub use audit::{SecurityAction, SecurityAudit};

pub mod auth;
pub use auth::{AuthError, AuthService, RegisteredUser, Registration};

pub mod lottery;
pub use lottery::{DrawView, LotteryError, LotteryService, RoundOutcome};
