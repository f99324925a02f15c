pub mod health;
pub mod password_reset;
pub mod register;

pub use health::health_check;
pub use password_reset::{confirm_password_reset, request_password_reset};
pub use register::register;
