pub mod auth;
pub mod email;
pub mod password_policy;
pub mod password_reset;
pub mod redirect;
pub mod reset_token;

pub use email::{EmailSender, LogEmailSender, MemoryEmailSender};
pub use password_policy::PasswordPolicy;
pub use password_reset::PasswordResetService;
pub use redirect::RedirectValidator;
pub use reset_token::{ResetClaims, ResetTokenCodec};
