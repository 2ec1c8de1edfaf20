pub mod engine;
pub mod mailer;

pub use engine::{InteractionCount, KioskEngine, KioskStats};
pub use mailer::OtpMailer;
