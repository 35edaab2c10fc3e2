//! Email delivery for membership reminders.
//!
//! Provides:
//! - Address parsing and validation
//! - Plain-text [`Email`] messages
//! - SMTP, logging and in-memory [`Transport`]s
//! - A retrying [`Mailer`] that implements the engine's `NotificationSender`
//!
//! ## Quick Start
//!
//! ```no_run
//! use reminders_mail::prelude::*;
//!
//! # async fn example() -> Result<()> {
//! let mailer = Mailer::smtp(SmtpConfig::new("smtp.example.com").credentials("club", "secret"))?
//!     .with_config(MailerConfig::default().from("Acme Club <club@example.com>")?);
//!
//! mailer
//!     .send_text("member@example.com", "Your Subscription is About to Renew", "Hello!")
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! In tests, [`MemoryTransport`] records messages instead of sending them:
//!
//! ```
//! use reminders_mail::prelude::*;
//!
//! # tokio_test::block_on(async {
//! let transport = MemoryTransport::new();
//! let mailer = Mailer::new(transport.clone());
//!
//! mailer.send_text("member@example.com", "Renewing", "Hello").await.unwrap();
//! assert_eq!(transport.sent().await.len(), 1);
//! # });
//! ```

mod address;
mod email;
mod error;
mod mailer;
mod transport;

pub use address::Address;
pub use email::Email;
pub use error::{MailError, Result};
pub use mailer::{Mailer, MailerConfig};
pub use transport::{
    LogTransport, MemoryTransport, SmtpConfig, SmtpSecurity, SmtpTransport, Transport,
};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::address::Address;
    pub use crate::email::Email;
    pub use crate::error::{MailError, Result};
    pub use crate::mailer::{Mailer, MailerConfig};
    pub use crate::transport::{
        LogTransport, MemoryTransport, SmtpConfig, SmtpSecurity, SmtpTransport, Transport,
    };
}
