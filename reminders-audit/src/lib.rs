//! Member audit trail for membership reminders.
//!
//! Every reminder that goes out leaves a note on the member's record. This crate
//! stores those notes and implements the engine's `AuditLog` collaborator.
//!
//! # Features
//!
//! - **Audit entries** with ids, timestamps and free-form metadata
//! - **Backends**: JSON-lines file and in-memory
//! - **Masking** of email addresses and phone numbers in note text
//! - **Retention** by pruning entries past a maximum age
//!
//! # Quick Start
//!
//! ```no_run
//! use reminders_audit::*;
//! use reminders_core::AuditLog;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let audit = AuditLogger::file("audit.log");
//! audit.append_note(42, "Renewal notice was emailed to the member.").await?;
//!
//! for entry in audit.notes_for(42).await? {
//!     println!("{} {}", entry.timestamp, entry.note);
//! }
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod event;
pub mod logger;
pub mod masking;

pub use backend::*;
pub use event::*;
pub use logger::*;
pub use masking::*;
