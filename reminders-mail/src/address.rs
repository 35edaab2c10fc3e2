//! Email addresses.

use crate::{MailError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Email address with optional display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    pub email: String,
    pub name: Option<String>,
}

impl Address {
    pub fn new(email: impl Into<String>) -> Result<Self> {
        let email = email.into().trim().to_string();
        validate_email(&email)?;
        Ok(Self { email, name: None })
    }

    pub fn with_name(email: impl Into<String>, name: impl Into<String>) -> Result<Self> {
        let mut address = Self::new(email)?;
        address.name = Some(name.into());
        Ok(address)
    }

    /// Parse `"Name <email@example.com>"` or `"email@example.com"`.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();

        if let Some(start) = s.find('<')
            && let Some(end) = s.rfind('>')
            && start < end
        {
            let name = s[..start].trim().trim_matches('"');
            let email = &s[start + 1..end];

            return if name.is_empty() {
                Self::new(email)
            } else {
                Self::with_name(email, name)
            };
        }

        Self::new(s)
    }

    pub(crate) fn to_mailbox(&self) -> Result<lettre::message::Mailbox> {
        let email: lettre::Address = self.email.parse()?;
        Ok(lettre::message::Mailbox::new(self.name.clone(), email))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} <{}>", name, self.email),
            None => f.write_str(&self.email),
        }
    }
}

impl TryFrom<&str> for Address {
    type Error = MailError;

    fn try_from(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// One `@`, a non-empty local part and a dotted domain.
fn validate_email(email: &str) -> Result<()> {
    let invalid = || MailError::InvalidAddress(format!("'{}'", email));

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') || !domain.contains('.') {
        return Err(invalid());
    }
    if domain.starts_with('.') || domain.ends_with('.') {
        return Err(invalid());
    }
    Ok(())
}
