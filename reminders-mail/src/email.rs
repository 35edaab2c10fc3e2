//! Plain-text reminder messages.

use crate::{Address, MailError, Result};
use lettre::message::header::ContentType;
use serde::{Deserialize, Serialize};

/// A single-recipient text message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email {
    pub from: Option<Address>,
    pub reply_to: Option<Address>,
    pub to: Option<Address>,
    pub subject: String,
    pub text: String,
}

impl Email {
    /// Message to `to`. Fails on an invalid address.
    pub fn to(to: &str, subject: impl Into<String>, text: impl Into<String>) -> Result<Self> {
        Ok(Self {
            to: Some(Address::parse(to)?),
            subject: subject.into(),
            text: text.into(),
            ..Default::default()
        })
    }

    pub fn from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    pub fn reply_to(mut self, reply_to: Address) -> Self {
        self.reply_to = Some(reply_to);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.from.is_none() {
            return Err(MailError::MissingField("from"));
        }
        if self.to.is_none() {
            return Err(MailError::MissingField("to"));
        }
        if self.subject.is_empty() {
            return Err(MailError::MissingField("subject"));
        }
        Ok(())
    }

    pub(crate) fn to_lettre(&self) -> Result<lettre::Message> {
        self.validate()?;
        let (Some(from), Some(to)) = (&self.from, &self.to) else {
            return Err(MailError::MissingField("from/to"));
        };

        let mut builder = lettre::Message::builder()
            .from(from.to_mailbox()?)
            .to(to.to_mailbox()?)
            .subject(self.subject.as_str())
            .header(ContentType::TEXT_PLAIN);

        if let Some(reply_to) = &self.reply_to {
            builder = builder.reply_to(reply_to.to_mailbox()?);
        }

        Ok(builder.body(self.text.clone())?)
    }
}
