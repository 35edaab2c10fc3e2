//! Operator preview sends.

use crate::error::Result;
use crate::notice::Notice;
use crate::settings::DEFAULT_DATE_FORMAT;
use crate::store::NotificationSender;
use crate::tags::{TemplateTags, format_date};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Subject used when the notice has none.
pub const DEFAULT_TEST_SUBJECT: &str =
    "Default Subject Message - Your Subscription is About to Renew or Expire";

/// Body used when the notice has none.
pub const DEFAULT_TEST_MESSAGE: &str = "**THIS IS A DEFAULT TEST MESSAGE - Notice message was not retrieved.**\n\nHello %name%,\n\nYour subscription for %subscription_name% will renew or expire on %expiration%.";

/// Sample value for `%name%`.
pub const SAMPLE_NAME: &str = "NAME GOES HERE";

/// Sample value for `%subscription_name%`.
pub const SAMPLE_SUBSCRIPTION_NAME: &str = "SUBSCRIPTION NAME";

/// A subject and body ready to send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedNotice {
    pub subject: String,
    pub body: String,
}

/// Renders notices with sample values and sends them to an operator.
#[derive(Clone)]
pub struct TestNoticeRenderer {
    sender: Arc<dyn NotificationSender>,
}

impl TestNoticeRenderer {
    pub fn new(sender: Arc<dyn NotificationSender>) -> Self {
        Self { sender }
    }

    /// Render with sample tag values. `today` fills `%expiration%`.
    ///
    /// An empty subject or message is replaced by the built-in test text.
    pub fn render_preview(notice: &Notice, today: DateTime<FixedOffset>) -> RenderedNotice {
        let subject = if notice.subject.is_empty() {
            DEFAULT_TEST_SUBJECT
        } else {
            notice.subject.as_str()
        };
        let message = if notice.message.is_empty() {
            DEFAULT_TEST_MESSAGE
        } else {
            notice.message.as_str()
        };

        let tags = TemplateTags::new()
            .set("name", SAMPLE_NAME)
            .set("subscription_name", SAMPLE_SUBSCRIPTION_NAME)
            .set("expiration", format_date(&today, DEFAULT_DATE_FORMAT));

        RenderedNotice {
            subject: tags.render(subject),
            body: tags.render(message),
        }
    }

    /// Render and send once to `to`. Delivery failures are returned.
    pub async fn send(
        &self,
        notice: &Notice,
        today: DateTime<FixedOffset>,
        to: &str,
    ) -> Result<RenderedNotice> {
        let rendered = Self::render_preview(notice, today);

        if let Err(e) = self.sender.send(to, &rendered.subject, &rendered.body).await {
            warn!(to = %to, error = %e, "Test notice delivery failed");
            return Err(e);
        }

        info!(to = %to, notice_type = %notice.notice_type, "Test notice sent");
        Ok(rendered)
    }
}
