//! `%tag%` substitution for notice templates.

use crate::subscriber::Subscriber;
use crate::settings::DEFAULT_DATE_FORMAT;
use chrono::{DateTime, FixedOffset};
use std::fmt::Write;

/// Resolved tag values for one recipient.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateTags {
    pairs: Vec<(&'static str, String)>,
}

impl TemplateTags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a tag. `tag` is the bare name, without `%`.
    pub fn set(mut self, tag: &'static str, value: impl Into<String>) -> Self {
        let value = value.into();
        match self.pairs.iter_mut().find(|(t, _)| *t == tag) {
            Some(slot) => slot.1 = value,
            None => self.pairs.push((tag, value)),
        }
        self
    }

    /// Value of a tag, if set.
    pub fn get(&self, tag: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(t, _)| *t == tag)
            .map(|(_, v)| v.as_str())
    }

    /// Tags for a subscriber.
    ///
    /// `%expiration%` uses `date_format` in the site's offset, or "none" when
    /// the subscription never expires.
    pub fn for_subscriber(
        subscriber: &Subscriber,
        site_name: &str,
        date_format: &str,
        offset: FixedOffset,
    ) -> Self {
        let name = if subscriber.first_name.is_empty() {
            subscriber.display_name.clone()
        } else {
            subscriber.first_name.clone()
        };

        let expiration = subscriber
            .expires_at
            .map(|at| format_date(&at.with_timezone(&offset), date_format))
            .unwrap_or_else(|| "none".to_string());

        let amount = subscriber
            .recurring_amount
            .map(|a| format!("{:.2}", a))
            .unwrap_or_default();

        Self::new()
            .set("name", name)
            .set("firstname", subscriber.first_name.clone())
            .set("lastname", subscriber.last_name.clone())
            .set("displayname", subscriber.display_name.clone())
            .set("username", subscriber.login.clone())
            .set("useremail", subscriber.email.clone())
            .set("subscription_name", subscriber.subscription_name.clone())
            .set("subscription_key", subscriber.subscription_key.clone())
            .set("expiration", expiration)
            .set("amount", amount)
            .set("sitename", site_name)
    }

    /// Replace every known `%tag%` in `template`. Unknown tags are kept as written.
    pub fn render(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find('%') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];

            match after.find('%') {
                Some(end) => match self.get(&after[..end]) {
                    Some(value) => {
                        out.push_str(value);
                        rest = &after[end + 1..];
                    }
                    None => {
                        // Keep the '%' and resume at the closing one, which may open the next tag.
                        out.push('%');
                        out.push_str(&after[..end]);
                        rest = &after[end..];
                    }
                },
                None => {
                    out.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }

        out.push_str(rest);
        out
    }
}

/// Format with a `strftime` pattern, falling back to the default pattern when
/// `pattern` is invalid.
pub fn format_date(at: &DateTime<FixedOffset>, pattern: &str) -> String {
    let mut out = String::new();
    if write!(out, "{}", at.format(pattern)).is_ok() {
        return out;
    }
    at.format(DEFAULT_DATE_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscriber::SubscriptionStatus;
    use chrono::{TimeZone, Utc};

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn test_render_known_tags() {
        let tags = TemplateTags::new().set("name", "Ada").set("expiration", "May 1, 2024");
        assert_eq!(
            tags.render("Hello %name%, see you %expiration%."),
            "Hello Ada, see you May 1, 2024."
        );
    }

    #[test]
    fn test_render_keeps_unknown_and_literal_percent() {
        let tags = TemplateTags::new().set("name", "Ada");
        assert_eq!(tags.render("100% sure %name%"), "100% sure Ada");
        assert_eq!(tags.render("%unknown% %name%"), "%unknown% Ada");
        assert_eq!(tags.render("trailing %"), "trailing %");
    }

    #[test]
    fn test_subscriber_tags() {
        let subscriber = Subscriber::new(7, "ada@example.com", SubscriptionStatus::Active)
            .with_login("ada")
            .with_name("Ada", "Lovelace")
            .with_display_name("Countess")
            .subscription(3, "Gold")
            .with_subscription_key("abc123")
            .with_amount(9.5)
            .expires_at(Utc.with_ymd_and_hms(2024, 3, 7, 12, 0, 0).unwrap());

        let tags = TemplateTags::for_subscriber(&subscriber, "Acme", "%B %-d, %Y", utc());
        let body = tags.render(
            "%name% %lastname% %displayname% %username% %useremail% \
             %subscription_name% %subscription_key% %expiration% %amount% %sitename%",
        );

        assert_eq!(
            body,
            "Ada Lovelace Countess ada ada@example.com Gold abc123 March 7, 2024 9.50 Acme"
        );
    }

    #[test]
    fn test_invalid_date_format_falls_back() {
        let at = Utc
            .with_ymd_and_hms(2024, 3, 7, 12, 0, 0)
            .unwrap()
            .with_timezone(&utc());
        assert_eq!(format_date(&at, "%Q"), "March 7, 2024");
        assert_eq!(format_date(&at, "%Y-%m-%d"), "2024-03-07");
    }

    #[test]
    fn test_name_falls_back_to_display_name() {
        let subscriber = Subscriber::new(7, "ada@example.com", SubscriptionStatus::Active)
            .with_display_name("Countess");
        let tags = TemplateTags::for_subscriber(&subscriber, "", "%Y", utc());

        assert_eq!(tags.get("name"), Some("Countess"));
        assert_eq!(tags.get("expiration"), Some("none"));
    }
}
