//! Scrubbing of contact details before notes are stored.

use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_REGEX: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").ok());

static PHONE_REGEX: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"\b\d{3}[-.]?\d{3}[-.]?\d{4}\b").ok());

/// What to scrub from note text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaskingConfig {
    pub mask_emails: bool,
    pub mask_phones: bool,
}

impl Default for MaskingConfig {
    fn default() -> Self {
        Self {
            mask_emails: true,
            mask_phones: true,
        }
    }
}

impl MaskingConfig {
    /// Store notes verbatim.
    pub fn disabled() -> Self {
        Self {
            mask_emails: false,
            mask_phones: false,
        }
    }

    pub fn mask_emails(mut self, mask: bool) -> Self {
        self.mask_emails = mask;
        self
    }

    pub fn mask_phones(mut self, mask: bool) -> Self {
        self.mask_phones = mask;
        self
    }
}

/// Replace contact details in `input` with placeholders.
///
/// ```
/// use reminders_audit::{mask_note, MaskingConfig};
///
/// let masked = mask_note("Sent to sam@example.com", &MaskingConfig::default());
/// assert_eq!(masked, "Sent to [EMAIL]");
/// ```
pub fn mask_note(input: &str, config: &MaskingConfig) -> String {
    let mut result = input.to_string();

    if config.mask_emails
        && let Some(re) = EMAIL_REGEX.as_ref()
    {
        result = re.replace_all(&result, "[EMAIL]").into_owned();
    }

    if config.mask_phones
        && let Some(re) = PHONE_REGEX.as_ref()
    {
        result = re.replace_all(&result, "[PHONE]").into_owned();
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_notes_untouched() {
        let note = "Renewal notice was emailed to the member.";
        assert_eq!(mask_note(note, &MaskingConfig::default()), note);
    }

    #[test]
    fn test_masks_contacts() {
        let masked = mask_note(
            "Bounced for t.ess+club@mail.example.org, call 555-123-4567",
            &MaskingConfig::default(),
        );
        assert_eq!(masked, "Bounced for [EMAIL], call [PHONE]");
    }

    #[test]
    fn test_selective_masking() {
        let config = MaskingConfig::default().mask_emails(false);
        assert_eq!(
            mask_note("a@example.com 555.123.4567", &config),
            "a@example.com [PHONE]"
        );
        assert_eq!(
            mask_note("a@example.com", &MaskingConfig::disabled()),
            "a@example.com"
        );
    }
}
