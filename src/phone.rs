use std::future::Future;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

// US numbers: optional country digit, optional parens around the area code,
// optional space or dash between groups, surrounding whitespace ignored.
static US_PHONE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(?:[0-9](?: |-)?)?(?:\(?([0-9]{3})\)?|[0-9]{3})(?: |-)?(?:([0-9]{3})(?: |-)?([0-9]{4}))\s*$",
    )
    .expect("US phone pattern compiles")
});

#[derive(Debug, Clone, PartialEq, Eq)]
struct UsPhone<'a> {
    area: &'a str,
    prefix: &'a str,
    line: &'a str,
}

impl UsPhone<'_> {
    fn canonical(&self) -> String {
        format!("{}{}{}", self.area, self.prefix, self.line)
    }

    fn pretty(&self) -> String {
        format!("{}-{}-{}", self.area, self.prefix, self.line)
    }
}

fn match_us(value: &str) -> Option<UsPhone<'_>> {
    let captures = US_PHONE.captures(value)?;
    Some(UsPhone {
        area: captures.get(1)?.as_str(),
        prefix: captures.get(2)?.as_str(),
        line: captures.get(3)?.as_str(),
    })
}

fn is_canonical_us(value: &str) -> bool {
    value.len() == 10 && value.bytes().all(|b| b.is_ascii_digit())
}

fn is_international(value: &str) -> bool {
    value.starts_with('+')
}

/// Result of formatting a stored phone value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PhoneDisplay {
    pub display: Option<String>,
    /// Canonical value the stored field should be rewritten to, if it is not already.
    pub correction: Option<String>,
}

pub fn format_for_display(stored: Option<&str>) -> PhoneDisplay {
    let stored = match stored {
        Some(value) if !value.is_empty() => value,
        _ => return PhoneDisplay::default(),
    };

    if is_international(stored) {
        return PhoneDisplay {
            display: Some(stored.to_string()),
            correction: None,
        };
    }

    let Some(phone) = match_us(stored) else {
        return PhoneDisplay::default();
    };

    let correction = if is_canonical_us(stored) {
        None
    } else {
        Some(phone.canonical())
    };

    PhoneDisplay {
        display: Some(phone.pretty()),
        correction,
    }
}

/// Raw phone input classified for storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhoneInput {
    Absent,
    International(String),
    Us(String),
    /// Did not match the US pattern. Stored as the empty concatenation of the
    /// missing groups rather than rejected; see DESIGN.md.
    Unrecognized,
}

impl PhoneInput {
    pub fn parse(raw: Option<&str>) -> Self {
        let raw = match raw {
            Some(value) if !value.is_empty() => value,
            _ => return Self::Absent,
        };

        if is_international(raw) {
            let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
            return Self::International(format!("+{digits}"));
        }

        match match_us(raw) {
            Some(phone) => Self::Us(phone.canonical()),
            None => Self::Unrecognized,
        }
    }

    pub fn into_stored(self) -> Option<String> {
        match self {
            Self::Absent => None,
            Self::International(value) | Self::Us(value) => Some(value),
            Self::Unrecognized => Some(String::new()),
        }
    }
}

/// Value to persist for a raw phone input.
pub fn set_from_input(raw: Option<&str>) -> Option<String> {
    let input = PhoneInput::parse(raw);
    if input == PhoneInput::Unrecognized {
        warn!(input = raw.unwrap_or_default(), "phone input did not match US format");
    }
    input.into_stored()
}

/// Persists a single phone field on the volunteer's underlying record.
pub trait PhoneStore: Send + Sync + 'static {
    fn update_phone(
        &self,
        volunteer_id: Uuid,
        phone: &str,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;
}

#[derive(Debug)]
pub struct PhoneRead {
    pub display: Option<String>,
    /// Pending correction write. Dropping the handle does not cancel it.
    pub correction: Option<JoinHandle<()>>,
}

/// Formats stored phones and heals legacy values in the background.
#[derive(Debug)]
pub struct PhoneNormalizer<S> {
    store: Arc<S>,
}

impl<S> Clone for PhoneNormalizer<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: PhoneStore> PhoneNormalizer<S> {
    pub fn new(store: S) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// Must be called from within a tokio runtime.
    pub fn display(&self, volunteer_id: Uuid, stored: Option<&str>) -> PhoneRead {
        let PhoneDisplay {
            display,
            correction,
        } = format_for_display(stored);

        let correction = correction.map(|canonical| {
            self.correct(volunteer_id, stored.unwrap_or_default().to_string(), canonical)
        });

        PhoneRead {
            display,
            correction,
        }
    }

    pub fn correct(&self, volunteer_id: Uuid, previous: String, canonical: String) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            match store.update_phone(volunteer_id, &canonical).await {
                Ok(()) => info!(%volunteer_id, "phone number {previous} corrected to {canonical}"),
                Err(err) => warn!(%volunteer_id, error = %err, "failed to correct phone number {previous}"),
            }
        })
    }
}
