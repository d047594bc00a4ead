use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Eq, PartialEq, Ord, PartialOrd, Hash, Clone, Debug, Serialize, Deserialize, Default)]
pub struct SheetUrl(pub String);

/// Exactly the POST body the sheet endpoint expects.
#[derive(Clone, Debug, Serialize, Deserialize, Default, Eq, PartialEq)]
pub struct RsvpForm {
    pub name: String,
    pub attendance: String,
    pub message: String,
}

/// One row of the remote store. The sheet may omit columns and add extra
/// ones, so every field is defaulted and unknown keys are ignored.
#[derive(Clone, Debug, Serialize, Deserialize, Default, Eq, PartialEq)]
pub struct RsvpRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub attendance: String,
    #[serde(default)]
    pub message: Option<String>,
    /// Assigned by the store on append; not used for rendering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl RsvpRecord {
    /// The text shown on the wall, iff there is any after trimming.
    pub fn wall_message(&self) -> Option<&str> {
        let message = self.message.as_deref()?.trim();
        if message.is_empty() {
            None
        } else {
            Some(message)
        }
    }
}

/// Guest-supplied text ends up rendered verbatim; angle brackets become
/// entities so nothing remote can smuggle markup in.
pub fn escape_markup(text: &str) -> String {
    text.replace('<', "&lt;").replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(message: Option<&str>) -> RsvpRecord {
        RsvpRecord {
            name: "Alice".to_string(),
            attendance: "yes".to_string(),
            message: message.map(str::to_string),
            timestamp: None,
        }
    }

    #[test]
    fn wall_message_requires_nonblank_text() {
        assert_eq!(record(Some("Can't wait!")).wall_message(), Some("Can't wait!"));
        assert_eq!(record(Some("  hi  ")).wall_message(), Some("hi"));
        assert_eq!(record(Some("   ")).wall_message(), None);
        assert_eq!(record(Some("")).wall_message(), None);
        assert_eq!(record(None).wall_message(), None);
    }

    #[test]
    fn form_serializes_to_fixed_body() {
        let form = RsvpForm {
            name: "Alice".to_string(),
            attendance: "yes".to_string(),
            message: "Can't wait!".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&form).unwrap(),
            r#"{"name":"Alice","attendance":"yes","message":"Can't wait!"}"#
        );
    }

    #[test]
    fn record_parses_leniently() {
        let parsed: RsvpRecord = serde_json::from_str(
            r#"{"timestamp":"2026-06-20T18:30:00Z","name":"Bob","attendance":"no","row":7}"#,
        )
        .unwrap();
        assert_eq!(parsed.name, "Bob");
        assert_eq!(parsed.message, None);
        assert!(parsed.timestamp.is_some());
    }

    #[test]
    fn escape_markup_neutralizes_angle_brackets() {
        assert_eq!(escape_markup("<b>Bob</b>"), "&lt;b&gt;Bob&lt;/b&gt;");
        assert_eq!(escape_markup("no markup"), "no markup");
    }
}
