//! Encoding for the status select on App Home inbox items.
//!
//! Each option value carries the owning team and message timestamp so an
//! interaction payload is enough to find the record it refers to.

/// The two states offered by the status select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChoice {
    Open,
    Complete,
}

impl StatusChoice {
    fn flag(self) -> &'static str {
        match self {
            StatusChoice::Open => "0",
            StatusChoice::Complete => "1",
        }
    }
}

/// A decoded option value: which message, and which state was selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusValue {
    pub team_id: String,
    pub message_ts: String,
    pub choice: StatusChoice,
}

const VALUE_PREFIX: &str = "value-";

impl StatusValue {
    /// Builds the option value for one select entry, e.g.
    /// `value-T0AAA-1700000000.000100-1`.
    pub fn encode(team_id: &str, message_ts: &str, choice: StatusChoice) -> String {
        format!("{}{}-{}-{}", VALUE_PREFIX, team_id, message_ts, choice.flag())
    }

    /// Parses an option value back into its parts. Returns `None` for
    /// anything that did not come out of [`encode`].
    ///
    /// Team ids and message timestamps never contain `-`, so splitting on
    /// the last two dashes is unambiguous.
    ///
    /// [`encode`]: StatusValue::encode
    pub fn parse(value: &str) -> Option<StatusValue> {
        let rest = value.strip_prefix(VALUE_PREFIX)?;
        let (head, flag) = rest.rsplit_once('-')?;
        let choice = match flag {
            "0" => StatusChoice::Open,
            "1" => StatusChoice::Complete,
            _ => return None,
        };
        let (team_id, message_ts) = head.split_once('-')?;
        if team_id.is_empty() || message_ts.is_empty() {
            return None;
        }
        Some(StatusValue {
            team_id: team_id.to_string(),
            message_ts: message_ts.to_string(),
            choice,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_then_parse_round_trips() {
        let value = StatusValue::encode("T0AAA", "1700000000.000100", StatusChoice::Complete);
        assert_eq!(value, "value-T0AAA-1700000000.000100-1");

        let parsed = StatusValue::parse(&value).unwrap();
        assert_eq!(parsed.team_id, "T0AAA");
        assert_eq!(parsed.message_ts, "1700000000.000100");
        assert_eq!(parsed.choice, StatusChoice::Complete);
    }

    #[test]
    fn open_flag_parses() {
        let parsed = StatusValue::parse("value-T1-1700000000.000100-0").unwrap();
        assert_eq!(parsed.choice, StatusChoice::Open);
    }

    #[test]
    fn rejects_malformed_values() {
        assert_eq!(StatusValue::parse(""), None);
        assert_eq!(StatusValue::parse("garbage"), None);
        assert_eq!(StatusValue::parse("value-"), None);
        assert_eq!(StatusValue::parse("value-T1-1"), None);
        assert_eq!(StatusValue::parse("value-T1-100.1-2"), None);
        assert_eq!(StatusValue::parse("value--100.1-1"), None);
    }
}
