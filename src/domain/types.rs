//! Shared domain enumerations and serde helpers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A mutable domain collection whose listings are cached and broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Events,
    Locations,
}

impl Collection {
    pub const ALL: [Collection; 2] = [Collection::Events, Collection::Locations];

    pub fn as_str(self) -> &'static str {
        match self {
            Collection::Events => "events",
            Collection::Locations => "locations",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serde adapter writing `time::Date` as `YYYY-MM-DD`.
pub mod calendar_date {
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _, ser::Error as _};
    use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

    pub(crate) const FORMAT: &[BorrowedFormatItem<'static>] =
        format_description!("[year]-[month]-[day]");

    pub fn serialize<S: Serializer>(date: &Date, serializer: S) -> Result<S::Ok, S::Error> {
        let text = date.format(FORMAT).map_err(S::Error::custom)?;
        serializer.serialize_str(&text)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Date, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Date::parse(raw.trim(), FORMAT).map_err(D::Error::custom)
    }

    /// Variant for `Option<Date>` fields.
    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};
        use time::Date;

        pub fn serialize<S: Serializer>(
            date: &Option<Date>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match date {
                Some(date) => super::serialize(date, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Date>, D::Error> {
            let raw = Option::<String>::deserialize(deserializer)?;
            raw.map(|value| {
                Date::parse(value.trim(), super::FORMAT).map_err(serde::de::Error::custom)
            })
            .transpose()
        }
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use time::macros::date;

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Dated {
        #[serde(with = "calendar_date")]
        date: time::Date,
    }

    #[test]
    fn collection_serializes_as_plural_name() {
        let json = serde_json::to_string(&Collection::Locations).expect("serialize");
        assert_eq!(json, "\"locations\"");
        assert_eq!(Collection::Events.to_string(), "events");
    }

    #[test]
    fn calendar_date_uses_iso_format() {
        let value = Dated {
            date: date!(2025 - 01 - 20),
        };
        let json = serde_json::to_string(&value).expect("serialize");
        assert_eq!(json, r#"{"date":"2025-01-20"}"#);

        let parsed: Dated = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, value);
    }

    #[test]
    fn calendar_date_rejects_other_formats() {
        let result = serde_json::from_str::<Dated>(r#"{"date":"20/01/2025"}"#);
        assert!(result.is_err());
    }
}
