use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub(crate) fn serialize_secret<S>(
    secret: &Option<SecretString>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match secret {
        Some(_) => serializer.serialize_str("[REDACTED]"),
        None => serializer.serialize_none(),
    }
}

pub(crate) fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    Ok(s.map(SecretString::from))
}

/// SQL pagination clause flavor required by the backend behind a data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Dialect {
    /// `LIMIT m OFFSET n`
    #[default]
    LimitOffset,
    /// `OFFSET n ROWS FETCH NEXT m ROWS ONLY`
    OffsetFetch,
}

impl Dialect {
    /// Dialect used by a data source, keyed by the server's data source type.
    pub fn for_data_source_type(source_type: &str) -> Self {
        if source_type.eq_ignore_ascii_case("oracle") {
            Dialect::OffsetFetch
        } else {
            Dialect::LimitOffset
        }
    }

    /// Render the pagination clause for one page.
    pub fn page_clause(&self, limit: usize, offset: usize) -> String {
        match self {
            Dialect::LimitOffset => format!("LIMIT {} OFFSET {}", limit, offset),
            Dialect::OffsetFetch => {
                format!("OFFSET {} ROWS FETCH NEXT {} ROWS ONLY", offset, limit)
            }
        }
    }

    /// Alias clause for the wrapped base query. Oracle rejects `AS` before a
    /// table alias and identifiers starting with an underscore.
    pub fn subquery_alias(&self) -> &'static str {
        match self {
            Dialect::LimitOffset => "AS _page",
            Dialect::OffsetFetch => "page_",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::LimitOffset => write!(f, "limit-offset"),
            Dialect::OffsetFetch => write!(f, "offset-fetch"),
        }
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "limit-offset" | "limit_offset" | "limit" => Ok(Dialect::LimitOffset),
            "offset-fetch" | "offset_fetch" | "fetch" | "oracle" => Ok(Dialect::OffsetFetch),
            other => Err(format!("Unknown dialect: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_from_data_source_type() {
        assert_eq!(Dialect::for_data_source_type("oracle"), Dialect::OffsetFetch);
        assert_eq!(Dialect::for_data_source_type("Oracle"), Dialect::OffsetFetch);
        assert_eq!(Dialect::for_data_source_type("pg"), Dialect::LimitOffset);
        assert_eq!(Dialect::for_data_source_type("mysql"), Dialect::LimitOffset);
    }

    #[test]
    fn test_page_clause() {
        assert_eq!(
            Dialect::LimitOffset.page_clause(100, 200),
            "LIMIT 100 OFFSET 200"
        );
        assert_eq!(
            Dialect::OffsetFetch.page_clause(100, 200),
            "OFFSET 200 ROWS FETCH NEXT 100 ROWS ONLY"
        );
    }

    #[test]
    fn test_dialect_parse_and_display() {
        assert_eq!("offset-fetch".parse::<Dialect>(), Ok(Dialect::OffsetFetch));
        assert_eq!("LIMIT_OFFSET".parse::<Dialect>(), Ok(Dialect::LimitOffset));
        assert!("sparql".parse::<Dialect>().is_err());
        assert_eq!(Dialect::OffsetFetch.to_string(), "offset-fetch");
    }

    #[test]
    fn test_dialect_serde() {
        let d: Dialect = serde_json::from_str("\"offset-fetch\"").unwrap();
        assert_eq!(d, Dialect::OffsetFetch);
    }
}
