//! Capture index records.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{TypeError, TypeResult};
use crate::query::OutputForm;
use crate::surt::canonicalize;

/// Field names of an 11-field CDX line, in wire order.
pub const CDX_FIELDS: [&str; 11] = [
    "urlkey",
    "timestamp",
    "original",
    "mimetype",
    "statuscode",
    "digest",
    "redirect",
    "robotflags",
    "length",
    "offset",
    "filename",
];

/// Placeholder for an absent CDX field.
const EMPTY: &str = "-";

/// Mimetype recorded for revisit captures.
pub const REVISIT_MIMETYPE: &str = "warc/revisit";

/// One capture index record.
///
/// Field values are kept verbatim as they appear in the index; absent
/// values are `"-"`. Entries are immutable once produced by a query.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CdxEntry {
    pub urlkey: String,
    pub timestamp: String,
    pub original: String,
    pub mimetype: String,
    pub statuscode: String,
    pub digest: String,
    pub redirect: String,
    pub robotflags: String,
    pub length: String,
    pub offset: String,
    pub filename: String,
    /// Collection or source tag of the index that produced this record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// URL to fetch live instead of reading stored bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_url: Option<String>,
    /// Marks a "currently live" capture (no time negotiation upstream).
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_live: bool,
}

impl CdxEntry {
    /// Build an entry standing in for an on-demand live capture.
    pub fn live(url: &str, timestamp: impl Into<String>) -> TypeResult<Self> {
        Ok(Self {
            urlkey: canonicalize(url)?,
            timestamp: timestamp.into(),
            original: url.to_string(),
            load_url: Some(url.to_string()),
            is_live: true,
            ..Self::blank()
        })
    }

    fn blank() -> Self {
        let dash = || EMPTY.to_string();
        Self {
            urlkey: dash(),
            timestamp: dash(),
            original: dash(),
            mimetype: dash(),
            statuscode: dash(),
            digest: dash(),
            redirect: dash(),
            robotflags: dash(),
            length: dash(),
            offset: dash(),
            filename: dash(),
            source: None,
            load_url: None,
            is_live: false,
        }
    }

    /// Parse one index line.
    ///
    /// Accepts 11-field CDX, legacy 9-field CDX (no robot flags or length),
    /// CDXJ (`urlkey timestamp {json}`) and full JSON objects.
    pub fn parse(line: &str) -> TypeResult<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Err(malformed("empty line", line));
        }

        if trimmed.starts_with('{') {
            let map: Map<String, Value> =
                serde_json::from_str(trimmed).map_err(|e| malformed(&e.to_string(), line))?;
            return Ok(Self::from_json_map(&map, None, None));
        }

        let mut head = trimmed.splitn(3, ' ');
        if let (Some(key), Some(ts), Some(rest)) = (head.next(), head.next(), head.next()) {
            if rest.starts_with('{') {
                let map: Map<String, Value> =
                    serde_json::from_str(rest).map_err(|e| malformed(&e.to_string(), line))?;
                return Ok(Self::from_json_map(&map, Some(key), Some(ts)));
            }
        }

        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        let owned = |i: usize| fields[i].to_string();
        match fields.len() {
            11 => Ok(Self {
                urlkey: owned(0),
                timestamp: owned(1),
                original: owned(2),
                mimetype: owned(3),
                statuscode: owned(4),
                digest: owned(5),
                redirect: owned(6),
                robotflags: owned(7),
                length: owned(8),
                offset: owned(9),
                filename: owned(10),
                ..Self::blank()
            }),
            9 => Ok(Self {
                urlkey: owned(0),
                timestamp: owned(1),
                original: owned(2),
                mimetype: owned(3),
                statuscode: owned(4),
                digest: owned(5),
                redirect: owned(6),
                offset: owned(7),
                filename: owned(8),
                ..Self::blank()
            }),
            n => Err(malformed(&format!("expected 9 or 11 fields, got {n}"), line)),
        }
    }

    fn from_json_map(map: &Map<String, Value>, key: Option<&str>, ts: Option<&str>) -> Self {
        let get = |names: &[&str]| -> String {
            names
                .iter()
                .find_map(|name| match map.get(*name) {
                    Some(Value::String(s)) => Some(s.clone()),
                    Some(Value::Number(n)) => Some(n.to_string()),
                    _ => None,
                })
                .unwrap_or_else(|| EMPTY.to_string())
        };

        let mut entry = Self {
            urlkey: key.map(str::to_string).unwrap_or_else(|| get(&["urlkey"])),
            timestamp: ts.map(str::to_string).unwrap_or_else(|| get(&["timestamp"])),
            original: get(&["original", "url"]),
            mimetype: get(&["mimetype", "mime"]),
            statuscode: get(&["statuscode", "status"]),
            digest: get(&["digest"]),
            redirect: get(&["redirect"]),
            robotflags: get(&["robotflags"]),
            length: get(&["length"]),
            offset: get(&["offset"]),
            filename: get(&["filename"]),
            ..Self::blank()
        };
        if let Some(Value::String(source)) = map.get("source") {
            entry.source = Some(source.clone());
        }
        entry
    }

    /// The 11 fields as `(name, value)` pairs in canonical order.
    pub fn items(&self) -> Vec<(&'static str, &str)> {
        CDX_FIELDS
            .iter()
            .map(|name| (*name, self.field(name).unwrap_or(EMPTY)))
            .collect()
    }

    /// Look up a field by name. Accepts CDXJ aliases (`url`, `mime`, `status`).
    pub fn field(&self, name: &str) -> Option<&str> {
        let value = match name {
            "urlkey" => &self.urlkey,
            "timestamp" => &self.timestamp,
            "original" | "url" => &self.original,
            "mimetype" | "mime" => &self.mimetype,
            "statuscode" | "status" => &self.statuscode,
            "digest" => &self.digest,
            "redirect" => &self.redirect,
            "robotflags" => &self.robotflags,
            "length" => &self.length,
            "offset" => &self.offset,
            "filename" => &self.filename,
            "source" => return self.source.as_deref(),
            "load_url" => return self.load_url.as_deref(),
            _ => return None,
        };
        Some(value.as_str())
    }

    /// Attach the tag of the index this record came from.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Byte offset of the stored record, if present.
    pub fn offset(&self) -> Option<u64> {
        parse_number(&self.offset)
    }

    /// Compressed length of the stored record, if present.
    pub fn length(&self) -> Option<u64> {
        parse_number(&self.length)
    }

    /// Storage file identifier, if present.
    pub fn filename(&self) -> Option<&str> {
        present(&self.filename)
    }

    /// Whether this record carries enough to locate stored bytes.
    pub fn has_location(&self) -> bool {
        self.filename().is_some() && self.offset().is_some()
    }

    /// Payload digest, if present.
    pub fn digest(&self) -> Option<&str> {
        present(&self.digest)
    }

    /// Whether the index marks this capture as a revisit.
    pub fn is_revisit(&self) -> bool {
        self.mimetype == REVISIT_MIMETYPE
    }

    /// The space-separated 11-field line.
    pub fn to_cdx_line(&self) -> String {
        self.items()
            .iter()
            .map(|(_, v)| *v)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// A JSON object keyed by CDX field name, plus `source` when set.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        for (name, value) in self.items() {
            map.insert(name.to_string(), Value::String(value.to_string()));
        }
        if let Some(source) = &self.source {
            map.insert("source".into(), Value::String(source.clone()));
        }
        Value::Object(map)
    }

    /// Render in the requested output form.
    pub fn render(&self, output: OutputForm) -> String {
        match output {
            OutputForm::Json => self.to_json().to_string(),
            OutputForm::Text | OutputForm::CdxObject => self.to_cdx_line(),
        }
    }
}

impl fmt::Display for CdxEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_cdx_line())
    }
}

impl FromStr for CdxEntry {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn present(value: &str) -> Option<&str> {
    match value {
        "" | EMPTY => None,
        v => Some(v),
    }
}

fn parse_number(value: &str) -> Option<u64> {
    present(value).and_then(|v| v.parse().ok())
}

fn malformed(reason: &str, line: &str) -> TypeError {
    TypeError::MalformedCdx {
        reason: reason.to_string(),
        line: line.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUPES_LINE: &str = "com,example)/ 20140127171200 http://example.com text/html 200 \
                              B2LTWWPUOYAH7UIPQ7ZUPQ4VMBSVC36A - - 1046 334 dupes.warc.gz";

    #[test]
    fn parse_eleven_fields_verbatim() {
        let entry = CdxEntry::parse(DUPES_LINE).unwrap();
        assert_eq!(
            entry.items(),
            vec![
                ("urlkey", "com,example)/"),
                ("timestamp", "20140127171200"),
                ("original", "http://example.com"),
                ("mimetype", "text/html"),
                ("statuscode", "200"),
                ("digest", "B2LTWWPUOYAH7UIPQ7ZUPQ4VMBSVC36A"),
                ("redirect", "-"),
                ("robotflags", "-"),
                ("length", "1046"),
                ("offset", "334"),
                ("filename", "dupes.warc.gz"),
            ]
        );
        assert_eq!(entry.to_cdx_line(), DUPES_LINE.split_whitespace().collect::<Vec<_>>().join(" "));
        assert_eq!(entry.offset(), Some(334));
        assert!(entry.has_location());
        assert!(!entry.is_revisit());
    }

    #[test]
    fn parse_nine_field_legacy_line() {
        let entry = CdxEntry::parse(
            "com,example)/ 20140127171251 http://example.com warc/revisit - \
             B2LTWWPUOYAH7UIPQ7ZUPQ4VMBSVC36A - 11875 dupes.warc.gz",
        )
        .unwrap();
        assert!(entry.is_revisit());
        assert_eq!(entry.length, "-");
        assert_eq!(entry.length(), None);
        assert_eq!(entry.offset(), Some(11875));
    }

    #[test]
    fn parse_cdxj_line() {
        let entry = CdxEntry::parse(
            r#"com,example)/ 20140127171200 {"url": "http://example.com", "mime": "text/html", "status": "200", "digest": "B2LT", "length": "1046", "offset": "334", "filename": "dupes.warc.gz"}"#,
        )
        .unwrap();
        assert_eq!(entry.urlkey, "com,example)/");
        assert_eq!(entry.original, "http://example.com");
        assert_eq!(entry.statuscode, "200");
        assert_eq!(entry.robotflags, "-");
    }

    #[test]
    fn json_render_parses_back() {
        let entry = CdxEntry::parse(DUPES_LINE).unwrap().with_source("dupes");
        let rendered = entry.render(OutputForm::Json);
        let back = CdxEntry::parse(&rendered).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn wrong_field_count_is_malformed() {
        let err = CdxEntry::parse("com,example)/ 2014 http://example.com").unwrap_err();
        assert!(matches!(err, TypeError::MalformedCdx { .. }));
    }

    #[test]
    fn live_entry_has_no_location() {
        let entry = CdxEntry::live("http://example.com/", "20140127171200").unwrap();
        assert_eq!(entry.urlkey, "com,example)/");
        assert_eq!(entry.load_url.as_deref(), Some("http://example.com/"));
        assert!(entry.is_live);
        assert!(!entry.has_location());
    }

    #[test]
    fn field_aliases() {
        let entry = CdxEntry::parse(DUPES_LINE).unwrap();
        assert_eq!(entry.field("mime"), Some("text/html"));
        assert_eq!(entry.field("status"), Some("200"));
        assert_eq!(entry.field("nope"), None);
    }
}
