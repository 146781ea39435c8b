use wbr_types::timestamp::{datetime_to_http_date, iso_date_to_datetime, timestamp_to_datetime};
use wbr_types::CdxEntry;
use wbr_warc::RecordHeaders;

use crate::error::LoadResult;

/// `<uri>; rel="<rel>"`
pub fn make_link(uri: &str, rel: &str) -> String {
    format!("<{uri}>; rel=\"{rel}\"")
}

/// Add the collection tag and the Memento `Link` / `Memento-Datetime`
/// headers to a loaded record.
///
/// Falls back to the entry's URL and timestamp when the record itself
/// carries no target URI or date.
pub fn decorate(headers: &mut RecordHeaders, entry: &CdxEntry) -> LoadResult<()> {
    headers.set("WARC-Coll", entry.source.clone().unwrap_or_default());

    let target = headers
        .get("WARC-Target-URI")
        .unwrap_or(&entry.original)
        .to_string();
    headers.set("Link", make_link(&target, "original"));

    let memento_dt = match headers.get("WARC-Date") {
        Some(date) => iso_date_to_datetime(date)?,
        None => timestamp_to_datetime(&entry.timestamp)?,
    };
    headers.set("Memento-Datetime", datetime_to_http_date(&memento_dt));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> CdxEntry {
        CdxEntry::parse("com,example)/ 20140127171200 http://example.com text/html 200 D - - 1 0 a.warc.gz")
            .unwrap()
    }

    #[test]
    fn adds_memento_headers() {
        let mut headers: RecordHeaders = [
            ("WARC-Target-URI", "http://example.com/"),
            ("WARC-Date", "2014-01-27T17:12:51Z"),
        ]
        .into_iter()
        .collect();
        decorate(&mut headers, &entry().with_source("dupes")).unwrap();

        assert_eq!(headers.get("WARC-Coll"), Some("dupes"));
        assert_eq!(headers.get("Link"), Some("<http://example.com/>; rel=\"original\""));
        assert_eq!(headers.get("Memento-Datetime"), Some("Mon, 27 Jan 2014 17:12:51 GMT"));
    }

    #[test]
    fn falls_back_to_entry() {
        let mut headers = RecordHeaders::new();
        decorate(&mut headers, &entry()).unwrap();
        assert_eq!(headers.get("WARC-Coll"), Some(""));
        assert_eq!(headers.get("Link"), Some("<http://example.com>; rel=\"original\""));
        assert_eq!(headers.get("Memento-Datetime"), Some("Mon, 27 Jan 2014 17:12:00 GMT"));
    }

    #[test]
    fn bad_warc_date_is_an_error() {
        let mut headers: RecordHeaders = [("WARC-Date", "yesterday")].into_iter().collect();
        assert!(decorate(&mut headers, &entry()).is_err());
    }
}
