use wbr_warc::{BodyStream, RecordHeaders};

/// A loaded capture: its metadata headers and a one-shot body.
#[derive(Debug)]
pub struct LoadedRecord {
    pub headers: RecordHeaders,
    pub body: BodyStream,
}

impl LoadedRecord {
    pub fn new(headers: RecordHeaders, body: BodyStream) -> Self {
        Self { headers, body }
    }

    pub fn into_parts(self) -> (RecordHeaders, BodyStream) {
        (self.headers, self.body)
    }
}
