//! Triggering events and the object location they carry.

use aws_lambda_events::s3::S3Event;
use serde::{Deserialize, Serialize};

use crate::error::{FunctionError, FunctionResult};

/// A bucket and key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectLocation {
    pub bucket: String,
    pub key: String,
}

impl ObjectLocation {
    #[must_use]
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// `s3://bucket/key`.
    #[must_use]
    pub fn uri(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.key)
    }
}

/// EventBridge "Object Created" event from S3. Only the fields the handlers
/// read are modelled.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ObjectCreatedEvent {
    #[serde(default)]
    pub detail_type: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    pub detail: ObjectCreatedDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObjectCreatedDetail {
    pub bucket: BucketRef,
    pub object: ObjectRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BucketRef {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObjectRef {
    pub key: String,
}

impl ObjectCreatedEvent {
    /// The created object. EventBridge delivers keys unencoded.
    #[must_use]
    pub fn location(&self) -> ObjectLocation {
        ObjectLocation::new(&self.detail.bucket.name, &self.detail.object.key)
    }
}

/// The object named by the first record of an S3 notification, with the
/// key URL-decoded.
pub fn first_record_location(event: &S3Event) -> FunctionResult<ObjectLocation> {
    let record = event
        .records
        .first()
        .ok_or_else(|| FunctionError::invalid_event("notification has no records"))?;

    let bucket = record
        .s3
        .bucket
        .name
        .as_deref()
        .ok_or_else(|| FunctionError::invalid_event("record has no bucket name"))?;
    let key = record
        .s3
        .object
        .key
        .as_deref()
        .ok_or_else(|| FunctionError::invalid_event("record has no object key"))?;

    Ok(ObjectLocation::new(bucket, decode_key(key)?))
}

/// Decode an S3 notification key: `+` is a space and `%XX` is a byte.
pub fn decode_key(key: &str) -> FunctionResult<String> {
    let bytes = key.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                decoded.push(b' ');
                i += 1;
            }
            b'%' => {
                let byte = bytes
                    .get(i + 1..i + 3)
                    .filter(|hex| hex.iter().all(u8::is_ascii_hexdigit))
                    .and_then(|hex| std::str::from_utf8(hex).ok())
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                    .ok_or_else(|| {
                        FunctionError::invalid_event(format!("bad percent escape in key {key}"))
                    })?;
                decoded.push(byte);
                i += 3;
            }
            other => {
                decoded.push(other);
                i += 1;
            }
        }
    }

    String::from_utf8(decoded)
        .map_err(|_| FunctionError::invalid_event(format!("key {key} is not UTF-8 once decoded")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn decodes_spaces_and_escapes() {
        assert_eq!(
            decode_key("transcripts/visit+notes%282%29.json").unwrap(),
            "transcripts/visit notes(2).json"
        );
        assert_eq!(decode_key("transcripts/caf%C3%A9.json").unwrap(), "transcripts/café.json");
        assert_eq!(decode_key("plain/key.json").unwrap(), "plain/key.json");
    }

    #[test]
    fn rejects_truncated_escape() {
        assert!(decode_key("bad%2").is_err());
        assert!(decode_key("bad%zz").is_err());
        assert!(decode_key("bad%+f").is_err());
        assert!(decode_key("bad%-1").is_err());
    }

    #[test]
    fn eventbridge_event_parses() {
        let event: ObjectCreatedEvent = serde_json::from_value(serde_json::json!({
            "version": "0",
            "id": "17793124-05d4-b198-2fde-7ededc63b103",
            "detail-type": "Object Created",
            "source": "aws.s3",
            "account": "123456789012",
            "time": "2024-01-01T00:00:00Z",
            "region": "ca-central-1",
            "resources": ["arn:aws:s3:::audio-bucket"],
            "detail": {
                "version": "0",
                "bucket": { "name": "audio-bucket" },
                "object": { "key": "input/visit 1.wav", "size": 1024 },
                "reason": "PutObject"
            }
        }))
        .unwrap();

        assert_eq!(event.detail_type.as_deref(), Some("Object Created"));
        assert_eq!(
            event.location(),
            ObjectLocation::new("audio-bucket", "input/visit 1.wav")
        );
        assert_eq!(event.location().uri(), "s3://audio-bucket/input/visit 1.wav");
    }

    #[test]
    fn notification_record_is_decoded() {
        let event: S3Event = serde_json::from_value(serde_json::json!({
            "Records": [{
                "eventVersion": "2.1",
                "eventSource": "aws:s3",
                "awsRegion": "ca-central-1",
                "eventTime": "2024-01-01T00:00:00.000Z",
                "eventName": "ObjectCreated:Put",
                "userIdentity": { "principalId": "AWS:EXAMPLE" },
                "requestParameters": { "sourceIPAddress": "127.0.0.1" },
                "responseElements": {},
                "s3": {
                    "s3SchemaVersion": "1.0",
                    "configurationId": "summaries",
                    "bucket": {
                        "name": "audio-bucket",
                        "ownerIdentity": { "principalId": "EXAMPLE" },
                        "arn": "arn:aws:s3:::audio-bucket"
                    },
                    "object": {
                        "key": "transcripts/visit-1-wav.json",
                        "size": 2048,
                        "eTag": "0123456789abcdef",
                        "sequencer": "0A1B2C3D4E5F678901"
                    }
                }
            }]
        }))
        .unwrap();

        assert_eq!(
            first_record_location(&event).unwrap(),
            ObjectLocation::new("audio-bucket", "transcripts/visit-1-wav.json")
        );
    }

    #[test]
    fn empty_notification_is_invalid() {
        let event: S3Event = serde_json::from_value(serde_json::json!({ "Records": [] })).unwrap();
        assert!(matches!(
            first_record_location(&event),
            Err(FunctionError::InvalidEvent(_))
        ));
    }
}
