use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use super::{AccessTokenProvider, ExternalProfile, ProfileSource, SourceError};

const PAGE_SIZE: &str = "300";

#[derive(Deserialize)]
struct Document {
    name: String,
    fields: Option<Map<String, Value>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    documents: Vec<Document>,
    next_page_token: Option<String>,
}

/// Reads profile documents from a Firestore collection over the REST API.
pub struct FirestoreProfileSource {
    client: Client,
    documents_url: Url,
    collection: String,
    tokens: AccessTokenProvider,
}

impl FirestoreProfileSource {
    pub fn new(
        client: Client,
        project_id: &str,
        tokens: AccessTokenProvider,
    ) -> Result<Self, SourceError> {
        let documents_url = Url::parse(&format!(
            "https://firestore.googleapis.com/v1/projects/{}/databases/(default)/documents",
            project_id
        ))
        .map_err(|e| SourceError::Malformed(e.to_string()))?;

        Ok(Self {
            client,
            documents_url,
            collection: "users".to_string(),
            tokens,
        })
    }

    fn collection_url(&self, uid: Option<&str>) -> Result<Url, SourceError> {
        let mut url = self.documents_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| SourceError::Malformed("documents url cannot be a base".into()))?;
            segments.push(&self.collection);
            if let Some(uid) = uid {
                segments.push(uid);
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl ProfileSource for FirestoreProfileSource {
    async fn fetch(&self, uid: &str) -> Result<Option<ExternalProfile>, SourceError> {
        let token = self.tokens.token().await?;
        let res = self
            .client
            .get(self.collection_url(Some(uid))?)
            .bearer_auth(token)
            .send()
            .await?;

        if res.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !res.status().is_success() {
            return Err(SourceError::Status {
                status: res.status().as_u16(),
                body: res.text().await.unwrap_or_default(),
            });
        }

        let doc: Document = res.json().await?;
        debug!("Fetched profile document {}", doc.name);
        profile_from_fields(doc.fields.as_ref()).map(Some)
    }

    async fn list_uids(&self) -> Result<Vec<String>, SourceError> {
        let mut uids = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let token = self.tokens.token().await?;
            let mut request = self
                .client
                .get(self.collection_url(None)?)
                .bearer_auth(token)
                .query(&[("pageSize", PAGE_SIZE), ("mask.fieldPaths", "__name__")]);
            if let Some(page) = &page_token {
                request = request.query(&[("pageToken", page.as_str())]);
            }

            let res = request.send().await?;
            if !res.status().is_success() {
                return Err(SourceError::Status {
                    status: res.status().as_u16(),
                    body: res.text().await.unwrap_or_default(),
                });
            }
            let page: ListResponse = res.json().await?;
            uids.extend(page.documents.iter().filter_map(|d| document_id(&d.name)));

            match page.next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }

        Ok(uids)
    }
}

fn document_id(name: &str) -> Option<String> {
    name.rsplit('/').next().filter(|id| !id.is_empty()).map(str::to_string)
}

pub(crate) fn profile_from_fields(
    fields: Option<&Map<String, Value>>,
) -> Result<ExternalProfile, SourceError> {
    let decoded = fields.map(decode_fields).unwrap_or_default();
    serde_json::from_value(Value::Object(decoded)).map_err(|e| SourceError::Malformed(e.to_string()))
}

fn decode_fields(fields: &Map<String, Value>) -> Map<String, Value> {
    fields
        .iter()
        .map(|(key, value)| (key.clone(), decode_value(value)))
        .collect()
}

/// Converts a typed Firestore value (`{"stringValue": ..}` and friends) to plain JSON.
fn decode_value(value: &Value) -> Value {
    let Some(typed) = value.as_object() else {
        return Value::Null;
    };

    if let Some(v) = typed.get("stringValue") {
        return v.clone();
    }
    if let Some(v) = typed.get("integerValue") {
        // 64-bit integers travel as strings
        return match v {
            Value::String(s) => s.parse::<i64>().map(Value::from).unwrap_or(Value::Null),
            other => other.clone(),
        };
    }
    if let Some(v) = typed.get("doubleValue") {
        return v.clone();
    }
    if let Some(v) = typed.get("booleanValue") {
        return v.clone();
    }
    if let Some(v) = typed.get("timestampValue") {
        return v.clone();
    }
    if let Some(v) = typed.get("geoPointValue") {
        return v.clone();
    }
    if let Some(v) = typed.get("mapValue") {
        let inner = v
            .get("fields")
            .and_then(Value::as_object)
            .map(decode_fields)
            .unwrap_or_default();
        return Value::Object(inner);
    }
    if let Some(v) = typed.get("arrayValue") {
        let values = v
            .get("values")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(decode_value).collect())
            .unwrap_or_default();
        return Value::Array(values);
    }
    Value::Null
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_typed_profile_fields() {
        let fields = json!({
            "fullName": {"stringValue": "Alice"},
            "batteryLevel": {"integerValue": "87"},
            "latitude": {"doubleValue": 24.86},
            "longitude": {"doubleValue": 67.01},
            "expoPushToken": {"stringValue": "ExponentPushToken[a]"},
            "phoneNumber": {"nullValue": null}
        });

        let profile = profile_from_fields(fields.as_object()).unwrap();

        assert_eq!(profile.full_name.as_deref(), Some("Alice"));
        assert_eq!(profile.battery_level, Some(87.0));
        assert_eq!(profile.latitude, Some(24.86));
        assert_eq!(profile.phone_number, None);
        assert_eq!(profile.expo_push_token.as_deref(), Some("ExponentPushToken[a]"));
    }

    #[test]
    fn decodes_nested_maps_and_arrays() {
        let value = json!({"mapValue": {"fields": {
            "tags": {"arrayValue": {"values": [{"stringValue": "a"}, {"booleanValue": true}]}}
        }}});
        assert_eq!(decode_value(&value), json!({"tags": ["a", true]}));
    }

    #[test]
    fn document_id_is_last_path_segment() {
        assert_eq!(
            document_id("projects/p/databases/(default)/documents/users/abc123"),
            Some("abc123".to_string())
        );
        assert_eq!(document_id("projects/p/documents/users/"), None);
    }
}
