use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::UpstreamError;

const NEARBY_URL: &str = "https://maps.googleapis.com/maps/api/place/nearbysearch/json";
pub const SEARCH_RADIUS_METERS: u32 = 5000;

#[derive(Debug, Deserialize)]
struct Place {
    name: Option<String>,
    vicinity: Option<String>,
    rating: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct NearbyResponse {
    #[serde(default)]
    results: Vec<Place>,
    status: Option<String>,
    error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NearbyService {
    pub name: String,
    pub address: String,
    pub rating: Option<f64>,
}

pub struct PlacesClient {
    client: Client,
    api_key: String,
}

impl PlacesClient {
    pub fn new(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
        }
    }

    pub async fn nearby(
        &self,
        latitude: f64,
        longitude: f64,
        keyword: &str,
        limit: usize,
    ) -> Result<Vec<NearbyService>, UpstreamError> {
        let location = format!("{},{}", latitude, longitude);
        let radius = SEARCH_RADIUS_METERS.to_string();
        let res = self
            .client
            .get(NEARBY_URL)
            .query(&[
                ("location", location.as_str()),
                ("radius", radius.as_str()),
                ("keyword", keyword),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(UpstreamError::Status {
                status: res.status().as_u16(),
                body: res.text().await.unwrap_or_default(),
            });
        }

        let body: NearbyResponse = res.json().await?;
        match body.status.as_deref() {
            None | Some("OK") | Some("ZERO_RESULTS") => {}
            Some(other) => {
                return Err(UpstreamError::Malformed(format!(
                    "places search returned {}: {}",
                    other,
                    body.error_message.unwrap_or_default()
                )))
            }
        }

        Ok(body
            .results
            .into_iter()
            .take(limit)
            .map(|p| NearbyService {
                name: p.name.unwrap_or_else(|| "Unknown Service".to_string()),
                address: p.vicinity.unwrap_or_else(|| "Address unavailable".to_string()),
                rating: p.rating,
            })
            .collect())
    }
}

/// Medical emergencies look for hospitals; everything else for emergency services.
pub fn search_keyword(emergency_type: &str) -> &'static str {
    if emergency_type.trim().eq_ignore_ascii_case("medical") {
        "hospital"
    } else {
        "emergency services"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn medical_searches_hospitals() {
        assert_eq!(search_keyword("Medical"), "hospital");
        assert_eq!(search_keyword("Fire"), "emergency services");
    }
}
