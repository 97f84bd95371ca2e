use reqwest::Client;
use serde_json::Value;

use crate::error::UpstreamError;

const FORECAST_URL: &str = "https://api.weatherapi.com/v1/forecast.json";
const SEVERE_CONDITIONS: [&str; 3] = ["Thunderstorm", "Tornado", "Extreme"];

pub struct WeatherClient {
    client: Client,
    api_key: String,
}

impl WeatherClient {
    pub fn new(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
        }
    }

    /// Five-day forecast with air quality and alerts, passed through as-is.
    pub async fn forecast(&self, latitude: f64, longitude: f64) -> Result<Value, UpstreamError> {
        let query = format!("{},{}", latitude, longitude);
        let res = self
            .client
            .get(FORECAST_URL)
            .query(&[
                ("key", self.api_key.as_str()),
                ("q", query.as_str()),
                ("days", "5"),
                ("aqi", "yes"),
                ("alerts", "yes"),
            ])
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(UpstreamError::Status {
                status: res.status().as_u16(),
                body: res.text().await.unwrap_or_default(),
            });
        }
        Ok(res.json().await?)
    }
}

pub fn current_condition(forecast: &Value) -> &str {
    forecast["current"]["condition"]["text"]
        .as_str()
        .unwrap_or("Clear")
}

pub fn is_severe(condition: &str) -> bool {
    SEVERE_CONDITIONS.contains(&condition)
}
