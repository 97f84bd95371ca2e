use reqwest::Client;
use serde_json::{json, Value};

use crate::error::UpstreamError;

const GENERATE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(client: Client, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// Immediate steps and safety tips for an emergency, as plain text.
    pub async fn emergency_guidance(
        &self,
        emergency_type: &str,
        latitude: f64,
        longitude: f64,
        message: &str,
    ) -> Result<String, UpstreamError> {
        let prompt = guidance_prompt(emergency_type, latitude, longitude, message);
        let text = self.generate_content(&prompt).await?;
        Ok(clean_response(&text))
    }

    async fn generate_content(&self, prompt: &str) -> Result<String, UpstreamError> {
        let url = format!("{}/{}:generateContent", GENERATE_URL, self.model);
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": prompt }]
            }]
        });

        let res = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(UpstreamError::Status {
                status: res.status().as_u16(),
                body: res.text().await.unwrap_or_default(),
            });
        }

        let json: Value = res.json().await?;

        // Text lives at candidates[0].content.parts[*].text
        let text: String = json["candidates"][0]["content"]["parts"]
            .as_array()
            .map(|parts| parts.iter().filter_map(|p| p["text"].as_str()).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(UpstreamError::Malformed("no text in Gemini response".into()));
        }
        Ok(text)
    }
}

fn guidance_prompt(emergency_type: &str, latitude: f64, longitude: f64, message: &str) -> String {
    format!(
        "Context:\n\
         An emergency situation has been reported. Below are the details:\n\n\
         - Emergency Type: {emergency_type}\n\
         - Location: Latitude {latitude}, Longitude {longitude}\n\
         - User Message: \"{message}\"\n\n\
         Instructions:\n\
         1. Provide clear, actionable steps the user should take immediately in context of local emergency services.\n\
         2. Share 2-3 essential safety tips tailored to this emergency type.\n\
         3. Respond concisely and in plain text format for quick understanding.\n\n\
         Please avoid using bold, italics, or unnecessary symbols in your response."
    )
}

/// Strips markdown emphasis and collapses runs of blank lines.
pub fn clean_response(text: &str) -> String {
    let without_stars = text.replace('*', "");
    without_stars
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleans_markdown_and_blank_lines() {
        let raw = "  **Stay calm.**\n\n\n1. Call *emergency* services\r\n\r\n2. Move away  \n";
        assert_eq!(
            clean_response(raw),
            "Stay calm.\n1. Call emergency services\n2. Move away"
        );
    }

    #[test]
    fn prompt_carries_the_report() {
        let prompt = guidance_prompt("Fire", 24.8, 67.0, "smoke in kitchen");
        assert!(prompt.contains("Emergency Type: Fire"));
        assert!(prompt.contains("Latitude 24.8, Longitude 67"));
        assert!(prompt.contains("\"smoke in kitchen\""));
    }
}
