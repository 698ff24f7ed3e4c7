//! Current weather for the dashboard header (OpenWeatherMap).

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use vigitva_config::WeatherConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Weather {
    pub location: String,
    pub temperature: i64,
    pub description: String,
    pub icon: String,
    pub humidity: i64,
    /// km/h
    pub wind_speed: i64,
}

/// Map an OpenWeatherMap `/data/2.5/weather` body. `None` when a field is
/// missing.
pub fn parse_weather(json: &serde_json::Value) -> Option<Weather> {
    let current = json["weather"].get(0)?;
    Some(Weather {
        location: json["name"].as_str()?.to_string(),
        temperature: json["main"]["temp"].as_f64()?.round() as i64,
        description: current["description"].as_str()?.to_string(),
        icon: current["icon"].as_str()?.to_string(),
        humidity: json["main"]["humidity"].as_f64()?.round() as i64,
        wind_speed: (json["wind"]["speed"].as_f64()? * 3.6).round() as i64,
    })
}

pub struct WeatherClient {
    base_url: String,
    city: String,
    api_key: SecretString,
    client: reqwest::Client,
}

impl WeatherClient {
    /// `None` unless the feature is enabled and a key is set.
    pub fn from_config(cfg: &WeatherConfig) -> Option<Self> {
        if !cfg.enabled {
            return None;
        }
        let key = cfg.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())?;
        let client = match reqwest::Client::builder().timeout(Duration::from_secs(10)).build() {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(error = %e, "Weather client unavailable");
                return None;
            }
        };
        Some(Self {
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            city: cfg.city.clone(),
            api_key: SecretString::from(key.to_string()),
            client,
        })
    }

    /// Any failure is logged and reported as `None`.
    pub async fn current(&self) -> Option<Weather> {
        let url = format!("{}/data/2.5/weather", self.base_url);
        let result = self
            .client
            .get(&url)
            .query(&[
                ("q", self.city.as_str()),
                ("appid", self.api_key.expose_secret()),
                ("units", "metric"),
                ("lang", "fr"),
            ])
            .send()
            .await
            .and_then(|r| r.error_for_status());

        let json: serde_json::Value = match result {
            Ok(resp) => match resp.json().await {
                Ok(json) => json,
                Err(e) => {
                    tracing::warn!(error = %e, "Weather response unreadable");
                    return None;
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "Weather request failed");
                return None;
            }
        };
        parse_weather(&json)
    }
}
