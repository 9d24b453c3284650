use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::{Local, TimeZone};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tera::Context;

use crate::agent::Agent;
use crate::context::AgentContext;
use crate::errors::{AgentError, AgentResult, PromptError};
use crate::hub::AgentHub;
use crate::models::tool::ToolSchema;
use crate::prompt_set::agent_prompts_dir;
use crate::providers::base::{GenerateOptions, Provider};
use crate::registry::{tool_fn, ToolFn};
use crate::secrets::{get_secret, SecretsError};

pub const IP_API_HOST: &str = "http://ip-api.com";
pub const OPENWEATHER_HOST: &str = "https://api.openweathermap.org";

/// Where the user is, as resolved by IP geolocation or configured directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub city: String,
    pub state: String,
    pub country: String,
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    /// "City, State, Country" for prompt interpolation
    pub fn describe(&self) -> String {
        format!("{}, {}, {}", self.city, self.state, self.country)
    }
}

/// Resolve the user's location from their IP address.
pub async fn geolocate(client: &Client) -> Result<Location> {
    geolocate_from(client, IP_API_HOST).await
}

pub async fn geolocate_from(client: &Client, host: &str) -> Result<Location> {
    let url = format!("{}/json", host.trim_end_matches('/'));
    let data: Value = client.get(&url).send().await?.error_for_status()?.json().await?;

    let field = |key: &str| -> Result<String> {
        data.get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| anyhow!("Geolocation response missing '{}'", key))
    };
    let coord = |key: &str| -> Result<f64> {
        data.get(key)
            .and_then(Value::as_f64)
            .ok_or_else(|| anyhow!("Geolocation response missing '{}'", key))
    };

    Ok(Location {
        city: field("city")?,
        state: field("regionName")?,
        country: field("country")?,
        lat: coord("lat")?,
        lng: coord("lon")?,
    })
}

#[derive(Debug, Clone)]
pub struct WeatherConfig {
    pub host: String,
    pub api_key: String,
}

impl WeatherConfig {
    pub fn from_env() -> Result<Self, SecretsError> {
        Ok(WeatherConfig {
            host: OPENWEATHER_HOST.to_string(),
            api_key: get_secret("OPENWEATHER_API_KEY")?,
        })
    }
}

/// Current plus daily weather, as handed back by the one-call endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherData {
    pub current: Value,
    #[serde(default)]
    pub daily: Vec<Value>,
}

/// Keys that carry UNIX timestamps in the weather payload.
const TIMESTAMP_KEYS: &[&str] = &["dt", "sunrise", "sunset", "moonrise", "moonset"];

/// Convert UNIX timestamps in a weather object to human-readable datetimes,
/// in place, so the model sees text it can reason about.
pub fn humanize_timestamps(data: &mut Value) {
    let Some(object) = data.as_object_mut() else {
        return;
    };
    for key in TIMESTAMP_KEYS {
        let Some(seconds) = object.get(*key).and_then(Value::as_i64) else {
            continue;
        };
        if let Some(datetime) = Local.timestamp_opt(seconds, 0).single() {
            object.insert(
                key.to_string(),
                Value::String(datetime.format("%Y-%m-%d %H:%M:%S").to_string()),
            );
        }
    }
}

/// Fetch current and daily weather for the given coordinates.
pub async fn fetch_weather(
    client: &Client,
    config: &WeatherConfig,
    lat: f64,
    lng: f64,
) -> Result<WeatherData> {
    let url = format!("{}/data/3.0/onecall", config.host.trim_end_matches('/'));
    let response = client
        .get(&url)
        .query(&[
            ("lat", lat.to_string()),
            ("lon", lng.to_string()),
            ("exclude", "minutely,hourly,alerts".to_string()),
            ("appid", config.api_key.clone()),
            ("units", "imperial".to_string()),
        ])
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(anyhow!("Error fetching weather data: {}", response.status()));
    }

    let mut weather: WeatherData = response.json().await?;
    humanize_timestamps(&mut weather.current);
    for day in &mut weather.daily {
        humanize_timestamps(day);
    }
    Ok(weather)
}

/// Agent that turns raw weather data into a readable report.
pub struct WeatherAgent {
    agent: Arc<Agent>,
    client: Client,
    config: WeatherConfig,
    home: Location,
}

impl WeatherAgent {
    pub fn new(
        provider: Arc<dyn Provider>,
        context: Arc<AgentContext>,
        home: Location,
        config: WeatherConfig,
        hub: &AgentHub,
    ) -> Result<Arc<Self>, PromptError> {
        let agent = Agent::new(
            "weather",
            provider,
            &[agent_prompts_dir("weather")],
            context,
            hub,
        )?;
        Ok(Arc::new(WeatherAgent {
            agent,
            client: Client::new(),
            config,
            home,
        }))
    }

    /// Generate a morning weather report for the user's location.
    pub async fn gen_morning_report(&self) -> Result<String> {
        let weather =
            fetch_weather(&self.client, &self.config, self.home.lat, self.home.lng).await?;
        let current_weather = serde_json::to_string_pretty(&weather.current)?;
        let daily_weather =
            serde_json::to_string_pretty(weather.daily.first().unwrap_or(&Value::Null))?;

        let mut context = Context::new();
        context.insert("current_time", &Local::now().format("%I:%M %p").to_string());
        context.insert("current_weather", &current_weather);
        context.insert("daily_weather", &daily_weather);
        let user_prompt = self.agent.prompt_set().render("morning_report", &context)?;

        let messages = self.agent.make_initial_prompt(&user_prompt);
        let responses = self
            .agent
            .generate(&messages, &GenerateOptions::reasoning(2048))
            .await?;
        Ok(responses[0].content.trim().to_string())
    }

    /// Expose this agent as a tool another agent can call in-line.
    pub fn as_tool(self: &Arc<Self>) -> AgentResult<(ToolSchema, ToolFn)> {
        let schema = ToolSchema::builder("gen_morning_report")
            .description(
                "Generates a morning weather report from current and forecasted conditions.",
            )
            .build()?;
        let weather = self.clone();
        let func = tool_fn(move |_args| {
            let weather = weather.clone();
            async move {
                weather
                    .gen_morning_report()
                    .await
                    .map(Value::String)
                    .map_err(|e| AgentError::ExecutionError(e.to_string()))
            }
        });
        Ok((schema, func))
    }
}
