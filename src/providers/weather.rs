//! Current-weather summaries from OpenWeatherMap
//!
//! Failures never surface as errors: every outcome is a sentence the
//! appliance can speak.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::Result;
use crate::config::WeatherConfig;

/// Spoken name and query token of each locality the router recognizes,
/// in scan order
pub const KNOWN_LOCALITIES: &[(&str, &str)] = &[
    ("군포", "Gunpo"),
    ("서울", "Seoul"),
    ("부산", "Busan"),
    ("인천", "Incheon"),
];

/// Token for geolocation-based lookup
const AUTO_TOKEN: &str = "auto";

/// Timeout for the IP geolocation lookup
const GEO_TIMEOUT: Duration = Duration::from_secs(5);

const MISSING_KEY: &str = "오류: OpenWeatherMap API 키가 설정되지 않았습니다.";
const SERVER_PROBLEM: &str = "오류: 날씨 정보를 가져오는 중 서버 문제가 발생했습니다.";
const NETWORK_PROBLEM: &str = "오류: 날씨 정보를 가져오는 중 네트워크 문제가 발생했습니다.";
const BAD_FORMAT: &str = "오류: 날씨 정보 형식이 올바르지 않습니다.";
const UNKNOWN_PROBLEM: &str = "오류: 날씨 정보를 가져오는 중 문제가 발생했습니다.";

/// Where to look up the weather
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locality {
    /// A canonical locality token such as `Seoul`
    Named(String),
    /// Wherever the appliance is, by IP geolocation
    Auto,
}

impl Locality {
    /// Parse a token; `auto` selects geolocation
    #[must_use]
    pub fn from_token(token: &str) -> Self {
        if token.eq_ignore_ascii_case(AUTO_TOKEN) {
            Self::Auto
        } else {
            Self::Named(token.to_string())
        }
    }

    /// The token sent to the provider
    #[must_use]
    pub fn token(&self) -> &str {
        match self {
            Self::Named(name) => name,
            Self::Auto => AUTO_TOKEN,
        }
    }
}

impl fmt::Display for Locality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Spoken name for a canonical token, or the token itself if unknown
#[must_use]
pub fn display_name(token: &str) -> &str {
    KNOWN_LOCALITIES
        .iter()
        .find(|(_, canonical)| *canonical == token)
        .map_or(token, |(spoken, _)| *spoken)
}

/// Produces a one-sentence weather summary
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Whether the provider is configured well enough to be worth asking
    fn is_available(&self) -> bool {
        true
    }

    /// Summary for `locality`, or a display string describing the failure
    async fn summary(&self, locality: &Locality) -> String;
}

/// Why a lookup failed
#[derive(Debug)]
enum LookupFailure {
    NotFound,
    Server,
    Network,
    Format,
    Unknown,
}

impl LookupFailure {
    fn message(&self, spoken: &str) -> String {
        match self {
            Self::NotFound => format!("오류: '{spoken}' 도시의 날씨 정보를 찾을 수 없습니다."),
            Self::Server => SERVER_PROBLEM.to_string(),
            Self::Network => NETWORK_PROBLEM.to_string(),
            Self::Format => BAD_FORMAT.to_string(),
            Self::Unknown => UNKNOWN_PROBLEM.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct CurrentWeather {
    cod: Option<serde_json::Value>,
    main: Option<MainReading>,
    #[serde(default)]
    weather: Vec<Condition>,
}

#[derive(Deserialize)]
struct MainReading {
    temp: Option<f64>,
    feels_like: Option<f64>,
    humidity: Option<serde_json::Number>,
}

#[derive(Deserialize)]
struct Condition {
    description: Option<String>,
}

#[derive(Deserialize)]
struct GeoLocation {
    city: Option<String>,
}

/// Looks up current conditions through the OpenWeatherMap API
pub struct OpenWeatherProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    url: String,
    geo_url: String,
    default_locality: String,
}

impl OpenWeatherProvider {
    /// Create a provider from the weather configuration
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: &WeatherConfig, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            url: config.url.clone(),
            geo_url: config.geo_url.clone(),
            default_locality: config.default_locality.clone(),
        })
    }

    /// Guess the appliance's city from its public IP
    async fn locate(&self) -> Option<String> {
        let response = self
            .client
            .get(&self.geo_url)
            .timeout(GEO_TIMEOUT)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status);

        let location = match response {
            Ok(response) => response.json::<GeoLocation>().await,
            Err(e) => Err(e),
        };

        match location {
            Ok(GeoLocation { city: Some(city) }) if !city.trim().is_empty() => {
                tracing::info!(city = %city, "located by IP");
                Some(city)
            }
            Ok(_) => {
                tracing::warn!("IP geolocation returned no city");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "IP geolocation failed");
                None
            }
        }
    }

    async fn fetch(
        &self,
        api_key: &str,
        city: &str,
        spoken: &str,
    ) -> std::result::Result<String, LookupFailure> {
        tracing::debug!(city, spoken, "requesting current weather");

        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("appid", api_key),
                ("q", city),
                ("units", "metric"),
                ("lang", "kr"),
            ])
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "weather request failed");
                LookupFailure::Network
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(LookupFailure::NotFound);
        }
        if !status.is_success() {
            tracing::warn!(status = %status, "weather service error");
            return Err(LookupFailure::Server);
        }

        let body = response.text().await.map_err(|e| {
            tracing::warn!(error = %e, "weather response unreadable");
            LookupFailure::Network
        })?;
        let data: CurrentWeather = serde_json::from_str(&body).map_err(|e| {
            tracing::warn!(error = %e, "weather response is not JSON");
            LookupFailure::Unknown
        })?;

        if data
            .cod
            .as_ref()
            .is_some_and(|cod| cod.as_u64() == Some(404) || cod.as_str() == Some("404"))
        {
            return Err(LookupFailure::NotFound);
        }

        let main = data.main.ok_or(LookupFailure::Format)?;
        let (Some(temp), Some(feels_like), Some(humidity)) =
            (main.temp, main.feels_like, main.humidity)
        else {
            return Err(LookupFailure::Format);
        };
        let description = data
            .weather
            .into_iter()
            .next()
            .and_then(|c| c.description)
            .ok_or(LookupFailure::Format)?;

        Ok(format!(
            "{spoken}의 현재 날씨는 {description}이며, 온도는 {temp:.1}°C (체감온도: {feels_like:.1}°C), 습도는 {humidity}% 입니다."
        ))
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn summary(&self, locality: &Locality) -> String {
        let Some(api_key) = self.api_key.as_deref() else {
            return MISSING_KEY.to_string();
        };

        let (city, spoken) = match locality {
            Locality::Named(token) => (token.clone(), display_name(token).to_string()),
            Locality::Auto => match self.locate().await {
                Some(city) => {
                    let spoken = display_name(&city).to_string();
                    (city, spoken)
                }
                None => {
                    tracing::info!(fallback = %self.default_locality, "using default locality");
                    (
                        self.default_locality.clone(),
                        display_name(&self.default_locality).to_string(),
                    )
                }
            },
        };

        match self.fetch(api_key, &city, &spoken).await {
            Ok(summary) => {
                tracing::info!(city = %city, "weather lookup complete");
                summary
            }
            Err(failure) => {
                tracing::warn!(city = %city, failure = ?failure, "weather lookup failed");
                failure.message(&spoken)
            }
        }
    }
}

/// Weather provider used when no API key is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableWeather;

#[async_trait]
impl WeatherProvider for UnavailableWeather {
    fn is_available(&self) -> bool {
        false
    }

    async fn summary(&self, _locality: &Locality) -> String {
        MISSING_KEY.to_string()
    }
}
