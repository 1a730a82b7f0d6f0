use crate::label::ImageRef;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(deserialize_with = "deserialize_log_level")]
    pub log_level: LogLevel,
    #[serde(default, deserialize_with = "deserialize_log_format")]
    pub log_format: LogFormat,
    pub aws: AwsConfig,
    pub image: ImageConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

fn deserialize_log_level<'de, D>(deserializer: D) -> Result<LogLevel, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.try_into().map_err(serde::de::Error::custom)
}

fn deserialize_log_format<'de, D>(deserializer: D) -> Result<LogFormat, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.try_into().map_err(serde::de::Error::custom)
}

#[derive(Debug, Deserialize, Clone)]
pub struct AwsConfig {
    pub region: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ImageConfig {
    pub bucket: String,
    pub key: String,
}

impl ImageConfig {
    pub fn image_ref(&self) -> ImageRef {
        ImageRef::new(&self.bucket, &self.key)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DetectionConfig {
    #[serde(default = "default_max_labels")]
    pub max_labels: i32,
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f32,
}

fn default_max_labels() -> i32 {
    10
}

fn default_min_confidence() -> f32 {
    75.0
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            max_labels: default_max_labels(),
            min_confidence: default_min_confidence(),
        }
    }
}

impl DetectionConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_labels < 1 {
            return Err(format!(
                "detection.max_labels must be at least 1, got {}",
                self.max_labels
            ));
        }
        if !(0.0..=100.0).contains(&self.min_confidence) {
            return Err(format!(
                "detection.min_confidence must be within [0, 100], got {}",
                self.min_confidence
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DisplayConfig {
    #[serde(default = "default_window")]
    pub window: bool,
    pub output_path: Option<PathBuf>,
}

impl DisplayConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !self.window && self.output_path.is_none() {
            return Err("display.window is false and display.output_path is not set".to_string());
        }
        Ok(())
    }
}

fn default_window() -> bool {
    true
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            window: default_window(),
            output_path: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub enum LogLevel {
    Debug,
    Info,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            other => Err(format!(
                "{} is not a supported minimum log level. Use either `debug` or `info`.",
                other
            )),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl TryFrom<String> for LogFormat {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => Err(format!(
                "{} is not a supported log format. Use either `json` or `pretty`.",
                other
            )),
        }
    }
}

pub fn get_configuration() -> Result<Config, config::ConfigError> {
    let base_path =
        std::env::current_dir().map_err(|e| config::ConfigError::Message(e.to_string()))?;
    let configuration_directory = base_path.join("configuration");

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(config::ConfigError::Message)?;

    let builder = config::Config::builder()
        .add_source(config::File::from(
            configuration_directory.join("base.yaml"),
        ))
        .add_source(
            config::File::from(
                configuration_directory.join(format!("{}.yaml", environment.as_str())),
            )
            .required(false),
        )
        .add_source(
            config::Environment::with_prefix("LABELER")
                .prefix_separator("_")
                .separator("__"),
        );

    build_config(builder)
}

fn build_config(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
) -> Result<Config, config::ConfigError> {
    let config: Config = builder.build()?.try_deserialize::<Config>()?;

    if let Err(e) = config.detection.validate().and_then(|_| config.display.validate()) {
        tracing::error!("Configuration validation failed: {}", e);
        return Err(config::ConfigError::Message(e));
    }

    Ok(config)
}
