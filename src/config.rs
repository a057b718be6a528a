//! Settings loading for factory arguments.
//!
//! The singleton never looks inside the argument handed to its factory. This
//! module is for hosts that assemble that argument from the environment or a
//! settings file, the way a settings object is typically filled in at
//! process start.
//!
//! Environment variables are plain text. They stay [`ConfigValue::String`]
//! until [`load_settings`] sees the field they land in, so a password of
//! `123456` still loads into a `String` field while `"8"` loads into a `u32`.

use serde::de::{
    self, value::MapDeserializer, Deserializer, IntoDeserializer, Unexpected, Visitor,
};
use serde::{forward_to_deserialize_any, Deserialize};
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// A configuration value that can be various types
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

/// Errors raised while building settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing configuration key: {0}")]
    Missing(String),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("invalid configuration file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),
}

impl de::Error for ConfigError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        ConfigError::Invalid(msg.to_string())
    }
}

/// Trait for configuration sources
pub trait ConfigSource: Send + Sync + fmt::Debug {
    /// Get a configuration value by key
    fn get(&self, key: &str) -> Option<ConfigValue>;

    /// List all available keys
    fn keys(&self) -> Vec<String>;

    /// Get a value or fail with [`ConfigError::Missing`].
    fn require(&self, key: &str) -> Result<ConfigValue, ConfigError> {
        self.get(key).ok_or_else(|| ConfigError::Missing(key.to_string()))
    }
}

/// Environment variable configuration source
///
/// Keys are lowercase; `database_url` with prefix `app` reads `APP_DATABASE_URL`.
#[derive(Debug, Default)]
pub struct EnvironmentConfigSource {
    /// Prefix to filter environment variables
    prefix: Option<String>,
}

impl EnvironmentConfigSource {
    pub fn new() -> Self {
        Self { prefix: None }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }
}

impl ConfigSource for EnvironmentConfigSource {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        let env_key = match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix.to_uppercase(), key.to_uppercase()),
            None => key.to_uppercase(),
        };
        env::var(&env_key).ok().map(ConfigValue::String)
    }

    fn keys(&self) -> Vec<String> {
        env::vars()
            .filter_map(|(key, _)| match &self.prefix {
                Some(prefix) => {
                    let prefix_upper = format!("{}_", prefix.to_uppercase());
                    key.strip_prefix(&prefix_upper).map(str::to_lowercase)
                }
                None => Some(key.to_lowercase()),
            })
            .collect()
    }
}

/// In-memory configuration source
#[derive(Debug, Default, Clone)]
pub struct MapConfigSource {
    values: HashMap<String, ConfigValue>,
}

impl MapConfigSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a raw text value, as an environment variable would supply it.
    pub fn with(mut self, key: impl Into<String>, raw: &str) -> Self {
        self.values
            .insert(key.into(), ConfigValue::String(raw.to_string()));
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: ConfigValue) {
        self.values.insert(key.into(), value);
    }
}

impl ConfigSource for MapConfigSource {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.values.get(key).cloned()
    }

    fn keys(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }
}

/// JSON file configuration source
///
/// The file holds one flat object; nested objects and arrays are rejected.
#[derive(Debug, Default, Clone)]
pub struct JsonConfigSource {
    values: HashMap<String, ConfigValue>,
}

impl JsonConfigSource {
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            values: serde_json::from_str(content)?,
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}

impl ConfigSource for JsonConfigSource {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.values.get(key).cloned()
    }

    fn keys(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }
}

/// Deserializes every key of `source` into a settings struct.
///
/// Text values are converted to whatever the target field asks for; typed
/// values are rendered back to text for `String` fields.
///
/// # Examples
///
/// ```rust
/// use serde::Deserialize;
/// use singletondep::config::{load_settings, MapConfigSource};
///
/// #[derive(Deserialize)]
/// struct Settings {
///     database_url: String,
///     pool_size: u32,
///     password: String,
/// }
///
/// let source = MapConfigSource::new()
///     .with("database_url", "postgres://localhost")
///     .with("pool_size", "8")
///     .with("password", "123456");
/// let settings: Settings = load_settings(&source).unwrap();
/// assert_eq!(settings.pool_size, 8);
/// assert_eq!(settings.password, "123456");
/// ```
pub fn load_settings<S: de::DeserializeOwned>(
    source: &dyn ConfigSource,
) -> Result<S, ConfigError> {
    let entries = source
        .keys()
        .into_iter()
        .filter_map(|key| source.get(&key).map(|value| (key, value)));
    let mut deserializer: MapDeserializer<'_, _, ConfigError> = MapDeserializer::new(entries);
    let settings = S::deserialize(serde::de::value::MapAccessDeserializer::new(&mut deserializer))?;
    deserializer.end()?;
    Ok(settings)
}

impl<'de> IntoDeserializer<'de, ConfigError> for ConfigValue {
    type Deserializer = ValueDeserializer;

    fn into_deserializer(self) -> ValueDeserializer {
        ValueDeserializer(self)
    }
}

/// Converts one [`ConfigValue`] by the type of the field it lands in.
pub struct ValueDeserializer(ConfigValue);

macro_rules! deserialize_parsed {
    ($($method:ident => $parsed:ty, $visit:ident;)*) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ConfigError> {
                match self.0 {
                    ConfigValue::String(raw) => match raw.trim().parse::<$parsed>() {
                        Ok(parsed) => visitor.$visit(parsed),
                        Err(_) => Err(de::Error::invalid_type(Unexpected::Str(&raw), &visitor)),
                    },
                    other => ValueDeserializer(other).deserialize_any(visitor),
                }
            }
        )*
    };
}

impl<'de> Deserializer<'de> for ValueDeserializer {
    type Error = ConfigError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ConfigError> {
        match self.0 {
            ConfigValue::String(s) => visitor.visit_string(s),
            ConfigValue::Integer(i) => visitor.visit_i64(i),
            ConfigValue::Float(f) => visitor.visit_f64(f),
            ConfigValue::Boolean(b) => visitor.visit_bool(b),
        }
    }

    deserialize_parsed! {
        deserialize_bool => bool, visit_bool;
        deserialize_i8 => i64, visit_i64;
        deserialize_i16 => i64, visit_i64;
        deserialize_i32 => i64, visit_i64;
        deserialize_i64 => i64, visit_i64;
        deserialize_u8 => u64, visit_u64;
        deserialize_u16 => u64, visit_u64;
        deserialize_u32 => u64, visit_u64;
        deserialize_u64 => u64, visit_u64;
        deserialize_f32 => f64, visit_f64;
        deserialize_f64 => f64, visit_f64;
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ConfigError> {
        self.deserialize_string(visitor)
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ConfigError> {
        match self.0 {
            ConfigValue::String(s) => visitor.visit_string(s),
            ConfigValue::Integer(i) => visitor.visit_string(i.to_string()),
            ConfigValue::Float(f) => visitor.visit_string(f.to_string()),
            ConfigValue::Boolean(b) => visitor.visit_string(b.to_string()),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ConfigError> {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, ConfigError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, ConfigError> {
        match self.0 {
            // Unit variants spelled as text, e.g. `LOG_FORMAT=json`
            ConfigValue::String(s) => visitor.visit_enum(s.into_deserializer()),
            other => ValueDeserializer(other).deserialize_any(visitor),
        }
    }

    forward_to_deserialize_any! {
        char bytes byte_buf unit unit_struct seq tuple tuple_struct map struct
        identifier ignored_any
    }
}
