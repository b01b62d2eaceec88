//! Loader and widget configuration.
//!
//! Every field has a default matching the provider's documented async
//! bootstrap, so a page usually only supplies `apiKey`.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ConfigError;

/// Provider script endpoint.
pub const DEFAULT_SCRIPT_BASE: &str = "https://maps.googleapis.com/maps/api/js";
/// Element id of the injected script tag.
pub const DEFAULT_SCRIPT_ID: &str = "google-places-js-script";
/// Global function the provider calls once ready.
pub const DEFAULT_CALLBACK_NAME: &str = "GooglePlaces_cb";

/// Fixed parameters of the provider script URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoaderConfig {
    pub script_base: String,
    pub script_id: String,
    pub callback_name: String,
    /// API version channel (`v`)
    pub version: String,
    /// Credential (`key`)
    pub api_key: String,
    /// Feature bundle (`libraries`)
    pub libraries: String,
    /// Loading mode flag (`loading`)
    pub loading: String,
    /// Locale (`language`)
    pub language: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            script_base: DEFAULT_SCRIPT_BASE.to_string(),
            script_id: DEFAULT_SCRIPT_ID.to_string(),
            callback_name: DEFAULT_CALLBACK_NAME.to_string(),
            version: "weekly".to_string(),
            api_key: String::new(),
            libraries: "places".to_string(),
            loading: "async".to_string(),
            language: "en".to_string(),
        }
    }
}

impl LoaderConfig {
    /// Default configuration with the given API key.
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("apiKey", &self.api_key),
            ("scriptId", &self.script_id),
            ("callbackName", &self.callback_name),
            ("libraries", &self.libraries),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingField(name));
            }
        }
        Url::parse(&self.script_base)?;
        Ok(())
    }

    /// Build the script URL. Query parameters are emitted in a fixed order.
    pub fn script_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse_with_params(
            &self.script_base,
            [
                ("v", self.version.as_str()),
                ("callback", self.callback_name.as_str()),
                ("key", self.api_key.as_str()),
                ("libraries", self.libraries.as_str()),
                ("loading", self.loading.as_str()),
                ("language", self.language.as_str()),
            ],
        )?;
        Ok(url)
    }

    /// Validate and resolve into the request handed to the script host.
    pub fn script_request(&self) -> Result<ScriptRequest, ConfigError> {
        self.validate()?;
        Ok(ScriptRequest {
            id: self.script_id.clone(),
            callback: self.callback_name.clone(),
            src: self.script_url()?.to_string(),
        })
    }
}

/// Everything a host needs to insert or attach to the provider script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptRequest {
    /// Well-known element id of the script tag
    pub id: String,
    /// Global callback name the script invokes once ready
    pub callback: String,
    pub src: String,
}

/// Attributes applied when the widget's internal input is mounted detached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WidgetConfig {
    /// Prediction types the widget is scoped to
    pub types: Vec<String>,
    pub input_id: String,
    pub input_class: String,
    pub placeholder: String,
    /// Value of the input's `autocomplete` attribute (suppresses browser autofill)
    pub autocomplete: String,
    pub label_text: String,
    pub label_classes: Vec<String>,
    pub dropdown_classes: Vec<String>,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            types: vec!["geocode".to_string()],
            input_id: "google-place-address".to_string(),
            input_class: "form-control".to_string(),
            placeholder: "Search google place address".to_string(),
            autocomplete: "new-google-address".to_string(),
            label_text: "Google Place Address".to_string(),
            label_classes: vec!["color-gray".to_string(), "d-flex".to_string()],
            dropdown_classes: vec![
                "dropdown".to_string(),
                "dropdown-results".to_string(),
                "gpai-dropdown".to_string(),
                "gpai-dropdown-results".to_string(),
            ],
        }
    }
}

/// Top-level configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AutocompleteConfig {
    pub loader: LoaderConfig,
    pub widget: WidgetConfig,
}

impl AutocompleteConfig {
    /// Parse a JSON configuration document and validate it.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.loader.validate()?;
        if self.widget.types.is_empty() {
            return Err(ConfigError::MissingField("types"));
        }
        Ok(())
    }
}
