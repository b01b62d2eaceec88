//! Places Autocomplete - load-once provider script and selection bridge
//!
//! [`ResourceLoader`] inserts the provider's script at most once per page and
//! hands every caller the same shared future. [`AutocompleteBridge`] mounts
//! one provider widget per instance and republishes what the user picks as
//! a [`PlaceSelection`].
//!
//! The core is platform-neutral. Browser bindings live in `browser` and are
//! only compiled for `wasm32`.

pub mod bridge;
pub mod config;
pub mod error;
pub mod host;
pub mod loader;
pub mod places;
pub mod selection;

#[cfg(target_arch = "wasm32")]
pub mod browser;

pub use bridge::{resolve_selection, AutocompleteBridge, BridgeStatus, Mount};
pub use config::{AutocompleteConfig, LoaderConfig, ScriptRequest, WidgetConfig};
pub use error::{BridgeError, ConfigError, FieldFetchError, LoadError};
pub use host::{Completion, ScriptHost};
pub use loader::{LoadFuture, LoadState, LoadStatus, ResourceLoader};
pub use places::{
    AutocompleteOptions, AutocompleteWidget, Dom, PlaceField, PlacePrediction, PlacesApi,
    WidgetParts,
};
pub use selection::{AddressComponent, LatLng, PlaceOutput, PlaceSelection, SelectionOutcome};

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    tracing_wasm::set_as_global_default();
    tracing::info!("places-autocomplete loaded");
}
