//! Adapter over the provider's `places.PlaceAutocompleteElement`.
//!
//! All reads of undocumented widget properties happen in this file.

use futures::future::{FutureExt, LocalBoxFuture};
use js_sys::{Array, Function, Object, Promise, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::Element;

use super::js_message;
use crate::error::{BridgeError, FieldFetchError};
use crate::places::{
    AutocompleteOptions, AutocompleteWidget, PlaceField, PlacePrediction, PlacesApi, WidgetParts,
};

/// Minified property holding the widget's input element (current weekly release).
const INPUT_PROPERTY: &str = "Eg";
/// Minified property holding the widget's prediction list element.
const PREDICTION_LIST_PROPERTY: &str = "Jg";

const SELECT_EVENT: &str = "gmp-select";

/// Handle to `google.maps`.
#[derive(Clone)]
pub struct GoogleMaps {
    maps: Object,
}

impl GoogleMaps {
    pub fn new(maps: Object) -> Self {
        Self { maps }
    }
}

impl PlacesApi for GoogleMaps {
    type Element = Element;
    type Widget = PlaceAutocompleteElement;

    fn new_autocomplete(&self, options: &AutocompleteOptions) -> Result<Self::Widget, BridgeError> {
        let places = Reflect::get(&self.maps, &JsValue::from_str("places")).map_err(widget_error)?;
        let constructor: Function =
            Reflect::get(&places, &JsValue::from_str("PlaceAutocompleteElement"))
                .map_err(widget_error)?
                .dyn_into()
                .map_err(|_| {
                    BridgeError::Widget("places.PlaceAutocompleteElement is unavailable".into())
                })?;

        let init = Object::new();
        let types: Array = options.types.iter().map(|t| JsValue::from_str(t)).collect();
        Reflect::set(&init, &JsValue::from_str("types"), &types).map_err(widget_error)?;

        let element: Element = Reflect::construct(&constructor, &Array::of1(&init))
            .map_err(widget_error)?
            .dyn_into()
            .map_err(|_| BridgeError::Widget("autocomplete is not an element".into()))?;
        Ok(PlaceAutocompleteElement { element })
    }
}

pub struct PlaceAutocompleteElement {
    element: Element,
}

impl AutocompleteWidget for PlaceAutocompleteElement {
    type Element = Element;
    type Prediction = GooglePrediction;

    fn element(&self) -> Element {
        self.element.clone()
    }

    fn internal_parts(&self) -> Result<WidgetParts<Element>, BridgeError> {
        Ok(WidgetParts {
            input: internal_element(&self.element, INPUT_PROPERTY)?,
            prediction_list: internal_element(&self.element, PREDICTION_LIST_PROPERTY)?,
        })
    }

    fn on_select(&self, mut listener: Box<dyn FnMut(GooglePrediction)>) -> Result<(), BridgeError> {
        let callback = Closure::<dyn FnMut(web_sys::Event)>::new(move |event: web_sys::Event| {
            match Reflect::get(&event, &JsValue::from_str("placePrediction")) {
                Ok(prediction) if prediction.is_object() => {
                    listener(GooglePrediction { prediction })
                }
                _ => tracing::warn!("{SELECT_EVENT} event without a placePrediction"),
            }
        });
        self.element
            .add_event_listener_with_callback(SELECT_EVENT, callback.as_ref().unchecked_ref())
            .map_err(widget_error)?;
        callback.forget();
        Ok(())
    }
}

fn internal_element(widget: &Element, property: &str) -> Result<Element, BridgeError> {
    Reflect::get(widget, &JsValue::from_str(property))
        .map_err(widget_error)?
        .dyn_into()
        .map_err(|_| {
            BridgeError::Widget(format!(
                "autocomplete internals changed: '{property}' is not an element"
            ))
        })
}

fn widget_error(err: JsValue) -> BridgeError {
    BridgeError::Widget(js_message(&err))
}

/// A `placePrediction` from a select event.
pub struct GooglePrediction {
    prediction: JsValue,
}

impl PlacePrediction for GooglePrediction {
    fn fetch_fields(
        self,
        fields: &[PlaceField],
    ) -> LocalBoxFuture<'static, Result<Option<serde_json::Value>, FieldFetchError>> {
        let names: Array = fields.iter().map(|f| JsValue::from_str(f.as_str())).collect();

        async move {
            let place = call(&self.prediction, "toPlace", &Array::new())?;

            let request = Object::new();
            Reflect::set(&request, &JsValue::from_str("fields"), &names).map_err(fetch_error)?;
            let pending: Promise = call(&place, "fetchFields", &Array::of1(&request))?
                .dyn_into()
                .map_err(|_| {
                    FieldFetchError::Fetch("fetchFields did not return a promise".into())
                })?;
            JsFuture::from(pending).await.map_err(fetch_error)?;

            let json = call(&place, "toJSON", &Array::new())?;
            if json.is_null() || json.is_undefined() {
                return Ok(None);
            }
            serde_wasm_bindgen::from_value::<serde_json::Value>(json)
                .map(Some)
                .map_err(|e| FieldFetchError::Malformed(e.to_string()))
        }
        .boxed_local()
    }
}

fn call(target: &JsValue, method: &str, args: &Array) -> Result<JsValue, FieldFetchError> {
    let function: Function = Reflect::get(target, &JsValue::from_str(method))
        .map_err(fetch_error)?
        .dyn_into()
        .map_err(|_| FieldFetchError::Fetch(format!("{method} is not a function")))?;
    Reflect::apply(&function, target, args).map_err(fetch_error)
}

fn fetch_error(err: JsValue) -> FieldFetchError {
    FieldFetchError::Fetch(js_message(&err))
}
