//! Adapter seams over the provider's places widget and the page DOM.
//!
//! The provider's autocomplete element keeps its input and prediction list
//! in undocumented properties. Implementations of [`AutocompleteWidget`]
//! are the only code allowed to reach for them.

use futures::future::LocalBoxFuture;

use crate::error::{BridgeError, FieldFetchError};

/// Place attributes requested after a prediction is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaceField {
    DisplayName,
    FormattedAddress,
    Location,
    AddressComponents,
}

impl PlaceField {
    /// The fixed field set fetched for every selection.
    pub const SELECTION: [PlaceField; 4] = [
        PlaceField::DisplayName,
        PlaceField::FormattedAddress,
        PlaceField::Location,
        PlaceField::AddressComponents,
    ];

    /// Provider field name.
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaceField::DisplayName => "displayName",
            PlaceField::FormattedAddress => "formattedAddress",
            PlaceField::Location => "location",
            PlaceField::AddressComponents => "addressComponents",
        }
    }
}

/// Options for constructing the provider's autocomplete primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutocompleteOptions {
    pub types: Vec<String>,
}

/// Internal elements of a widget, relocated when mounting detached.
#[derive(Debug, Clone)]
pub struct WidgetParts<E> {
    pub input: E,
    pub prediction_list: E,
}

/// The provider namespace, able to construct autocomplete widgets.
pub trait PlacesApi: Clone + 'static {
    type Element: Clone + 'static;
    type Widget: AutocompleteWidget<Element = Self::Element>;

    fn new_autocomplete(&self, options: &AutocompleteOptions) -> Result<Self::Widget, BridgeError>;
}

/// A live provider autocomplete primitive.
pub trait AutocompleteWidget: 'static {
    type Element: Clone + 'static;
    type Prediction: PlacePrediction;

    /// The widget's own element, for mounting as a whole.
    fn element(&self) -> Self::Element;

    /// The widget's internal input and prediction list.
    fn internal_parts(&self) -> Result<WidgetParts<Self::Element>, BridgeError>;

    /// Register the listener for "user picked a suggestion".
    fn on_select(&self, listener: Box<dyn FnMut(Self::Prediction)>) -> Result<(), BridgeError>;
}

/// A selected suggestion that can be resolved into a full place.
pub trait PlacePrediction: 'static {
    /// Convert to a place, fetch `fields`, and return the place as JSON.
    /// `Ok(None)` means the provider produced an empty place.
    fn fetch_fields(
        self,
        fields: &[PlaceField],
    ) -> LocalBoxFuture<'static, Result<Option<serde_json::Value>, FieldFetchError>>;
}

/// DOM operations the bridge needs on caller-supplied mount points.
pub trait Dom: 'static {
    type Element: Clone + 'static;

    fn create_element(&self, tag: &str) -> Result<Self::Element, BridgeError>;
    fn append_child(
        &self,
        parent: &Self::Element,
        child: &Self::Element,
    ) -> Result<(), BridgeError>;
    fn set_attribute(
        &self,
        element: &Self::Element,
        name: &str,
        value: &str,
    ) -> Result<(), BridgeError>;
    fn add_class(&self, element: &Self::Element, class: &str) -> Result<(), BridgeError>;
    fn set_text(&self, element: &Self::Element, text: &str);

    /// Whether `target` is `container` or one of its descendants.
    fn contains(&self, container: &Self::Element, target: &Self::Element) -> bool;

    fn set_visible(&self, element: &Self::Element, visible: bool) -> Result<(), BridgeError>;

    /// Listen for pointer-down anywhere in the document.
    fn on_pointer_down(&self, listener: Box<dyn FnMut(Self::Element)>) -> Result<(), BridgeError>;
}
