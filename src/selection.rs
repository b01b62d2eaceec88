//! Normalized place selections and the slot they are published to.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FieldFetchError;
use crate::places::PlaceField;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressComponent {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

/// A fully resolved place, as handed to the embedding application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceSelection {
    pub display_name: String,
    pub formatted_address: String,
    pub location: LatLng,
    pub address_components: Vec<AddressComponent>,
}

/// Outcome of one user selection.
pub type SelectionOutcome = Result<PlaceSelection, FieldFetchError>;

/// Address component as the provider serializes it, or already normalized.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawComponent {
    Normalized {
        #[serde(rename = "type")]
        kind: String,
        value: String,
    },
    Provider {
        #[serde(rename = "longText")]
        long_text: Option<String>,
        #[serde(rename = "shortText")]
        short_text: Option<String>,
        #[serde(default)]
        types: Vec<String>,
    },
}

impl PlaceSelection {
    /// Build a selection from a fetched place. Every field of
    /// [`PlaceField::SELECTION`] must be present.
    pub fn from_place_json(place: &Value) -> Result<Self, FieldFetchError> {
        let place = match place {
            Value::Null => return Err(FieldFetchError::Empty),
            Value::Object(map) if map.is_empty() => return Err(FieldFetchError::Empty),
            Value::Object(map) => map,
            other => {
                return Err(FieldFetchError::Malformed(format!(
                    "expected place object, got {other}"
                )))
            }
        };

        let field = |f: PlaceField| match place.get(f.as_str()) {
            None | Some(Value::Null) => Err(FieldFetchError::Incomplete { field: f.as_str() }),
            Some(value) => Ok(value),
        };

        let display_name = match field(PlaceField::DisplayName)? {
            Value::String(s) => s.clone(),
            // Localized text: { "text": .., "languageCode": .. }
            Value::Object(localized) => localized
                .get("text")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| FieldFetchError::Malformed("displayName has no text".into()))?,
            other => return Err(FieldFetchError::Malformed(format!("displayName: {other}"))),
        };

        let formatted_address = field(PlaceField::FormattedAddress)?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| FieldFetchError::Malformed("formattedAddress is not a string".into()))?;

        let location: LatLng = serde_json::from_value(field(PlaceField::Location)?.clone())
            .map_err(|e| FieldFetchError::Malformed(format!("location: {e}")))?;

        let raw: Vec<RawComponent> =
            serde_json::from_value(field(PlaceField::AddressComponents)?.clone())
                .map_err(|e| FieldFetchError::Malformed(format!("addressComponents: {e}")))?;
        let address_components = raw
            .into_iter()
            .map(normalize_component)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            display_name,
            formatted_address,
            location,
            address_components,
        })
    }
}

fn normalize_component(raw: RawComponent) -> Result<AddressComponent, FieldFetchError> {
    match raw {
        RawComponent::Normalized { kind, value } => Ok(AddressComponent { kind, value }),
        RawComponent::Provider {
            long_text,
            short_text,
            types,
        } => {
            let kind = types.into_iter().next().ok_or_else(|| {
                FieldFetchError::Malformed("address component without a type".into())
            })?;
            let value = long_text.or(short_text).ok_or_else(|| {
                FieldFetchError::Malformed(format!("address component '{kind}' has no text"))
            })?;
            Ok(AddressComponent { kind, value })
        }
    }
}

#[derive(Default)]
struct OutputInner {
    latest: Option<PlaceSelection>,
    last_error: Option<FieldFetchError>,
    subscribers: Vec<Box<dyn FnMut(&SelectionOutcome)>>,
    /// Outcomes published while subscribers are being notified.
    queued: VecDeque<SelectionOutcome>,
    notifying: bool,
}

impl OutputInner {
    fn record(&mut self, outcome: &SelectionOutcome) {
        match outcome {
            Ok(selection) => {
                self.latest = Some(selection.clone());
                self.last_error = None;
            }
            Err(err) => self.last_error = Some(err.clone()),
        }
    }
}

/// Observable slot holding the latest selection of one widget.
///
/// Clones share the same slot. Outcomes reach every subscriber in publish
/// order, including outcomes published from inside a subscriber.
#[derive(Clone, Default)]
pub struct PlaceOutput {
    inner: Rc<RefCell<OutputInner>>,
}

impl PlaceOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent successful selection, if any.
    pub fn latest(&self) -> Option<PlaceSelection> {
        self.inner.borrow().latest.clone()
    }

    /// The most recent failed selection, cleared by the next success.
    pub fn last_error(&self) -> Option<FieldFetchError> {
        self.inner.borrow().last_error.clone()
    }

    /// Be notified of every selection outcome, successful or not.
    pub fn subscribe(&self, subscriber: impl FnMut(&SelectionOutcome) + 'static) {
        self.inner.borrow_mut().subscribers.push(Box::new(subscriber));
    }

    pub(crate) fn publish(&self, outcome: SelectionOutcome) {
        {
            let mut inner = self.inner.borrow_mut();
            inner.queued.push_back(outcome);
            if inner.notifying {
                return;
            }
            inner.notifying = true;
        }

        loop {
            // Subscribers may read the slot, subscribe or publish while being notified.
            let (outcome, mut subscribers) = {
                let mut inner = self.inner.borrow_mut();
                let Some(outcome) = inner.queued.pop_front() else {
                    inner.notifying = false;
                    return;
                };
                inner.record(&outcome);
                (outcome, std::mem::take(&mut inner.subscribers))
            };

            for subscriber in subscribers.iter_mut() {
                subscriber(&outcome);
            }

            let mut inner = self.inner.borrow_mut();
            subscribers.append(&mut inner.subscribers);
            inner.subscribers = subscribers;
        }
    }
}
