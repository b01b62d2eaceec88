//! Browser bindings and the JS-facing entry points.
//!
//! A page calls `configure` once, then mounts any number of widgets. All
//! widgets share the page's single [`ResourceLoader`], kept in a
//! thread-local for the lifetime of the page.
//!
//! ```text
//! configure(cfg) ──► PAGE { loader, widget config }
//!                          │
//! mountAutocomplete(..) ───┴──► AutocompleteBridge ──onSelect──► JS
//! ```

pub mod dom;
pub mod places;
pub mod script;

pub use dom::BrowserDom;
pub use places::{GoogleMaps, GooglePrediction, PlaceAutocompleteElement};
pub use script::BrowserScriptHost;

use std::cell::RefCell;
use std::rc::Rc;

use futures::future::LocalFutureObj;
use futures::task::{LocalSpawn, SpawnError};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use crate::bridge::{AutocompleteBridge, Mount};
use crate::config::{AutocompleteConfig, WidgetConfig};
use crate::loader::ResourceLoader;
use crate::selection::PlaceOutput;

pub type BrowserLoader = ResourceLoader<BrowserScriptHost>;
pub type BrowserBridge = AutocompleteBridge<BrowserScriptHost, BrowserDom>;

/// Runs futures on the page's microtask queue.
#[derive(Clone, Copy, Default)]
pub struct BrowserSpawner;

impl LocalSpawn for BrowserSpawner {
    fn spawn_local_obj(&self, future: LocalFutureObj<'static, ()>) -> Result<(), SpawnError> {
        wasm_bindgen_futures::spawn_local(future);
        Ok(())
    }
}

struct Page {
    loader: Rc<BrowserLoader>,
    widget: WidgetConfig,
}

thread_local! {
    static PAGE: RefCell<Option<Page>> = const { RefCell::new(None) };
}

/// Best-effort message from a thrown JS value.
pub(crate) fn js_message(value: &JsValue) -> String {
    if let Some(s) = value.as_string() {
        return s;
    }
    if let Some(err) = value.dyn_ref::<js_sys::Error>() {
        return String::from(err.message());
    }
    format!("{value:?}")
}

fn to_js(err: impl std::fmt::Display) -> JsValue {
    js_sys::Error::new(&err.to_string()).into()
}

/// Configure the page-wide loader. Only the first call takes effect.
#[wasm_bindgen]
pub fn configure(config: JsValue) -> Result<(), JsValue> {
    let config: AutocompleteConfig = serde_wasm_bindgen::from_value(config).map_err(to_js)?;
    config.validate().map_err(to_js)?;

    PAGE.with(|page| {
        let mut page = page.borrow_mut();
        if page.is_some() {
            tracing::warn!("places-autocomplete is already configured; ignoring new configuration");
            return Ok(());
        }
        let host = BrowserScriptHost::new().map_err(to_js)?;
        let loader = ResourceLoader::new(host, config.loader).map_err(to_js)?;
        *page = Some(Page {
            loader: Rc::new(loader),
            widget: config.widget,
        });
        tracing::info!("places-autocomplete configured");
        Ok(())
    })
}

/// Start a fresh script load after a failed one.
#[wasm_bindgen(js_name = retryLoad)]
pub async fn retry_load() -> Result<(), JsValue> {
    let loader = page_loader()?;
    loader.retry().await.map(|_| ()).map_err(to_js)
}

/// Mount the provider widget as a whole into `container`.
#[wasm_bindgen(js_name = mountAutocomplete)]
pub async fn mount_autocomplete(
    container: web_sys::Element,
    on_select: js_sys::Function,
    on_error: Option<js_sys::Function>,
) -> Result<PlacesAutocomplete, JsValue> {
    mount(Mount::Basic { container }, on_select, on_error).await
}

/// Mount the widget's input and label into `field` and its predictions into
/// `dropdown`; clicks outside `group` hide `dropdown`.
#[wasm_bindgen(js_name = mountDetachedAutocomplete)]
pub async fn mount_detached_autocomplete(
    group: web_sys::Element,
    field: web_sys::Element,
    dropdown: web_sys::Element,
    on_select: js_sys::Function,
    on_error: Option<js_sys::Function>,
) -> Result<PlacesAutocomplete, JsValue> {
    let mount_point = Mount::Detached {
        group,
        field,
        dropdown,
    };
    mount(mount_point, on_select, on_error).await
}

/// JS handle to one mounted widget.
#[wasm_bindgen]
pub struct PlacesAutocomplete {
    bridge: BrowserBridge,
}

#[wasm_bindgen]
impl PlacesAutocomplete {
    /// Latest selection as a plain object, or `undefined`.
    pub fn latest(&self) -> Result<JsValue, JsValue> {
        match self.bridge.output().latest() {
            Some(selection) => serde_wasm_bindgen::to_value(&selection).map_err(to_js),
            None => Ok(JsValue::UNDEFINED),
        }
    }

    pub fn status(&self) -> String {
        format!("{:?}", self.bridge.status())
    }
}

fn page_loader() -> Result<Rc<BrowserLoader>, JsValue> {
    PAGE.with(|page| page.borrow().as_ref().map(|p| p.loader.clone()))
        .ok_or_else(|| to_js("places-autocomplete is not configured; call configure() first"))
}

async fn mount(
    mount_point: Mount<web_sys::Element>,
    on_select: js_sys::Function,
    on_error: Option<js_sys::Function>,
) -> Result<PlacesAutocomplete, JsValue> {
    let loader = page_loader()?;
    let widget = PAGE
        .with(|page| page.borrow().as_ref().map(|p| p.widget.clone()))
        .unwrap_or_default();
    let dom = BrowserDom::new().map_err(to_js)?;

    let bridge = AutocompleteBridge::new(loader, Rc::new(dom), Rc::new(BrowserSpawner), widget);
    forward_outcomes(&bridge.output(), on_select, on_error);
    bridge.initialize(mount_point).await.map_err(to_js)?;
    Ok(PlacesAutocomplete { bridge })
}

fn forward_outcomes(
    output: &PlaceOutput,
    on_select: js_sys::Function,
    on_error: Option<js_sys::Function>,
) {
    output.subscribe(move |outcome| {
        let delivered = match outcome {
            Ok(selection) => serde_wasm_bindgen::to_value(selection)
                .map_err(to_js)
                .and_then(|value| on_select.call1(&JsValue::NULL, &value)),
            Err(err) => match &on_error {
                Some(on_error) => on_error.call1(&JsValue::NULL, &to_js(err)),
                None => Ok(JsValue::UNDEFINED),
            },
        };
        if let Err(err) = delivered {
            tracing::warn!(error = %js_message(&err), "Selection callback threw");
        }
    });
}
