//! Script host backed by the page's `window` and `document`.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, HtmlElement, HtmlScriptElement, Window};

use super::js_message;
use super::places::GoogleMaps;
use crate::config::ScriptRequest;
use crate::error::LoadError;
use crate::host::{Completion, ScriptHost};

pub struct BrowserScriptHost {
    window: Window,
    document: Document,
}

impl BrowserScriptHost {
    pub fn new() -> Result<Self, LoadError> {
        let window = web_sys::window().ok_or_else(|| LoadError::Host("No window".into()))?;
        let document = window
            .document()
            .ok_or_else(|| LoadError::Host("No document".into()))?;
        Ok(Self { window, document })
    }

    /// Route the global ready callback and the element's error event to
    /// `done`. Whichever fires first wins; the other is ignored.
    fn wire(
        &self,
        script: &HtmlElement,
        request: &ScriptRequest,
        done: Completion<GoogleMaps>,
    ) -> Result<(), LoadError> {
        let done = Rc::new(RefCell::new(Some(done)));

        let window = self.window.clone();
        let ready_done = done.clone();
        let on_ready = Closure::<dyn FnMut()>::new(move || {
            let taken = ready_done.borrow_mut().take();
            if let Some(done) = taken {
                done(provider_namespace(&window).ok_or(LoadError::MissingApi));
            }
        });

        let src = request.src.clone();
        let on_error = Closure::<dyn FnMut(web_sys::Event)>::new(move |_event: web_sys::Event| {
            let taken = done.borrow_mut().take();
            if let Some(done) = taken {
                done(Err(LoadError::Script { src: src.clone() }));
            }
        });

        js_sys::Reflect::set(
            &self.window,
            &JsValue::from_str(&request.callback),
            on_ready.as_ref(),
        )
        .map_err(|e| LoadError::Host(js_message(&e)))?;
        script.set_onerror(Some(on_error.as_ref().unchecked_ref()));

        // Both fire at most once per page; keep them alive
        on_ready.forget();
        on_error.forget();
        Ok(())
    }
}

impl ScriptHost for BrowserScriptHost {
    type Api = GoogleMaps;

    fn script_exists(&self, id: &str) -> bool {
        self.document.get_element_by_id(id).is_some()
    }

    fn provider_api(&self) -> Option<GoogleMaps> {
        provider_namespace(&self.window)
    }

    fn insert_script(
        &self,
        request: &ScriptRequest,
        done: Completion<GoogleMaps>,
    ) -> Result<(), LoadError> {
        let script: HtmlScriptElement = self
            .document
            .create_element("script")
            .map_err(|e| LoadError::Host(js_message(&e)))?
            .dyn_into()
            .map_err(|_| LoadError::Host("created element is not a script".into()))?;
        script.set_type("text/javascript");
        script.set_async(true);
        script.set_defer(true);
        script.set_id(&request.id);
        script.set_src(&request.src);

        let body = self
            .document
            .body()
            .ok_or_else(|| LoadError::Host("No document body".into()))?;
        body.append_child(&script)
            .map_err(|e| LoadError::Host(js_message(&e)))?;

        // The script cannot run before this task yields, so wiring after
        // insertion cannot miss the callback.
        self.wire(&script, request, done)
    }

    fn attach_existing(
        &self,
        request: &ScriptRequest,
        done: Completion<GoogleMaps>,
    ) -> Result<(), LoadError> {
        let element: HtmlElement = self
            .document
            .get_element_by_id(&request.id)
            .ok_or_else(|| LoadError::Host(format!("script #{} disappeared", request.id)))?
            .dyn_into()
            .map_err(|_| LoadError::Host(format!("#{} is not an HTML element", request.id)))?;
        self.wire(&element, request, done)
    }

    fn remove_script(&self, id: &str) {
        if let Some(element) = self.document.get_element_by_id(id) {
            element.remove();
        }
    }
}

/// `window.google.maps`, once the provider script has run.
fn provider_namespace(window: &Window) -> Option<GoogleMaps> {
    let google = js_sys::Reflect::get(window, &JsValue::from_str("google")).ok()?;
    if !google.is_object() {
        return None;
    }
    let maps = js_sys::Reflect::get(&google, &JsValue::from_str("maps")).ok()?;
    maps.dyn_into::<js_sys::Object>().ok().map(GoogleMaps::new)
}
