//! DOM operations on caller-supplied mount points, and the document-wide
//! pointer-down listener used for outside-click handling.

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlElement, MouseEvent, Node};

use super::js_message;
use crate::error::BridgeError;
use crate::places::Dom;

/// [`Dom`] over the live page document.
pub struct BrowserDom {
    document: Document,
}

impl BrowserDom {
    pub fn new() -> Result<Self, BridgeError> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| BridgeError::Dom("No document".into()))?;
        Ok(Self { document })
    }
}

fn dom_error(err: JsValue) -> BridgeError {
    BridgeError::Dom(js_message(&err))
}

impl Dom for BrowserDom {
    type Element = Element;

    fn create_element(&self, tag: &str) -> Result<Element, BridgeError> {
        self.document.create_element(tag).map_err(dom_error)
    }

    fn append_child(&self, parent: &Element, child: &Element) -> Result<(), BridgeError> {
        parent.append_child(child).map(|_| ()).map_err(dom_error)
    }

    fn set_attribute(&self, element: &Element, name: &str, value: &str) -> Result<(), BridgeError> {
        element.set_attribute(name, value).map_err(dom_error)
    }

    fn add_class(&self, element: &Element, class: &str) -> Result<(), BridgeError> {
        element.class_list().add_1(class).map_err(dom_error)
    }

    fn set_text(&self, element: &Element, text: &str) {
        element.set_text_content(Some(text));
    }

    fn contains(&self, container: &Element, target: &Element) -> bool {
        let target: &Node = target;
        container.contains(Some(target))
    }

    fn set_visible(&self, element: &Element, visible: bool) -> Result<(), BridgeError> {
        let element: &HtmlElement = element
            .dyn_ref()
            .ok_or_else(|| BridgeError::Dom("dropdown is not an HTML element".into()))?;
        let display = if visible { "" } else { "none" };
        element
            .style()
            .set_property("display", display)
            .map_err(dom_error)
    }

    fn on_pointer_down(&self, mut listener: Box<dyn FnMut(Element)>) -> Result<(), BridgeError> {
        let callback = Closure::<dyn FnMut(MouseEvent)>::new(move |event: MouseEvent| {
            let Some(node) = event.target().and_then(|t| t.dyn_into::<Node>().ok()) else {
                return;
            };
            // Text nodes report their parent element
            let target = match node.dyn_into::<Element>() {
                Ok(element) => Some(element),
                Err(node) => node.parent_element(),
            };
            if let Some(target) = target {
                listener(target);
            }
        });
        self.document
            .add_event_listener_with_callback("mousedown", callback.as_ref().unchecked_ref())
            .map_err(dom_error)?;
        callback.forget();
        Ok(())
    }
}
