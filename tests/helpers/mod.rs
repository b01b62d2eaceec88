//! In-memory doubles for the script host, provider API and DOM.
//!
//! The host records every script insertion, attachment and global callback
//! claim, and holds completions until a test decides how the load ends.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::rc::{Rc, Weak};

use futures::channel::oneshot;
use futures::future::{self, FutureExt, LocalBoxFuture};
use serde_json::Value;

use places_autocomplete::{
    AutocompleteOptions, AutocompleteWidget, BridgeError, Completion, Dom, FieldFetchError,
    LoadError, PlaceField, PlacePrediction, PlacesApi, ScriptHost, ScriptRequest, WidgetParts,
};

/// Route `tracing` output to the test harness; `RUST_LOG` picks the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// =============================================================================
// Script host
// =============================================================================

#[derive(Default)]
struct HostInner {
    present: RefCell<HashSet<String>>,
    installed: RefCell<Option<FakeApi>>,
    inserted: RefCell<Vec<ScriptRequest>>,
    attached: Cell<usize>,
    removed: RefCell<Vec<String>>,
    callbacks: RefCell<Vec<String>>,
    pending: RefCell<Vec<Completion<FakeApi>>>,
    fail_next_insert: RefCell<Option<LoadError>>,
    on_insert: RefCell<Option<Box<dyn FnOnce()>>>,
}

/// Script host double. Clones share state, so a test can keep a handle
/// after moving one into a loader.
#[derive(Clone, Default)]
pub struct FakeHost {
    inner: Rc<HostInner>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a script tag inserted by unrelated code.
    pub fn with_existing_script(self, id: &str) -> Self {
        self.inner.present.borrow_mut().insert(id.to_string());
        self
    }

    /// Simulate the provider namespace already being installed.
    pub fn with_installed_api(self, api: FakeApi) -> Self {
        *self.inner.installed.borrow_mut() = Some(api);
        self
    }

    pub fn fail_next_insert(&self, err: LoadError) {
        *self.inner.fail_next_insert.borrow_mut() = Some(err);
    }

    /// Run `hook` while the next script element is being inserted.
    pub fn on_insert(&self, hook: impl FnOnce() + 'static) {
        *self.inner.on_insert.borrow_mut() = Some(Box::new(hook));
    }

    /// The script ran: install the namespace and fire the callback.
    pub fn load_succeeds(&self, api: &FakeApi) {
        *self.inner.installed.borrow_mut() = Some(api.clone());
        self.finish(Ok(api.clone()));
    }

    /// The script element fired its error event.
    pub fn load_fails(&self, err: LoadError) {
        self.finish(Err(err));
    }

    fn finish(&self, outcome: Result<FakeApi, LoadError>) {
        let pending: Vec<_> = self.inner.pending.borrow_mut().drain(..).collect();
        for done in pending {
            done(outcome.clone());
        }
    }

    pub fn insertions(&self) -> Vec<ScriptRequest> {
        self.inner.inserted.borrow().clone()
    }

    pub fn attachments(&self) -> usize {
        self.inner.attached.get()
    }

    pub fn removed(&self) -> Vec<String> {
        self.inner.removed.borrow().clone()
    }

    pub fn callbacks(&self) -> Vec<String> {
        self.inner.callbacks.borrow().clone()
    }

    pub fn pending_completions(&self) -> usize {
        self.inner.pending.borrow().len()
    }

    /// Number of document mutations performed so far.
    pub fn mutations(&self) -> usize {
        self.inner.inserted.borrow().len() + self.inner.removed.borrow().len()
    }
}

impl ScriptHost for FakeHost {
    type Api = FakeApi;

    fn script_exists(&self, id: &str) -> bool {
        self.inner.present.borrow().contains(id)
    }

    fn provider_api(&self) -> Option<FakeApi> {
        self.inner.installed.borrow().clone()
    }

    fn insert_script(
        &self,
        request: &ScriptRequest,
        done: Completion<FakeApi>,
    ) -> Result<(), LoadError> {
        if let Some(err) = self.inner.fail_next_insert.borrow_mut().take() {
            return Err(err);
        }
        self.inner.callbacks.borrow_mut().push(request.callback.clone());
        self.inner.pending.borrow_mut().push(done);
        self.inner.present.borrow_mut().insert(request.id.clone());
        self.inner.inserted.borrow_mut().push(request.clone());

        let hook = self.inner.on_insert.borrow_mut().take();
        if let Some(hook) = hook {
            hook();
        }
        Ok(())
    }

    fn attach_existing(
        &self,
        request: &ScriptRequest,
        done: Completion<FakeApi>,
    ) -> Result<(), LoadError> {
        self.inner.callbacks.borrow_mut().push(request.callback.clone());
        self.inner.pending.borrow_mut().push(done);
        self.inner.attached.set(self.inner.attached.get() + 1);
        Ok(())
    }

    fn remove_script(&self, id: &str) {
        self.inner.present.borrow_mut().remove(id);
        self.inner.removed.borrow_mut().push(id.to_string());
    }
}

// =============================================================================
// Provider API
// =============================================================================

#[derive(Default)]
struct ApiInner {
    widgets: RefCell<Vec<FakeWidget>>,
    options: RefCell<Vec<AutocompleteOptions>>,
    hide_internals: Cell<bool>,
}

/// Provider namespace double. Identity is the shared allocation.
#[derive(Clone, Default)]
pub struct FakeApi {
    inner: Rc<ApiInner>,
}

impl fmt::Debug for FakeApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FakeApi({:p})", Rc::as_ptr(&self.inner))
    }
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn same_as(&self, other: &FakeApi) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Make widgets refuse to expose their internal elements.
    pub fn hide_internals(&self) {
        self.inner.hide_internals.set(true);
    }

    pub fn widgets(&self) -> Vec<FakeWidget> {
        self.inner.widgets.borrow().clone()
    }

    pub fn options(&self) -> Vec<AutocompleteOptions> {
        self.inner.options.borrow().clone()
    }
}

impl PlacesApi for FakeApi {
    type Element = FakeElement;
    type Widget = FakeWidget;

    fn new_autocomplete(&self, options: &AutocompleteOptions) -> Result<FakeWidget, BridgeError> {
        self.inner.options.borrow_mut().push(options.clone());
        let widget = FakeWidget {
            inner: Rc::new(WidgetInner {
                element: FakeElement::new("gmp-place-autocomplete"),
                input: FakeElement::new("input"),
                prediction_list: FakeElement::new("ul"),
                hide_internals: self.inner.hide_internals.get(),
                listeners: RefCell::new(Vec::new()),
            }),
        };
        self.inner.widgets.borrow_mut().push(widget.clone());
        Ok(widget)
    }
}

struct WidgetInner {
    element: FakeElement,
    input: FakeElement,
    prediction_list: FakeElement,
    hide_internals: bool,
    listeners: RefCell<Vec<Box<dyn FnMut(FakePrediction)>>>,
}

#[derive(Clone)]
pub struct FakeWidget {
    inner: Rc<WidgetInner>,
}

impl FakeWidget {
    pub fn input(&self) -> FakeElement {
        self.inner.input.clone()
    }

    pub fn prediction_list(&self) -> FakeElement {
        self.inner.prediction_list.clone()
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    /// Fire the provider's selection event.
    pub fn select(&self, prediction: FakePrediction) {
        let mut listeners = std::mem::take(&mut *self.inner.listeners.borrow_mut());
        let mut prediction = Some(prediction);
        for listener in listeners.iter_mut() {
            if let Some(prediction) = prediction.take() {
                listener(prediction);
            }
        }
        self.inner.listeners.borrow_mut().extend(listeners);
    }
}

impl AutocompleteWidget for FakeWidget {
    type Element = FakeElement;
    type Prediction = FakePrediction;

    fn element(&self) -> FakeElement {
        self.inner.element.clone()
    }

    fn internal_parts(&self) -> Result<WidgetParts<FakeElement>, BridgeError> {
        if self.inner.hide_internals {
            return Err(BridgeError::Widget("internal input not found".into()));
        }
        Ok(WidgetParts {
            input: self.inner.input.clone(),
            prediction_list: self.inner.prediction_list.clone(),
        })
    }

    fn on_select(&self, listener: Box<dyn FnMut(FakePrediction)>) -> Result<(), BridgeError> {
        self.inner.listeners.borrow_mut().push(listener);
        Ok(())
    }
}

type FetchResult = Result<Option<Value>, FieldFetchError>;

/// Prediction double whose field fetch resolves to a canned result.
pub struct FakePrediction {
    result: LocalBoxFuture<'static, FetchResult>,
    requested: Rc<RefCell<Vec<PlaceField>>>,
}

impl FakePrediction {
    fn from_future(result: LocalBoxFuture<'static, FetchResult>) -> Self {
        Self {
            result,
            requested: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn resolving(place: Value) -> Self {
        Self::from_future(future::ready(Ok(Some(place))).boxed_local())
    }

    pub fn empty() -> Self {
        Self::from_future(future::ready(Ok(None)).boxed_local())
    }

    pub fn failing(err: FieldFetchError) -> Self {
        Self::from_future(future::ready(Err(err)).boxed_local())
    }

    /// A fetch that stays in flight until the sender is used.
    pub fn deferred() -> (Self, oneshot::Sender<FetchResult>) {
        let (tx, rx) = oneshot::channel();
        let result = rx
            .map(|r| r.unwrap_or_else(|_| Err(FieldFetchError::Fetch("cancelled".into()))))
            .boxed_local();
        (Self::from_future(result), tx)
    }

    /// Fields the bridge asked for, filled in once the fetch starts.
    pub fn requested_fields(&self) -> Rc<RefCell<Vec<PlaceField>>> {
        self.requested.clone()
    }
}

impl PlacePrediction for FakePrediction {
    fn fetch_fields(self, fields: &[PlaceField]) -> LocalBoxFuture<'static, FetchResult> {
        self.requested.borrow_mut().extend_from_slice(fields);
        self.result
    }
}

// =============================================================================
// DOM
// =============================================================================

struct Node {
    tag: String,
    parent: RefCell<Weak<Node>>,
    children: RefCell<Vec<FakeElement>>,
    attributes: RefCell<BTreeMap<String, String>>,
    classes: RefCell<Vec<String>>,
    text: RefCell<String>,
    visible: Cell<bool>,
}

/// Element double. Equality is identity.
#[derive(Clone)]
pub struct FakeElement(Rc<Node>);

impl PartialEq for FakeElement {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for FakeElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.0.tag)?;
        for (name, value) in self.0.attributes.borrow().iter() {
            write!(f, " {name}=\"{value}\"")?;
        }
        write!(f, ">")
    }
}

impl FakeElement {
    pub fn new(tag: &str) -> Self {
        FakeElement(Rc::new(Node {
            tag: tag.to_string(),
            parent: RefCell::new(Weak::new()),
            children: RefCell::new(Vec::new()),
            attributes: RefCell::new(BTreeMap::new()),
            classes: RefCell::new(Vec::new()),
            text: RefCell::new(String::new()),
            visible: Cell::new(true),
        }))
    }

    pub fn tag(&self) -> &str {
        &self.0.tag
    }

    pub fn parent(&self) -> Option<FakeElement> {
        self.0.parent.borrow().upgrade().map(FakeElement)
    }

    pub fn children(&self) -> Vec<FakeElement> {
        self.0.children.borrow().clone()
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.0.attributes.borrow().get(name).cloned()
    }

    pub fn classes(&self) -> Vec<String> {
        self.0.classes.borrow().clone()
    }

    pub fn text(&self) -> String {
        self.0.text.borrow().clone()
    }

    pub fn is_visible(&self) -> bool {
        self.0.visible.get()
    }

    /// Append without going through a bridge, for building fixtures.
    pub fn adopt(&self, child: &FakeElement) {
        FakeDom::default()
            .append_child(self, child)
            .expect("fake append cannot fail");
    }
}

/// DOM double. Pointer-down listeners are kept so tests can dispatch.
#[derive(Default)]
pub struct FakeDom {
    pointer_listeners: RefCell<Vec<Box<dyn FnMut(FakeElement)>>>,
}

impl FakeDom {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pointer_listener_count(&self) -> usize {
        self.pointer_listeners.borrow().len()
    }

    /// Dispatch a document-level pointer-down on `target`.
    pub fn pointer_down(&self, target: &FakeElement) {
        let mut listeners = std::mem::take(&mut *self.pointer_listeners.borrow_mut());
        for listener in listeners.iter_mut() {
            listener(target.clone());
        }
        self.pointer_listeners.borrow_mut().extend(listeners);
    }
}

impl Dom for FakeDom {
    type Element = FakeElement;

    fn create_element(&self, tag: &str) -> Result<FakeElement, BridgeError> {
        Ok(FakeElement::new(tag))
    }

    fn append_child(&self, parent: &FakeElement, child: &FakeElement) -> Result<(), BridgeError> {
        if let Some(previous) = child.parent() {
            previous.0.children.borrow_mut().retain(|c| c != child);
        }
        *child.0.parent.borrow_mut() = Rc::downgrade(&parent.0);
        parent.0.children.borrow_mut().push(child.clone());
        Ok(())
    }

    fn set_attribute(
        &self,
        element: &FakeElement,
        name: &str,
        value: &str,
    ) -> Result<(), BridgeError> {
        element
            .0
            .attributes
            .borrow_mut()
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn add_class(&self, element: &FakeElement, class: &str) -> Result<(), BridgeError> {
        let mut classes = element.0.classes.borrow_mut();
        if !classes.iter().any(|c| c == class) {
            classes.push(class.to_string());
        }
        Ok(())
    }

    fn set_text(&self, element: &FakeElement, text: &str) {
        *element.0.text.borrow_mut() = text.to_string();
    }

    fn contains(&self, container: &FakeElement, target: &FakeElement) -> bool {
        let mut current = Some(target.clone());
        while let Some(node) = current {
            if &node == container {
                return true;
            }
            current = node.parent();
        }
        false
    }

    fn set_visible(&self, element: &FakeElement, visible: bool) -> Result<(), BridgeError> {
        element.0.visible.set(visible);
        Ok(())
    }

    fn on_pointer_down(&self, listener: Box<dyn FnMut(FakeElement)>) -> Result<(), BridgeError> {
        self.pointer_listeners.borrow_mut().push(listener);
        Ok(())
    }
}
