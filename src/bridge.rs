//! Autocomplete bridge - mounts a provider widget and republishes selections
//!
//! Each bridge owns one provider widget. The provider namespace comes from
//! the shared [`ResourceLoader`], so any number of bridges on a page cause a
//! single script load.
//!
//! ```text
//! Uninitialized ─► AwaitingProvider ─► Mounted ◄──► AwaitingFieldFetch
//!                        │
//!                        └─► Failed
//! ```

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures::task::{LocalSpawn, LocalSpawnExt};

use crate::config::WidgetConfig;
use crate::error::{BridgeError, FieldFetchError};
use crate::host::ScriptHost;
use crate::loader::ResourceLoader;
use crate::places::{
    AutocompleteOptions, AutocompleteWidget, Dom, PlaceField, PlacePrediction, PlacesApi,
};
use crate::selection::{PlaceOutput, PlaceSelection};

/// Where a bridge puts its widget.
#[derive(Debug, Clone)]
pub enum Mount<E> {
    /// Append the provider widget as a whole.
    Basic { container: E },
    /// Relocate the widget's input (plus a label) into `field` and its
    /// prediction list into `dropdown`. `group` is the containment root for
    /// outside clicks.
    Detached { group: E, field: E, dropdown: E },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeStatus {
    Uninitialized,
    AwaitingProvider,
    Mounted,
    /// Mounted, with at least one selection still fetching fields.
    AwaitingFieldFetch,
    /// Provider load or mounting failed. Terminal.
    Failed,
}

type WidgetOf<H> = <<H as ScriptHost>::Api as PlacesApi>::Widget;
type PredictionOf<H> = <WidgetOf<H> as AutocompleteWidget>::Prediction;

/// Controller for one autocomplete widget instance.
pub struct AutocompleteBridge<H, D>
where
    H: ScriptHost,
    H::Api: PlacesApi<Element = D::Element>,
    D: Dom,
{
    loader: Rc<ResourceLoader<H>>,
    dom: Rc<D>,
    spawner: Rc<dyn LocalSpawn>,
    config: WidgetConfig,
    status: Cell<BridgeStatus>,
    in_flight: Rc<Cell<usize>>,
    output: PlaceOutput,
    widget: RefCell<Option<WidgetOf<H>>>,
    /// (group, dropdown) when mounted detached
    outside_click: RefCell<Option<(D::Element, D::Element)>>,
}

impl<H, D> AutocompleteBridge<H, D>
where
    H: ScriptHost,
    H::Api: PlacesApi<Element = D::Element>,
    D: Dom,
{
    pub fn new(
        loader: Rc<ResourceLoader<H>>,
        dom: Rc<D>,
        spawner: Rc<dyn LocalSpawn>,
        config: WidgetConfig,
    ) -> Self {
        Self {
            loader,
            dom,
            spawner,
            config,
            status: Cell::new(BridgeStatus::Uninitialized),
            in_flight: Rc::new(Cell::new(0)),
            output: PlaceOutput::new(),
            widget: RefCell::new(None),
            outside_click: RefCell::new(None),
        }
    }

    pub fn status(&self) -> BridgeStatus {
        match self.status.get() {
            BridgeStatus::Mounted if self.in_flight.get() > 0 => BridgeStatus::AwaitingFieldFetch,
            status => status,
        }
    }

    /// Run `f` against the mounted provider widget.
    pub fn with_widget<R>(&self, f: impl FnOnce(&WidgetOf<H>) -> R) -> Option<R> {
        self.widget.borrow().as_ref().map(f)
    }

    /// Slot the bridge publishes selections to.
    pub fn output(&self) -> PlaceOutput {
        self.output.clone()
    }

    /// Wait for the provider, construct the widget, mount it, and start
    /// listening for selections. Callable once.
    pub async fn initialize(&self, mount: Mount<D::Element>) -> Result<(), BridgeError> {
        if self.status.get() != BridgeStatus::Uninitialized {
            return Err(BridgeError::AlreadyInitialized);
        }
        self.status.set(BridgeStatus::AwaitingProvider);

        match self.mount_widget(mount).await {
            Ok(()) => {
                self.status.set(BridgeStatus::Mounted);
                tracing::info!("Autocomplete widget mounted");
                Ok(())
            }
            Err(err) => {
                self.status.set(BridgeStatus::Failed);
                tracing::warn!(error = %err, "Autocomplete widget could not be mounted");
                Err(err)
            }
        }
    }

    async fn mount_widget(&self, mount: Mount<D::Element>) -> Result<(), BridgeError> {
        let api = self.loader.get().await?;
        let widget = api.new_autocomplete(&AutocompleteOptions {
            types: self.config.types.clone(),
        })?;

        match mount {
            Mount::Basic { container } => {
                self.dom.append_child(&container, &widget.element())?;
            }
            Mount::Detached {
                group,
                field,
                dropdown,
            } => {
                self.mount_detached(&widget, &field, &dropdown)?;
                self.install_outside_click(group, dropdown)?;
            }
        }

        widget.on_select(self.selection_listener())?;
        *self.widget.borrow_mut() = Some(widget);
        Ok(())
    }

    fn mount_detached(
        &self,
        widget: &WidgetOf<H>,
        field: &D::Element,
        dropdown: &D::Element,
    ) -> Result<(), BridgeError> {
        let dom = &*self.dom;
        let config = &self.config;
        let parts = widget.internal_parts()?;

        let input = &parts.input;
        dom.set_attribute(input, "value", "")?;
        dom.add_class(input, &config.input_class)?;
        dom.set_attribute(input, "id", &config.input_id)?;
        dom.set_attribute(input, "placeholder", &config.placeholder)?;
        dom.set_attribute(input, "autocomplete", &config.autocomplete)?;

        let label = dom.create_element("label")?;
        for class in &config.label_classes {
            dom.add_class(&label, class)?;
        }
        dom.set_attribute(&label, "for", &config.input_id)?;
        dom.set_text(&label, &config.label_text);

        let anchor = dom.create_element("div")?;
        dom.add_class(&anchor, "predictions-anchor")?;
        let list = &parts.prediction_list;
        for class in &config.dropdown_classes {
            dom.add_class(list, class)?;
        }
        dom.set_attribute(list, "part", "prediction-list")?;
        dom.append_child(&anchor, list)?;

        dom.append_child(field, input)?;
        dom.append_child(field, &label)?;
        dom.append_child(dropdown, &anchor)?;
        Ok(())
    }

    fn install_outside_click(
        &self,
        group: D::Element,
        dropdown: D::Element,
    ) -> Result<(), BridgeError> {
        let dom = self.dom.clone();
        let (listener_group, listener_dropdown) = (group.clone(), dropdown.clone());
        self.dom.on_pointer_down(Box::new(move |target: D::Element| {
            toggle_dropdown(&*dom, &listener_group, &listener_dropdown, &target);
        }))?;
        *self.outside_click.borrow_mut() = Some((group, dropdown));
        Ok(())
    }

    /// Show the dropdown when `target` is inside the widget group, hide it otherwise.
    /// No-op unless mounted detached.
    pub fn handle_pointer_down(&self, target: &D::Element) {
        if let Some((group, dropdown)) = &*self.outside_click.borrow() {
            toggle_dropdown(&*self.dom, group, dropdown, target);
        }
    }

    fn selection_listener(&self) -> Box<dyn FnMut(PredictionOf<H>)> {
        let spawner = self.spawner.clone();
        let output = self.output.clone();
        let in_flight = self.in_flight.clone();

        Box::new(move |prediction: PredictionOf<H>| {
            let task_output = output.clone();
            let task_in_flight = in_flight.clone();
            in_flight.set(in_flight.get() + 1);

            let task = async move {
                let fields = PlaceField::SELECTION;
                let outcome = resolve_selection(prediction, &fields).await;
                task_in_flight.set(task_in_flight.get().saturating_sub(1));
                if let Err(err) = &outcome {
                    tracing::warn!(
                        error = %err,
                        transient = err.is_transient(),
                        "Place selection dropped"
                    );
                }
                task_output.publish(outcome);
            };

            if let Err(err) = spawner.spawn_local(task) {
                in_flight.set(in_flight.get().saturating_sub(1));
                tracing::error!(error = %err, "Failed to spawn place field fetch");
                output.publish(Err(FieldFetchError::Fetch(format!(
                    "field fetch could not be scheduled: {err}"
                ))));
            }
        })
    }
}

/// Resolve a selected prediction into a [`PlaceSelection`].
///
/// A place that comes back empty or without every requested field is an
/// error; a partial selection is never produced.
pub async fn resolve_selection<P: PlacePrediction>(
    prediction: P,
    fields: &[PlaceField],
) -> Result<PlaceSelection, FieldFetchError> {
    let place = prediction
        .fetch_fields(fields)
        .await?
        .ok_or(FieldFetchError::Empty)?;
    let selection = PlaceSelection::from_place_json(&place)?;
    tracing::debug!(place = %selection.formatted_address, "Place selected");
    Ok(selection)
}

fn toggle_dropdown<D: Dom>(
    dom: &D,
    group: &D::Element,
    dropdown: &D::Element,
    target: &D::Element,
) {
    let inside = dom.contains(group, target);
    if let Err(err) = dom.set_visible(dropdown, inside) {
        tracing::debug!(error = %err, "Could not toggle prediction dropdown");
    }
}
