//! A single layer's view and its render/enter/exit/dispose operations.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::cache::Disposable;
use crate::error::ViewError;
use crate::promise::Promise;
use crate::surface::{ElementId, Surface};

use super::lifecycle::{reduce, LifecycleEvent, LifecyclePhase};
use super::template::TemplateEngine;
use super::transition::{Immediate, Transition, TransitionContext};

/// Attribute carrying a view's layer index on its root element.
pub const DEFAULT_LAYER_ATTRIBUTE: &str = "data-layer-index";

/// Class every page view root element carries.
const VIEW_CLASS: &str = "view";

/// Collaborators shared by the manager and every view it creates.
#[derive(Clone)]
pub struct ViewServices {
    surface: Arc<dyn Surface>,
    templates: Arc<dyn TemplateEngine>,
    layer_attribute: Arc<str>,
}

impl ViewServices {
    pub fn new(surface: Arc<dyn Surface>, templates: Arc<dyn TemplateEngine>) -> Self {
        Self {
            surface,
            templates,
            layer_attribute: Arc::from(DEFAULT_LAYER_ATTRIBUTE),
        }
    }

    /// Use `name` instead of `data-layer-index` to mark layer elements.
    pub fn with_layer_attribute(mut self, name: &str) -> Self {
        self.layer_attribute = Arc::from(name);
        self
    }

    pub fn surface(&self) -> &Arc<dyn Surface> {
        &self.surface
    }

    pub fn layer_attribute(&self) -> &str {
        &self.layer_attribute
    }
}

impl fmt::Debug for ViewServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewServices")
            .field("layer_attribute", &self.layer_attribute)
            .finish_non_exhaustive()
    }
}

/// Describes a kind of page view: which template it renders and how it
/// animates. Cheap to clone.
#[derive(Clone)]
pub struct ViewType {
    name: String,
    template: String,
    class_name: Option<String>,
    transition: Arc<dyn Transition>,
}

impl ViewType {
    /// A view type rendering `template` with no transition.
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
            class_name: None,
            transition: Arc::new(Immediate),
        }
    }

    /// Extra class added to the root element next to `view`.
    pub fn with_class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    pub fn with_transition(mut self, transition: Arc<dyn Transition>) -> Self {
        self.transition = transition;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn class_name(&self) -> Option<&str> {
        self.class_name.as_deref()
    }
}

impl fmt::Debug for ViewType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewType")
            .field("name", &self.name)
            .field("template", &self.template)
            .field("class_name", &self.class_name)
            .finish_non_exhaustive()
    }
}

/// Unique identity of a page view, used in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewId(Uuid);

impl ViewId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self.0.simple().to_string();
        f.write_str(&text[..8])
    }
}

struct ViewState {
    phase: LifecyclePhase,
    element: Option<ElementId>,
    model: Option<Arc<Value>>,
    cache_key: Option<String>,
    has_rendered: bool,
}

/// One occupant of a layer.
///
/// The root element is created on first render and owned by the view until
/// it is disposed. The model is shared with the caller, never copied.
pub struct PageView {
    id: ViewId,
    name: String,
    template: String,
    class_name: Option<String>,
    transition: Arc<dyn Transition>,
    layer: usize,
    params: Map<String, Value>,
    services: ViewServices,
    state: Mutex<ViewState>,
}

impl PageView {
    /// Build a view of `view_type` for `layer`.
    ///
    /// `params` are merged onto the view: a string `template` or `className`
    /// overrides the view type's value, everything else stays readable
    /// through [`PageView::params`].
    pub fn new(
        services: ViewServices,
        view_type: &ViewType,
        model: Option<Arc<Value>>,
        layer: usize,
        mut params: Map<String, Value>,
    ) -> Self {
        let template = match params.remove("template") {
            Some(Value::String(template)) => template,
            _ => view_type.template.clone(),
        };
        let class_name = match params.remove("className") {
            Some(Value::String(class_name)) => Some(class_name),
            _ => view_type.class_name.clone(),
        };
        Self {
            id: ViewId::new(),
            name: view_type.name.clone(),
            template,
            class_name,
            transition: Arc::clone(&view_type.transition),
            layer,
            params,
            services,
            state: Mutex::new(ViewState {
                phase: LifecyclePhase::Constructed,
                element: None,
                model,
                cache_key: None,
                has_rendered: false,
            }),
        }
    }

    pub fn id(&self) -> ViewId {
        self.id
    }

    /// Name of the view type this view was built from.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn class_name(&self) -> Option<&str> {
        self.class_name.as_deref()
    }

    /// Layer index fixed at construction. A cached view reloaded onto another
    /// layer keeps this value while its root element is re-marked.
    pub fn layer(&self) -> usize {
        self.layer
    }

    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.state.lock().phase
    }

    pub fn element(&self) -> Option<ElementId> {
        self.state.lock().element
    }

    pub fn model(&self) -> Option<Arc<Value>> {
        self.state.lock().model.clone()
    }

    /// Key the view is cached under; `None` for ephemeral views.
    pub fn cache_key(&self) -> Option<String> {
        self.state.lock().cache_key.clone()
    }

    pub(crate) fn set_cache_key(&self, key: &str) {
        self.state.lock().cache_key = Some(key.to_string());
    }

    pub fn has_rendered(&self) -> bool {
        self.state.lock().has_rendered
    }

    pub fn is_disposed(&self) -> bool {
        self.state.lock().phase.is_disposed()
    }

    /// Render the template into the root element.
    pub fn render(self: &Arc<Self>) -> Promise<(), ViewError> {
        let (model, element) = {
            let mut state = self.state.lock();
            if state.phase.is_disposed() {
                return Promise::rejected(ViewError::Disposed);
            }
            state.phase = reduce(state.phase, LifecycleEvent::RenderStarted);
            let element = match state.element {
                Some(element) => element,
                None => {
                    let element = self.create_root_element();
                    state.element = Some(element);
                    element
                }
            };
            (state.model.clone(), element)
        };

        tracing::debug!(view = %self.id, template = %self.template, layer = self.layer, "Rendering page view");

        let done = Promise::new();
        let result = done.clone();
        let view = Arc::clone(self);
        self.services
            .templates
            .render(&self.template, model.as_deref())
            .always(move |outcome| match outcome {
                Ok(markup) => {
                    {
                        let mut state = view.state.lock();
                        if state.phase.is_disposed() {
                            drop(state);
                            result.reject(ViewError::Disposed);
                            return;
                        }
                        view.services.surface.set_markup(element, markup);
                        state.has_rendered = true;
                        state.phase = reduce(state.phase, LifecycleEvent::RenderSucceeded);
                    }
                    result.resolve(());
                }
                Err(err) => {
                    view.apply(LifecycleEvent::RenderFailed);
                    tracing::warn!(view = %view.id, template = %view.template, error = %err, "Page view render failed");
                    result.reject(err.clone());
                }
            });
        done
    }

    /// Attach the root element to `container` and play the enter transition.
    pub fn enter(
        self: &Arc<Self>,
        container: ElementId,
        exiting: &[Arc<PageView>],
    ) -> Promise<(), ViewError> {
        let element = {
            let mut state = self.state.lock();
            if state.phase.is_disposed() {
                return Promise::rejected(ViewError::Disposed);
            }
            let Some(element) = state.element.filter(|_| state.has_rendered) else {
                return Promise::rejected(ViewError::NotRendered);
            };
            state.phase = reduce(state.phase, LifecycleEvent::EnterStarted);
            element
        };

        let surface = self.services.surface.as_ref();
        surface.append(container, element);
        tracing::debug!(view = %self.id, layer = self.layer, exiting = exiting.len(), "Page view entering");

        let played = self.transition.enter(&TransitionContext {
            surface,
            element,
            container,
            layer: self.layer,
            peers: exiting,
        });
        let view = Arc::clone(self);
        played.always(move |_| view.apply(LifecycleEvent::EnterSettled));
        played
    }

    /// Play the exit transition, then detach the root element from
    /// `container`. The view stays usable; disposal is the caller's call.
    pub fn exit(
        self: &Arc<Self>,
        container: ElementId,
        entering: &[Arc<PageView>],
    ) -> Promise<(), ViewError> {
        let element = {
            let mut state = self.state.lock();
            let Some(element) = state.element else {
                return Promise::resolved(());
            };
            if state.phase.is_disposed() {
                return Promise::resolved(());
            }
            state.phase = reduce(state.phase, LifecycleEvent::ExitStarted);
            element
        };

        tracing::debug!(view = %self.id, layer = self.layer, entering = entering.len(), "Page view exiting");

        let played = self.transition.exit(&TransitionContext {
            surface: self.services.surface.as_ref(),
            element,
            container,
            layer: self.layer,
            peers: entering,
        });
        let view = Arc::clone(self);
        played.always(move |outcome| {
            if outcome.is_ok() {
                let surface = &view.services.surface;
                if surface.parent(element) == Some(container) {
                    surface.detach(element);
                }
            }
            view.apply(LifecycleEvent::ExitSettled);
        });
        played
    }

    /// Point the root element's layer attribute at `layer`, for a view the
    /// manager placed on a slot other than the one it was built for.
    pub(crate) fn mark_layer(&self, layer: usize) {
        let Some(element) = self.element() else {
            return;
        };
        self.services
            .surface
            .set_attribute(element, &self.services.layer_attribute, &layer.to_string());
    }

    /// Release the root element and the model. Idempotent.
    pub fn dispose(&self) {
        let element = {
            let mut state = self.state.lock();
            if state.phase.is_disposed() {
                return;
            }
            state.phase = reduce(state.phase, LifecycleEvent::Disposed);
            state.model = None;
            state.element.take()
        };
        if let Some(element) = element {
            self.services.surface.release(element);
        }
        tracing::debug!(view = %self.id, layer = self.layer, "Page view disposed");
    }

    fn apply(&self, event: LifecycleEvent) {
        let mut state = self.state.lock();
        state.phase = reduce(state.phase, event);
    }

    fn create_root_element(&self) -> ElementId {
        let surface = &self.services.surface;
        let element = surface.create_element("div");
        let class = match &self.class_name {
            Some(extra) => format!("{VIEW_CLASS} {extra}"),
            None => VIEW_CLASS.to_string(),
        };
        surface.set_attribute(element, "class", &class);
        surface.set_attribute(element, &self.services.layer_attribute, &self.layer.to_string());
        element
    }
}

impl Disposable for PageView {
    fn dispose(&self) {
        PageView::dispose(self);
    }
}

impl fmt::Debug for PageView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("PageView")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("layer", &self.layer)
            .field("phase", &state.phase)
            .field("cache_key", &state.cache_key)
            .field("has_rendered", &state.has_rendered)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::MemorySurface;
    use crate::view::TemplateRegistry;
    use serde_json::json;

    fn services() -> (Arc<MemorySurface>, ViewServices) {
        let surface = Arc::new(MemorySurface::new());
        let templates = Arc::new(TemplateRegistry::new());
        templates.register("hello-world", "Hello World");
        templates.register("model-tmpl", "<p>Color is {color}.</p>");
        let services = ViewServices::new(surface.clone(), templates);
        (surface, services)
    }

    fn view(services: &ViewServices, template: &str, layer: usize) -> Arc<PageView> {
        let view_type = ViewType::new("test", template).with_class_name("test-view");
        Arc::new(PageView::new(services.clone(), &view_type, None, layer, Map::new()))
    }

    #[test]
    fn render_writes_markup_and_marks_rendered() {
        let (surface, services) = services();
        let model = Arc::new(json!({ "color": "blue" }));
        let view_type = ViewType::new("test", "model-tmpl");
        let view = Arc::new(PageView::new(services, &view_type, Some(model), 0, Map::new()));

        let rendered = view.render();
        assert!(rendered.is_resolved());
        assert!(view.has_rendered());
        assert_eq!(view.phase(), LifecyclePhase::Rendered);
        let element = view.element().unwrap();
        assert_eq!(surface.markup(element).as_deref(), Some("<p>Color is blue.</p>"));
    }

    #[test]
    fn root_element_carries_class_and_layer_index() {
        let (surface, services) = services();
        let view = view(&services, "hello-world", 2);
        view.render();
        let element = view.element().unwrap();
        assert_eq!(surface.attribute(element, "class").as_deref(), Some("view test-view"));
        assert_eq!(surface.attribute(element, DEFAULT_LAYER_ATTRIBUTE).as_deref(), Some("2"));
    }

    #[test]
    fn failed_render_leaves_view_unrendered() {
        let (_, services) = services();
        let view = view(&services, "missing-template", 0);
        let rendered = view.render();
        assert!(rendered.is_rejected());
        assert!(!view.has_rendered());
        assert_eq!(view.phase(), LifecyclePhase::Constructed);
    }

    #[test]
    fn enter_before_render_is_rejected() {
        let (surface, services) = services();
        let view = view(&services, "hello-world", 0);
        let outcome = view.enter(surface.root(), &[]).outcome().unwrap();
        assert_eq!(*outcome, Err(ViewError::NotRendered));
    }

    #[test]
    fn enter_attaches_and_exit_detaches() {
        let (surface, services) = services();
        let container = surface.append_new(surface.root(), "div", "view-root");
        let view = view(&services, "hello-world", 0);
        view.render();

        assert!(view.enter(container, &[]).is_resolved());
        assert_eq!(surface.children(container), vec![view.element().unwrap()]);
        assert_eq!(view.phase(), LifecyclePhase::Active);

        assert!(view.exit(container, &[]).is_resolved());
        assert!(surface.children(container).is_empty());
        assert_eq!(view.phase(), LifecyclePhase::Inactive);
        assert!(!view.is_disposed());
    }

    #[test]
    fn dispose_is_idempotent_and_releases_the_element() {
        let (surface, services) = services();
        let view = view(&services, "hello-world", 0);
        view.render();
        let element = view.element().unwrap();

        view.dispose();
        view.dispose();

        assert!(view.is_disposed());
        assert!(view.element().is_none());
        assert!(view.model().is_none());
        assert!(!surface.contains(element));
        assert_eq!(*view.render().outcome().unwrap(), Err(ViewError::Disposed));
    }

    #[test]
    fn params_override_template_and_class() {
        let (_, services) = services();
        let view_type = ViewType::new("test", "hello-world");
        let params = json!({ "template": "model-tmpl", "className": "wide", "title": "Home" });
        let Value::Object(params) = params else { unreachable!() };
        let view = PageView::new(services, &view_type, None, 0, params);
        assert_eq!(view.template(), "model-tmpl");
        assert_eq!(view.class_name(), Some("wide"));
        assert_eq!(view.params().get("title"), Some(&json!("Home")));
        assert!(!view.params().contains_key("template"));
    }
}
