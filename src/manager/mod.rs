//! Layer orchestration.
//!
//! [`ViewManager`] owns the layer stack and the page-view cache. It builds
//! and renders views on demand, reuses cached ones, and runs a new view's
//! enter transition alongside the exit transitions of the layers it covers.
//!
//! Only one `load` may be in flight per manager. A second call while the
//! first has not settled is rejected with [`ViewError::Locked`]; it is never
//! queued.

mod params;
mod stack;
mod target;

pub use params::LoadParams;
pub use target::{resolve_layer, DismissTarget};

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;

use crate::cache::Cache;
use crate::config::ManagerConfig;
use crate::error::ViewError;
use crate::promise::{when, Promise};
use crate::schedule;
use crate::surface::ElementId;
use crate::view::{PageView, ViewServices, ViewType};

use stack::LayerStack;

struct ManagerState {
    container: ElementId,
    layers: LayerStack,
    page_views: Cache<PageView>,
    entering: Vec<Arc<PageView>>,
    exiting: Vec<Arc<PageView>>,
    locked: bool,
    disposed: bool,
}

/// Manages the stack of page views drawn into one container.
///
/// Cloning yields another handle to the same manager. The internal lock is
/// never held while calling into views or settling promises, so callbacks
/// may call back into the manager.
#[derive(Clone)]
pub struct ViewManager {
    inner: Arc<Mutex<ManagerState>>,
    services: ViewServices,
    step_timeout: Option<Duration>,
}

impl fmt::Debug for ViewManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("ViewManager")
            .field("container", &state.container)
            .field("layers", &state.layers)
            .field("page_views", &state.page_views)
            .field("locked", &state.locked)
            .field("disposed", &state.disposed)
            .finish()
    }
}

impl ViewManager {
    /// Create a manager drawing into the surface root.
    pub fn new(services: ViewServices) -> Self {
        let container = services.surface().root();
        Self {
            inner: Arc::new(Mutex::new(ManagerState {
                container,
                layers: LayerStack::default(),
                page_views: Cache::new(),
                entering: Vec::new(),
                exiting: Vec::new(),
                locked: false,
                disposed: false,
            })),
            services,
            step_timeout: None,
        }
    }

    /// Create a manager from configuration.
    ///
    /// # Errors
    /// Returns [`ViewError::ElementNotFound`] if a configured container
    /// selector matches nothing.
    pub fn from_config(services: ViewServices, config: &ManagerConfig) -> Result<Self, ViewError> {
        let services = services.with_layer_attribute(&config.layer_attribute);
        let mut manager = Self::new(services);
        manager.step_timeout = config.step_timeout();
        if let Some(selector) = &config.container {
            manager.set_container_selector(selector)?;
        }
        Ok(manager)
    }

    /// Bound every render and transition step by `limit`.
    ///
    /// Only armed when a tokio runtime is running.
    pub fn with_step_timeout(mut self, limit: Duration) -> Self {
        self.step_timeout = Some(limit);
        self
    }

    pub fn services(&self) -> &ViewServices {
        &self.services
    }

    /// Use `element` as the container for layers loaded from now on.
    pub fn set_container_element(&self, element: ElementId) -> &Self {
        self.inner.lock().container = element;
        self
    }

    /// Use the first element matching `selector` as the container.
    ///
    /// # Errors
    /// Returns [`ViewError::ElementNotFound`] and keeps the current container
    /// when nothing matches.
    pub fn set_container_selector(&self, selector: &str) -> Result<&Self, ViewError> {
        let element = self
            .services
            .surface()
            .query(selector)
            .ok_or_else(|| ViewError::ElementNotFound(selector.to_string()))?;
        Ok(self.set_container_element(element))
    }

    pub fn container(&self) -> ElementId {
        self.inner.lock().container
    }

    /// Load a view onto a layer.
    ///
    /// A view cached under `key` is reused without rendering again; otherwise
    /// a new view of `view_type` is built for `model`, cached under `key` (if
    /// any) and rendered. Every layer at or above the target is dismissed
    /// while the view enters. The promise resolves with the view once render,
    /// enter and the dismissal all succeeded.
    ///
    /// Failures are not rolled back: a view whose render failed keeps its
    /// cache entry and a failed enter leaves the view in its layer.
    pub fn load(
        &self,
        key: Option<&str>,
        view_type: &ViewType,
        model: Option<Arc<Value>>,
        params: impl Into<LoadParams>,
    ) -> Promise<Arc<PageView>, ViewError> {
        let LoadParams { layer, extras } = params.into();

        let (view, reused) = {
            let mut state = self.inner.lock();
            if state.disposed {
                return Promise::rejected(ViewError::ManagerDisposed);
            }
            if state.locked {
                tracing::debug!(key = ?key, layer, "Load refused, another load is in flight");
                return Promise::rejected(ViewError::Locked);
            }
            state.locked = true;

            match key.and_then(|key| state.page_views.get(key)) {
                Some(view) => (view, true),
                None => {
                    let view = Arc::new(PageView::new(
                        self.services.clone(),
                        view_type,
                        model,
                        layer,
                        extras,
                    ));
                    if let Some(key) = key {
                        view.set_cache_key(key);
                        state.page_views.set(key, Arc::clone(&view));
                    }
                    (view, false)
                }
            }
        };

        let result = Promise::new();
        let manager = self.clone();
        result.always(move |_| manager.inner.lock().locked = false);

        tracing::info!(
            key = ?key,
            view = %view.id(),
            view_type = view.name(),
            layer,
            reused,
            "Loading page view"
        );

        // A cached view whose earlier render failed gets another attempt.
        if view.has_rendered() {
            self.present(view, layer, result.clone());
        } else {
            let manager = self.clone();
            let target = Arc::clone(&view);
            let out = result.clone();
            self.guard(view.render(), "render").always(move |outcome| match outcome {
                Ok(()) => manager.present(target, layer, out),
                Err(err) => {
                    tracing::warn!(view = %target.id(), layer, error = %err, "Load failed during render");
                    out.reject(err.clone());
                }
            });
        }
        result
    }

    /// Dismiss the layer `target` points at and every layer above it.
    ///
    /// A view target resolves to the slot currently holding it, falling back
    /// to the layer it was built for. Targets that resolve to no layer are a
    /// no-op.
    pub fn dismiss(&self, target: impl Into<DismissTarget>) -> Promise<(), ViewError> {
        let target = target.into();
        let placed = match &target {
            DismissTarget::View(view) => self.inner.lock().layers.position(view),
            _ => None,
        };
        let surface = self.services.surface().as_ref();
        let index = placed.or_else(|| resolve_layer(&target, surface, self.services.layer_attribute()));
        match index {
            Some(index) => self.dismiss_layers_from(index, None),
            None => {
                tracing::debug!(dismiss_target = ?target, "Dismiss target resolved to no layer");
                Promise::resolved(())
            }
        }
    }

    /// Dismiss every layer strictly above `index`, except one holding
    /// `except_for`.
    pub fn dismiss_layers_above(
        &self,
        index: usize,
        except_for: Option<&Arc<PageView>>,
    ) -> Promise<(), ViewError> {
        self.dismiss_layers_from(index + 1, except_for)
    }

    /// Dismiss layer `index` and every layer above it, except one holding
    /// `except_for`.
    pub fn dismiss_layers_from(
        &self,
        index: usize,
        except_for: Option<&Arc<PageView>>,
    ) -> Promise<(), ViewError> {
        self.dismiss_layers(index, except_for).0
    }

    /// Drop cache entries.
    ///
    /// With a key, only that entry goes; its view is disposed unless it is
    /// still on screen. Without one, views currently in the stack are taken
    /// out of the cache untouched and every other cached view is disposed.
    pub fn flush(&self, key: Option<&str>) {
        let mut state = self.inner.lock();
        match key {
            Some(key) => {
                let Some(view) = state.page_views.take(key) else {
                    return;
                };
                if state.layers.contains(&view) {
                    tracing::debug!(key, view = %view.id(), "Flushed displayed view, keeping it alive");
                } else {
                    view.dispose();
                }
            }
            None => {
                let displayed: Vec<(String, Arc<PageView>)> = state
                    .layers
                    .occupied()
                    .filter_map(|(_, view)| view.cache_key().map(|key| (key, Arc::clone(view))))
                    .collect();
                for (key, view) in displayed {
                    let cached_here = state
                        .page_views
                        .get(&key)
                        .is_some_and(|cached| Arc::ptr_eq(&cached, &view));
                    if cached_here {
                        state.page_views.take(&key);
                    }
                }
                let dropped = state.page_views.len();
                state.page_views.dispose();
                tracing::info!(dropped, "Flushed page view cache");
            }
        }
    }

    /// Dispose every view in the stack and the cache. Later loads are
    /// rejected with [`ViewError::ManagerDisposed`]. Idempotent.
    pub fn dispose(&self) {
        let stacked = {
            let mut state = self.inner.lock();
            if state.disposed {
                return;
            }
            state.disposed = true;
            state.entering.clear();
            state.exiting.clear();
            state.page_views.dispose();
            state.layers.drain()
        };
        for view in stacked {
            view.dispose();
        }
        tracing::info!("View manager disposed");
    }

    /// The view occupying layer `index`.
    pub fn layer(&self, index: usize) -> Option<Arc<PageView>> {
        self.inner.lock().layers.get(index).cloned()
    }

    /// Every slot of the stack, bottom first. `None` marks a gap.
    pub fn layers(&self) -> Vec<Option<Arc<PageView>>> {
        self.inner.lock().layers.snapshot()
    }

    /// The foreground layer and its view.
    pub fn top_layer(&self) -> Option<(usize, Arc<PageView>)> {
        self.inner
            .lock()
            .layers
            .top()
            .map(|(index, view)| (index, Arc::clone(view)))
    }

    /// The view cached under `key`.
    pub fn cached(&self, key: &str) -> Option<Arc<PageView>> {
        self.inner.lock().page_views.get(key)
    }

    pub fn cache_len(&self) -> usize {
        self.inner.lock().page_views.len()
    }

    pub fn is_locked(&self) -> bool {
        self.inner.lock().locked
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.lock().disposed
    }

    /// Views whose enter transition is in progress or just finished.
    pub fn entering(&self) -> Vec<Arc<PageView>> {
        self.inner.lock().entering.clone()
    }

    /// Views whose exit transition has not settled yet.
    pub fn exiting(&self) -> Vec<Arc<PageView>> {
        self.inner.lock().exiting.clone()
    }

    /// Place a rendered view on `layer`, dismissing what it covers.
    fn present(&self, view: Arc<PageView>, layer: usize, result: Promise<Arc<PageView>, ViewError>) {
        {
            let mut state = self.inner.lock();
            if state.disposed {
                drop(state);
                tracing::debug!(view = %view.id(), layer, "Manager disposed before the view could enter");
                view.dispose();
                result.reject(ViewError::ManagerDisposed);
                return;
            }
            state.entering = vec![Arc::clone(&view)];
        }
        {
            let manager = self.clone();
            let entered = Arc::clone(&view);
            result.success(move |_| {
                schedule::defer(move || {
                    manager
                        .inner
                        .lock()
                        .entering
                        .retain(|current| !Arc::ptr_eq(current, &entered));
                });
            });
        }

        let (dismissal, exiting) = self.dismiss_layers(layer, Some(&view));

        let (already_placed, container) = {
            let mut state = self.inner.lock();
            let already_placed = state.layers.holds(layer, &view);
            if !already_placed {
                // A cached view loaded onto a different layer leaves its old slot.
                let stale: Vec<usize> = state
                    .layers
                    .occupied()
                    .filter(|(_, current)| Arc::ptr_eq(current, &view))
                    .map(|(index, _)| index)
                    .collect();
                for index in stale {
                    state.layers.clear(index);
                }
                state.layers.place(layer, Arc::clone(&view));
            }
            (already_placed, state.container)
        };

        if !already_placed {
            view.mark_layer(layer);
        }

        let settled = if already_placed {
            tracing::debug!(view = %view.id(), layer, "View already on its layer, skipping enter");
            dismissal
        } else {
            let entered = self.guard(view.enter(container, &exiting), "enter");
            when([entered, dismissal])
        };

        settled.always(move |outcome| match outcome {
            Ok(()) => {
                tracing::debug!(view = %view.id(), layer, "Page view loaded");
                result.resolve(view);
            }
            Err(err) => {
                tracing::warn!(view = %view.id(), layer, error = %err, "Load failed during transition");
                result.reject(err.clone());
            }
        });
    }

    /// Start exits for every slot from `start` upward except `except_for`.
    ///
    /// Returns the aggregate exit promise and the exiting views as seen right
    /// after the dismissed ones were registered.
    fn dismiss_layers(
        &self,
        start: usize,
        except_for: Option<&Arc<PageView>>,
    ) -> (Promise<(), ViewError>, Vec<Arc<PageView>>) {
        let (dismissed, container, entering, exiting) = {
            let mut state = self.inner.lock();
            let mut dismissed = Vec::new();
            for index in (start..state.layers.len()).rev() {
                let Some(view) = state.layers.get(index).cloned() else {
                    continue;
                };
                if except_for.is_some_and(|keep| Arc::ptr_eq(keep, &view)) {
                    continue;
                }
                state.layers.clear(index);
                state.exiting.push(Arc::clone(&view));
                dismissed.push((index, view));
            }
            (
                dismissed,
                state.container,
                state.entering.clone(),
                state.exiting.clone(),
            )
        };

        if dismissed.is_empty() {
            return (Promise::resolved(()), exiting);
        }

        let mut exits = Vec::with_capacity(dismissed.len());
        for (index, view) in dismissed {
            tracing::info!(layer = index, view = %view.id(), "Dismissing layer");
            let exit = self.guard(view.exit(container, &entering), "exit");
            let manager = self.clone();
            exit.always(move |outcome| manager.finish_exit(&view, outcome.is_ok()));
            exits.push(exit);
        }
        (when(exits), exiting)
    }

    /// Bookkeeping once a dismissed view's exit settled.
    ///
    /// A view that exited cleanly is disposed once neither the stack nor the
    /// cache holds it. That covers uncached views, views replaced under their
    /// key and views whose key was flushed while they were on screen.
    fn finish_exit(&self, view: &Arc<PageView>, succeeded: bool) {
        let dispose = {
            let mut state = self.inner.lock();
            state.exiting.retain(|current| !Arc::ptr_eq(current, view));
            succeeded && !state.layers.contains(view) && !state.page_views.contains(view)
        };
        if dispose {
            view.dispose();
        }
    }

    fn guard<T>(&self, promise: Promise<T, ViewError>, step: &'static str) -> Promise<T, ViewError>
    where
        T: Clone + Send + Sync + 'static,
    {
        let millis = self
            .step_timeout
            .map(|limit| u64::try_from(limit.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or_default();
        schedule::with_timeout(promise, self.step_timeout, move || {
            tracing::warn!(step, millis, "Step timed out");
            ViewError::Timeout { step, millis }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{MemorySurface, Surface};
    use crate::view::TemplateRegistry;

    fn manager() -> (Arc<MemorySurface>, ViewManager) {
        let surface = Arc::new(MemorySurface::new());
        surface.append_new(surface.root(), "div", "view-root");
        let templates = Arc::new(TemplateRegistry::new());
        templates.register("hello-world", "Hello World");
        let services = ViewServices::new(surface.clone(), templates);
        let manager = ViewManager::from_config(
            services,
            &ManagerConfig {
                container: Some("#view-root".to_string()),
                ..ManagerConfig::default()
            },
        )
        .unwrap();
        (surface, manager)
    }

    #[test]
    fn from_config_resolves_the_container() {
        let (surface, manager) = manager();
        assert_eq!(Some(manager.container()), surface.query("#view-root"));
    }

    #[test]
    fn from_config_rejects_unknown_container() {
        let surface = Arc::new(MemorySurface::new());
        let services = ViewServices::new(surface, Arc::new(TemplateRegistry::new()));
        let config = ManagerConfig {
            container: Some("#absent".to_string()),
            ..ManagerConfig::default()
        };
        let err = ViewManager::from_config(services, &config).unwrap_err();
        assert_eq!(err, ViewError::ElementNotFound("#absent".to_string()));
    }

    #[test]
    fn cached_view_moved_to_another_layer_leaves_its_old_slot() {
        let (_, manager) = manager();
        let view_type = ViewType::new("page", "hello-world");
        manager.load(Some("base"), &view_type, None, 0).outcome().unwrap();
        manager.load(Some("moving"), &view_type, None, 2).outcome().unwrap();
        let moving = manager.cached("moving").unwrap();

        manager.load(Some("moving"), &view_type, None, 1);

        assert!(manager.layer(2).is_none());
        assert!(Arc::ptr_eq(&manager.layer(1).unwrap(), &moving));
        assert!(manager.layer(0).is_some());
    }

    #[test]
    fn disposed_manager_refuses_loads() {
        let (surface, manager) = manager();
        let view_type = ViewType::new("page", "hello-world");
        manager.load(Some("home"), &view_type, None, 0);
        let home = manager.cached("home").unwrap();

        manager.dispose();
        manager.dispose();

        assert!(home.is_disposed());
        assert!(manager.layers().is_empty());
        assert_eq!(manager.cache_len(), 0);
        assert!(surface.children(manager.container()).is_empty());
        let refused = manager.load(Some("home"), &view_type, None, 0);
        assert!(matches!(&*refused.outcome().unwrap(), Err(ViewError::ManagerDisposed)));
    }
}
