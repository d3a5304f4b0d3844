//! Shared test utilities and fixtures.

#![allow(dead_code, unused_imports)]

use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use viewstack::{
    ElementId, ManagerConfig, MemorySurface, Promise, Surface, TemplateEngine, TemplateRegistry,
    Transition, TransitionContext, TransitionPhase, ViewError, ViewManager, ViewServices, ViewType,
};

pub const HELLO_TEMPLATE: &str = "hello-world";

/// A manager drawing into `#view-root` plus handles to its collaborators.
pub struct Fixture {
    pub surface: Arc<MemorySurface>,
    pub templates: Arc<TemplateRegistry>,
    pub manager: ViewManager,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(ManagerConfig {
            container: Some("#view-root".to_string()),
            ..ManagerConfig::default()
        })
    }

    pub fn with_config(config: ManagerConfig) -> Self {
        let surface = Arc::new(MemorySurface::new());
        surface.append_new(surface.root(), "div", "view-root");
        let templates = Arc::new(TemplateRegistry::new());
        templates.register(HELLO_TEMPLATE, "Hello World");
        templates.register("greeting", "Hello {name}");
        let services = ViewServices::new(surface.clone(), templates.clone());
        let manager = ViewManager::from_config(services, &config).expect("valid fixture config");
        Self {
            surface,
            templates,
            manager,
        }
    }

    /// A manager built on a custom template engine.
    pub fn with_engine(engine: Arc<dyn TemplateEngine>) -> (Arc<MemorySurface>, ViewManager) {
        let surface = Arc::new(MemorySurface::new());
        let root = surface.append_new(surface.root(), "div", "view-root");
        let manager = ViewManager::new(ViewServices::new(surface.clone(), engine));
        manager.set_container_element(root);
        (surface, manager)
    }

    pub fn container(&self) -> ElementId {
        self.manager.container()
    }

    pub fn child_count(&self) -> usize {
        self.surface.children(self.container()).len()
    }
}

pub fn hello_view() -> ViewType {
    ViewType::new("hello", HELLO_TEMPLATE)
}

/// Transition whose promises are settled by the test.
#[derive(Default)]
pub struct ManualTransition {
    enters: Mutex<Vec<Promise<(), ViewError>>>,
    exits: Mutex<Vec<Promise<(), ViewError>>>,
}

impl ManualTransition {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn pending_enters(&self) -> usize {
        self.enters.lock().iter().filter(|p| p.is_pending()).count()
    }

    pub fn pending_exits(&self) -> usize {
        self.exits.lock().iter().filter(|p| p.is_pending()).count()
    }

    pub fn finish_enters(&self) {
        let enters: Vec<_> = self.enters.lock().drain(..).collect();
        for enter in enters {
            enter.resolve(());
        }
    }

    pub fn fail_enters(&self, message: &str) {
        let enters: Vec<_> = self.enters.lock().drain(..).collect();
        for enter in enters {
            enter.reject(ViewError::transition(TransitionPhase::Enter, 0, message));
        }
    }

    pub fn finish_exits(&self) {
        let exits: Vec<_> = self.exits.lock().drain(..).collect();
        for exit in exits {
            exit.resolve(());
        }
    }
}

impl Transition for ManualTransition {
    fn enter(&self, _ctx: &TransitionContext<'_>) -> Promise<(), ViewError> {
        let promise = Promise::new();
        self.enters.lock().push(promise.clone());
        promise
    }

    fn exit(&self, _ctx: &TransitionContext<'_>) -> Promise<(), ViewError> {
        let promise = Promise::new();
        self.exits.lock().push(promise.clone());
        promise
    }
}

/// Template engine that never settles on its own and counts renders.
#[derive(Default)]
pub struct ManualTemplates {
    pending: Mutex<Vec<Promise<String, ViewError>>>,
    renders: Mutex<usize>,
}

impl ManualTemplates {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn renders(&self) -> usize {
        *self.renders.lock()
    }

    pub fn finish(&self, markup: &str) {
        let pending: Vec<_> = self.pending.lock().drain(..).collect();
        for promise in pending {
            promise.resolve(markup.to_string());
        }
    }

    pub fn fail(&self, message: &str) {
        let pending: Vec<_> = self.pending.lock().drain(..).collect();
        for promise in pending {
            promise.reject(ViewError::render("manual", message));
        }
    }
}

impl TemplateEngine for ManualTemplates {
    fn render(&self, _template: &str, _model: Option<&Value>) -> Promise<String, ViewError> {
        *self.renders.lock() += 1;
        let promise = Promise::new();
        self.pending.lock().push(promise.clone());
        promise
    }
}

/// Let spawned deferred tasks run.
pub async fn settle_deferred() {
    for _ in 0..4 {
        tokio::task::yield_now().await;
    }
}
