//! Layered page-view management.
//!
//! A [`ViewManager`] keeps a stack of [`PageView`]s drawn into one container
//! element of a [`Surface`]. Loading a view onto a layer renders it (or
//! reuses a cached instance), plays its enter transition and dismisses every
//! layer above it. All asynchronous steps report through [`Promise`].

pub mod cache;
pub mod config;
pub mod error;
pub mod logging;
pub mod manager;
pub mod promise;
mod schedule;
pub mod surface;
pub mod view;

pub use cache::{Cache, Disposable};
pub use config::{Config, ConfigError, ManagerConfig};
pub use error::{TransitionPhase, ViewError};
pub use manager::{DismissTarget, LoadParams, ViewManager};
pub use promise::{when, Promise};
pub use surface::{ElementId, MemorySurface, Surface};
pub use view::{
    Immediate, LifecyclePhase, PageView, TemplateEngine, TemplateRegistry, Transition,
    TransitionContext, ViewId, ViewServices, ViewType,
};
