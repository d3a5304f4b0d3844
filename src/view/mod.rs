//! Page views and the collaborators they render and animate through.
//!
//! # Lifecycle
//!
//! - `lifecycle.rs` - phase enum, events and the pure reducer
//! - `page_view.rs` - [`PageView`] render/enter/exit/dispose
//! - `template.rs` - [`TemplateEngine`] and the bundled [`TemplateRegistry`]
//! - `transition.rs` - [`Transition`] and the [`Immediate`] default

mod lifecycle;
mod page_view;
mod template;
mod transition;

pub use lifecycle::{reduce, LifecycleEvent, LifecyclePhase};
pub use page_view::{PageView, ViewId, ViewServices, ViewType, DEFAULT_LAYER_ATTRIBUTE};
pub use template::{TemplateEngine, TemplateRegistry};
pub use transition::{Immediate, Transition, TransitionContext};
