//! Enter and exit transitions.

use std::sync::Arc;

use crate::error::ViewError;
use crate::promise::Promise;
use crate::surface::{ElementId, Surface};

use super::PageView;

/// Everything a transition may look at while it plays.
pub struct TransitionContext<'a> {
    pub surface: &'a dyn Surface,
    /// Root element of the view being transitioned. Already attached on enter.
    pub element: ElementId,
    pub container: ElementId,
    pub layer: usize,
    /// Views transitioning the other way at the same time, e.g. the views
    /// exiting while this one enters. Useful for cross-fades.
    pub peers: &'a [Arc<PageView>],
}

/// Plays enter/exit animations. The returned promise settles when the
/// animation is over.
pub trait Transition: Send + Sync {
    fn enter(&self, ctx: &TransitionContext<'_>) -> Promise<(), ViewError>;

    fn exit(&self, ctx: &TransitionContext<'_>) -> Promise<(), ViewError>;
}

/// No animation: both directions settle at once.
#[derive(Debug, Default, Clone, Copy)]
pub struct Immediate;

impl Transition for Immediate {
    fn enter(&self, _ctx: &TransitionContext<'_>) -> Promise<(), ViewError> {
        Promise::resolved(())
    }

    fn exit(&self, _ctx: &TransitionContext<'_>) -> Promise<(), ViewError> {
        Promise::resolved(())
    }
}
