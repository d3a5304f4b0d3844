//! Page view lifecycle state machine.

/// Where a page view is in its lifecycle.
///
/// ```text
/// Constructed ─→ Rendering ─→ Rendered ─→ Entering ─→ Active
///      ↑             │                       ↑          │
///      └── failed ───┘                       │       Exiting
///                                            │          │
///                                            └─ Inactive┘
/// ```
///
/// `Disposed` is reachable from every phase and is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecyclePhase {
    #[default]
    Constructed,
    Rendering,
    Rendered,
    Entering,
    Active,
    Exiting,
    /// Exited but kept alive, typically because the view is cached.
    Inactive,
    Disposed,
}

impl LifecyclePhase {
    pub fn is_disposed(self) -> bool {
        matches!(self, Self::Disposed)
    }
}

/// Events that move a page view between phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    RenderStarted,
    RenderSucceeded,
    RenderFailed,
    EnterStarted,
    /// Enter settled, whichever way. The view stays in its layer either way.
    EnterSettled,
    ExitStarted,
    ExitSettled,
    Disposed,
}

/// Pure transition function. Events that do not apply to the current phase
/// leave it unchanged.
pub fn reduce(phase: LifecyclePhase, event: LifecycleEvent) -> LifecyclePhase {
    use LifecycleEvent as Ev;
    use LifecyclePhase as Ph;

    match (phase, event) {
        (Ph::Disposed, _) => Ph::Disposed,
        (_, Ev::Disposed) => Ph::Disposed,

        (Ph::Constructed, Ev::RenderStarted) => Ph::Rendering,
        (Ph::Rendering, Ev::RenderSucceeded) => Ph::Rendered,
        (Ph::Rendering, Ev::RenderFailed) => Ph::Constructed,

        // Cached views re-enter from Inactive without rendering again.
        (Ph::Rendered | Ph::Inactive | Ph::Active, Ev::EnterStarted) => Ph::Entering,
        (Ph::Entering, Ev::EnterSettled) => Ph::Active,

        (Ph::Entering | Ph::Active | Ph::Rendered, Ev::ExitStarted) => Ph::Exiting,
        (Ph::Exiting, Ev::ExitSettled) => Ph::Inactive,

        (other, _) => other,
    }
}
