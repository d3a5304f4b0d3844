//! Error types for view loading and dismissal.

use std::fmt;

use thiserror::Error;

/// Which half of a transition failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionPhase {
    Enter,
    Exit,
}

impl fmt::Display for TransitionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionPhase::Enter => f.write_str("enter"),
            TransitionPhase::Exit => f.write_str("exit"),
        }
    }
}

/// Errors surfaced through rejected promises.
///
/// Cloneable because a single rejection may be observed by several
/// callbacks and aggregate results.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewError {
    /// A load was requested while another load was still in flight.
    #[error("locked")]
    Locked,

    /// The template engine could not produce markup.
    #[error("template '{template}' failed to render: {message}")]
    Render { template: String, message: String },

    /// An enter or exit transition rejected.
    #[error("{phase} transition failed on layer {layer}: {message}")]
    Transition {
        phase: TransitionPhase,
        layer: usize,
        message: String,
    },

    /// The view has no element yet because it was never rendered.
    #[error("view has not been rendered")]
    NotRendered,

    /// The view was disposed and can no longer be used.
    #[error("view has been disposed")]
    Disposed,

    /// The manager was disposed and refuses further loads.
    #[error("view manager has been disposed")]
    ManagerDisposed,

    /// A selector did not match any element.
    #[error("no element matches selector '{0}'")]
    ElementNotFound(String),

    /// A render or transition step did not settle in time.
    #[error("{step} did not settle within {millis}ms")]
    Timeout { step: &'static str, millis: u64 },
}

impl ViewError {
    /// Build a render error for `template`.
    pub fn render(template: impl Into<String>, message: impl Into<String>) -> Self {
        ViewError::Render {
            template: template.into(),
            message: message.into(),
        }
    }

    /// Build a transition error for the view on `layer`.
    pub fn transition(phase: TransitionPhase, layer: usize, message: impl Into<String>) -> Self {
        ViewError::Transition {
            phase,
            layer,
            message: message.into(),
        }
    }

    /// Stable identifier for the error kind, suitable for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ViewError::Locked => "locked",
            ViewError::Render { .. } => "render_error",
            ViewError::Transition { .. } => "transition_error",
            ViewError::NotRendered => "not_rendered",
            ViewError::Disposed => "disposed",
            ViewError::ManagerDisposed => "manager_disposed",
            ViewError::ElementNotFound(_) => "element_not_found",
            ViewError::Timeout { .. } => "timeout",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locked_reason_is_plain() {
        assert_eq!(ViewError::Locked.to_string(), "locked");
        assert_eq!(ViewError::Locked.kind(), "locked");
    }

    #[test]
    fn transition_message_names_phase_and_layer() {
        let err = ViewError::transition(TransitionPhase::Exit, 2, "interrupted");
        assert_eq!(err.to_string(), "exit transition failed on layer 2: interrupted");
        assert_eq!(err.kind(), "transition_error");
    }

    #[test]
    fn render_error_kind() {
        let err = ViewError::render("hello-world", "missing");
        assert_eq!(err.kind(), "render_error");
        assert!(err.to_string().contains("hello-world"));
    }
}
