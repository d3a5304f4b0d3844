//! Element tree abstraction the views are drawn into.
//!
//! The manager never touches a concrete document. Hosts implement
//! [`Surface`] over whatever tree they render to; [`MemorySurface`] keeps the
//! tree in memory for headless use and tests.

mod memory;

pub use memory::MemorySurface;

use std::fmt;

/// Opaque handle to an element owned by a [`Surface`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u64);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Backend-agnostic element tree operations.
///
/// Methods take `&self`; implementations synchronize internally so a single
/// surface can be shared by the manager and every view it owns.
pub trait Surface: Send + Sync {
    /// The document root. Default container for views.
    fn root(&self) -> ElementId;

    /// Create a detached element.
    fn create_element(&self, tag: &str) -> ElementId;

    fn set_attribute(&self, element: ElementId, name: &str, value: &str);

    fn attribute(&self, element: ElementId, name: &str) -> Option<String>;

    /// Replace the element's content with `markup`.
    fn set_markup(&self, element: ElementId, markup: &str);

    fn markup(&self, element: ElementId) -> Option<String>;

    /// Append `child` as the last child of `parent`, detaching it first.
    fn append(&self, parent: ElementId, child: ElementId);

    /// Remove `element` from its parent. No-op when already detached.
    fn detach(&self, element: ElementId);

    fn parent(&self, element: ElementId) -> Option<ElementId>;

    fn children(&self, element: ElementId) -> Vec<ElementId>;

    /// First attached element matching `selector`, in document order.
    fn query(&self, selector: &str) -> Option<ElementId>;

    /// Detach `element` and forget it. Later calls with the id are no-ops.
    fn release(&self, element: ElementId);

    /// `element` itself or its nearest ancestor carrying attribute `name`.
    fn closest_with_attribute(&self, element: ElementId, name: &str) -> Option<ElementId> {
        let mut current = Some(element);
        while let Some(candidate) = current {
            if self.attribute(candidate, name).is_some() {
                return Some(candidate);
            }
            current = self.parent(candidate);
        }
        None
    }
}
