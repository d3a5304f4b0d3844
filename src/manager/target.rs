//! What a dismiss call points at, and how that maps to a layer index.

use std::sync::Arc;

use crate::surface::{ElementId, Surface};
use crate::view::PageView;

/// Input accepted by [`ViewManager::dismiss`](super::ViewManager::dismiss).
#[derive(Debug, Clone)]
pub enum DismissTarget {
    /// Dismiss this layer and everything above it.
    Index(usize),
    /// Dismiss the layer the view was built for.
    View(Arc<PageView>),
    /// Dismiss the layer of the nearest element (itself or an ancestor)
    /// carrying the layer attribute.
    Element(ElementId),
    /// Like `Element`, starting from the first element matching the selector.
    Selector(String),
}

impl From<usize> for DismissTarget {
    fn from(index: usize) -> Self {
        DismissTarget::Index(index)
    }
}

impl From<Arc<PageView>> for DismissTarget {
    fn from(view: Arc<PageView>) -> Self {
        DismissTarget::View(view)
    }
}

impl From<&Arc<PageView>> for DismissTarget {
    fn from(view: &Arc<PageView>) -> Self {
        DismissTarget::View(Arc::clone(view))
    }
}

impl From<ElementId> for DismissTarget {
    fn from(element: ElementId) -> Self {
        DismissTarget::Element(element)
    }
}

impl From<&str> for DismissTarget {
    fn from(selector: &str) -> Self {
        DismissTarget::Selector(selector.to_string())
    }
}

impl From<String> for DismissTarget {
    fn from(selector: String) -> Self {
        DismissTarget::Selector(selector)
    }
}

/// Resolve `target` to the lowest layer index it dismisses.
///
/// `None` when an element or selector leads to no element carrying
/// `attribute`, or the attribute is not a valid index.
pub fn resolve_layer(target: &DismissTarget, surface: &dyn Surface, attribute: &str) -> Option<usize> {
    let element = match target {
        DismissTarget::Index(index) => return Some(*index),
        DismissTarget::View(view) => return Some(view.layer()),
        DismissTarget::Element(element) => *element,
        DismissTarget::Selector(selector) => surface.query(selector)?,
    };
    let marked = surface.closest_with_attribute(element, attribute)?;
    surface.attribute(marked, attribute)?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::MemorySurface;

    const ATTR: &str = "data-layer-index";

    #[test]
    fn index_resolves_to_itself() {
        let surface = MemorySurface::new();
        assert_eq!(resolve_layer(&DismissTarget::Index(3), &surface, ATTR), Some(3));
    }

    #[test]
    fn element_resolves_through_ancestors() {
        let surface = MemorySurface::new();
        let layer = surface.create_element("div");
        surface.set_attribute(layer, ATTR, "2");
        surface.set_attribute(layer, "class", "view modal");
        surface.append(surface.root(), layer);
        let button = surface.create_element("button");
        surface.append(layer, button);

        assert_eq!(resolve_layer(&button.into(), &surface, ATTR), Some(2));
        assert_eq!(resolve_layer(&layer.into(), &surface, ATTR), Some(2));
        assert_eq!(resolve_layer(&".modal".into(), &surface, ATTR), Some(2));
    }

    #[test]
    fn unmarked_or_unknown_elements_resolve_to_none() {
        let surface = MemorySurface::new();
        let loose = surface.create_element("div");
        surface.append(surface.root(), loose);
        assert_eq!(resolve_layer(&loose.into(), &surface, ATTR), None);
        assert_eq!(resolve_layer(&".nothing".into(), &surface, ATTR), None);
    }

    #[test]
    fn malformed_index_attribute_resolves_to_none() {
        let surface = MemorySurface::new();
        let layer = surface.create_element("div");
        surface.set_attribute(layer, ATTR, "top");
        surface.append(surface.root(), layer);
        assert_eq!(resolve_layer(&layer.into(), &surface, ATTR), None);
    }
}
