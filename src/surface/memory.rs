//! In-memory element tree.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use super::{ElementId, Surface};

#[derive(Debug, Default)]
struct Node {
    tag: String,
    attributes: BTreeMap<String, String>,
    markup: String,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
}

/// Headless [`Surface`] keeping every element in a map.
///
/// Selectors support a single compound selector: an optional tag followed by
/// any number of `#id`, `.class` and `[attr]` / `[attr="value"]` parts.
#[derive(Debug)]
pub struct MemorySurface {
    nodes: Mutex<HashMap<ElementId, Node>>,
    next_id: AtomicU64,
    root: ElementId,
}

impl Default for MemorySurface {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySurface {
    /// Create a surface holding only a `body` root element.
    pub fn new() -> Self {
        let root = ElementId(0);
        let mut nodes = HashMap::new();
        nodes.insert(
            root,
            Node {
                tag: "body".to_string(),
                ..Node::default()
            },
        );
        Self {
            nodes: Mutex::new(nodes),
            next_id: AtomicU64::new(1),
            root,
        }
    }

    /// Create an element with an `id` attribute and append it to `parent`.
    pub fn append_new(&self, parent: ElementId, tag: &str, id: &str) -> ElementId {
        let element = self.create_element(tag);
        self.set_attribute(element, "id", id);
        self.append(parent, element);
        element
    }

    /// Whether `element` is still known to the surface.
    pub fn contains(&self, element: ElementId) -> bool {
        self.nodes.lock().contains_key(&element)
    }

    fn detach_locked(nodes: &mut HashMap<ElementId, Node>, element: ElementId) {
        let Some(parent) = nodes.get_mut(&element).and_then(|node| node.parent.take()) else {
            return;
        };
        if let Some(parent) = nodes.get_mut(&parent) {
            parent.children.retain(|child| *child != element);
        }
    }

    fn release_locked(nodes: &mut HashMap<ElementId, Node>, element: ElementId) {
        Self::detach_locked(nodes, element);
        if let Some(node) = nodes.remove(&element) {
            for child in node.children {
                if let Some(child_node) = nodes.get_mut(&child) {
                    child_node.parent = None;
                }
                Self::release_locked(nodes, child);
            }
        }
    }
}

impl Surface for MemorySurface {
    fn root(&self) -> ElementId {
        self.root
    }

    fn create_element(&self, tag: &str) -> ElementId {
        let id = ElementId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.nodes.lock().insert(
            id,
            Node {
                tag: tag.to_ascii_lowercase(),
                ..Node::default()
            },
        );
        id
    }

    fn set_attribute(&self, element: ElementId, name: &str, value: &str) {
        if let Some(node) = self.nodes.lock().get_mut(&element) {
            node.attributes.insert(name.to_string(), value.to_string());
        }
    }

    fn attribute(&self, element: ElementId, name: &str) -> Option<String> {
        self.nodes
            .lock()
            .get(&element)
            .and_then(|node| node.attributes.get(name).cloned())
    }

    fn set_markup(&self, element: ElementId, markup: &str) {
        if let Some(node) = self.nodes.lock().get_mut(&element) {
            node.markup = markup.to_string();
        }
    }

    fn markup(&self, element: ElementId) -> Option<String> {
        self.nodes.lock().get(&element).map(|node| node.markup.clone())
    }

    fn append(&self, parent: ElementId, child: ElementId) {
        let mut nodes = self.nodes.lock();
        if parent == child || !nodes.contains_key(&parent) || !nodes.contains_key(&child) {
            return;
        }
        Self::detach_locked(&mut nodes, child);
        if let Some(node) = nodes.get_mut(&child) {
            node.parent = Some(parent);
        }
        if let Some(node) = nodes.get_mut(&parent) {
            node.children.push(child);
        }
    }

    fn detach(&self, element: ElementId) {
        Self::detach_locked(&mut self.nodes.lock(), element);
    }

    fn parent(&self, element: ElementId) -> Option<ElementId> {
        self.nodes.lock().get(&element).and_then(|node| node.parent)
    }

    fn children(&self, element: ElementId) -> Vec<ElementId> {
        self.nodes
            .lock()
            .get(&element)
            .map(|node| node.children.clone())
            .unwrap_or_default()
    }

    fn query(&self, selector: &str) -> Option<ElementId> {
        let selector = Selector::parse(selector)?;
        let nodes = self.nodes.lock();
        let mut stack = vec![self.root];
        while let Some(current) = stack.pop() {
            let node = nodes.get(&current)?;
            if current != self.root && selector.matches(node) {
                return Some(current);
            }
            stack.extend(node.children.iter().rev().copied());
        }
        None
    }

    fn release(&self, element: ElementId) {
        if element == self.root {
            return;
        }
        Self::release_locked(&mut self.nodes.lock(), element);
    }
}

#[derive(Debug, Default, PartialEq)]
struct Selector {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<(String, Option<String>)>,
}

impl Selector {
    fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }
        let mut selector = Selector::default();
        let mut rest = input;

        let tag_end = rest.find(['#', '.', '[']).unwrap_or(rest.len());
        if tag_end > 0 {
            selector.tag = Some(rest[..tag_end].to_ascii_lowercase());
        }
        rest = &rest[tag_end..];

        while let Some(marker) = rest.chars().next() {
            rest = &rest[marker.len_utf8()..];
            match marker {
                '#' | '.' => {
                    let end = rest.find(['#', '.', '[']).unwrap_or(rest.len());
                    let name = &rest[..end];
                    if name.is_empty() {
                        return None;
                    }
                    if marker == '#' {
                        selector.id = Some(name.to_string());
                    } else {
                        selector.classes.push(name.to_string());
                    }
                    rest = &rest[end..];
                }
                '[' => {
                    let end = rest.find(']')?;
                    let body = &rest[..end];
                    let attribute = match body.split_once('=') {
                        Some((name, value)) => (
                            name.trim().to_string(),
                            Some(value.trim().trim_matches(['"', '\'']).to_string()),
                        ),
                        None => (body.trim().to_string(), None),
                    };
                    if attribute.0.is_empty() {
                        return None;
                    }
                    selector.attributes.push(attribute);
                    rest = &rest[end + 1..];
                }
                _ => return None,
            }
        }
        Some(selector)
    }

    fn matches(&self, node: &Node) -> bool {
        if self.tag.as_deref().is_some_and(|tag| tag != node.tag) {
            return false;
        }
        if let Some(id) = &self.id {
            if node.attributes.get("id") != Some(id) {
                return false;
            }
        }
        let classes: Vec<&str> = node
            .attributes
            .get("class")
            .map(|value| value.split_whitespace().collect())
            .unwrap_or_default();
        if !self.classes.iter().all(|class| classes.contains(&class.as_str())) {
            return false;
        }
        self.attributes.iter().all(|(name, value)| {
            match (node.attributes.get(name), value) {
                (Some(actual), Some(expected)) => actual == expected,
                (Some(_), None) => true,
                (None, _) => false,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> (MemorySurface, ElementId, ElementId) {
        let surface = MemorySurface::new();
        let container = surface.append_new(surface.root(), "div", "view-root");
        let view = surface.create_element("div");
        surface.set_attribute(view, "class", "view test-view");
        surface.set_attribute(view, "data-layer-index", "1");
        surface.append(container, view);
        (surface, container, view)
    }

    #[test]
    fn append_and_detach_keep_parent_links_consistent() {
        let (surface, container, view) = tree();
        assert_eq!(surface.parent(view), Some(container));
        assert_eq!(surface.children(container), vec![view]);

        surface.detach(view);
        assert_eq!(surface.parent(view), None);
        assert!(surface.children(container).is_empty());

        surface.detach(view);
        assert!(surface.contains(view));
    }

    #[test]
    fn query_supports_id_class_and_attribute_selectors() {
        let (surface, container, view) = tree();
        assert_eq!(surface.query("#view-root"), Some(container));
        assert_eq!(surface.query(".test-view"), Some(view));
        assert_eq!(surface.query("div.view"), Some(view));
        assert_eq!(surface.query("[data-layer-index]"), Some(view));
        assert_eq!(surface.query("[data-layer-index=\"1\"]"), Some(view));
        assert_eq!(surface.query("[data-layer-index=\"2\"]"), None);
        assert_eq!(surface.query(".missing"), None);
    }

    #[test]
    fn query_ignores_detached_elements() {
        let (surface, _, view) = tree();
        surface.detach(view);
        assert_eq!(surface.query(".test-view"), None);
    }

    #[test]
    fn closest_with_attribute_walks_ancestors() {
        let (surface, container, view) = tree();
        let inner = surface.create_element("span");
        surface.append(view, inner);
        assert_eq!(surface.closest_with_attribute(inner, "data-layer-index"), Some(view));
        assert_eq!(surface.closest_with_attribute(container, "data-layer-index"), None);
    }

    #[test]
    fn release_forgets_the_subtree() {
        let (surface, container, view) = tree();
        let inner = surface.create_element("span");
        surface.append(view, inner);
        surface.release(view);
        assert!(!surface.contains(view));
        assert!(!surface.contains(inner));
        assert!(surface.children(container).is_empty());
    }

    #[test]
    fn malformed_selectors_match_nothing() {
        let (surface, _, _) = tree();
        assert_eq!(surface.query(""), None);
        assert_eq!(surface.query("."), None);
        assert_eq!(surface.query("[unterminated"), None);
    }
}
