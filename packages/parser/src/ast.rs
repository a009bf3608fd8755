use crate::error::DocumentError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable handle to an element inside a [`Document`] arena.
///
/// Ids are never reused. A removed element keeps its id and its slot so it
/// can be reinserted later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A tagged XML element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub tag: String,
    pub attributes: IndexMap<String, String>,
    pub text: Option<String>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: IndexMap::new(),
            text: None,
            parent: None,
            children: Vec::new(),
        }
    }
}

/// Arena-backed element tree.
///
/// Structural queries take `&self`, mutations take `&mut self` and bump the
/// version counter so derived data (identities, indexes) can detect staleness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    nodes: Vec<Element>,
    root: NodeId,
    version: u64,
}

impl Document {
    /// Create a document holding a single root element
    pub fn new(root_tag: impl Into<String>) -> Self {
        Self {
            nodes: vec![Element::new(root_tag)],
            root: NodeId(0),
            version: 0,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Number of elements in the arena, detached ones included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&Element> {
        self.nodes.get(id.0)
    }

    /// Element behind `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not produced by this document.
    pub fn element(&self, id: NodeId) -> &Element {
        &self.nodes[id.0]
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    pub fn tag(&self, id: NodeId) -> &str {
        &self.element(id).tag
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).attributes.get(name).map(String::as_str)
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.element(id).text.as_deref()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.element(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.element(id).children
    }

    pub fn child_index(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|c| *c == id)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.child_index(id)?;
        self.children(parent).get(index + 1).copied()
    }

    /// Iterate over the strict ancestors of `id`, nearest first
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: self.parent(id),
        }
    }

    /// Nearest ancestor-or-self with the given tag
    pub fn closest(&self, id: NodeId, tag: &str) -> Option<NodeId> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find(|n| self.tag(*n) == tag)
    }

    /// True when `ancestor` is `id` itself or one of its ancestors
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
        id == ancestor || self.ancestors(id).any(|a| a == ancestor)
    }

    /// True when the element is reachable from the root
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.is_ancestor_or_self(self.root, id)
    }

    /// Descendants of `id` in pre-order, `id` excluded
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        let mut stack: Vec<NodeId> = self.children(id).to_vec();
        stack.reverse();
        Descendants { doc: self, stack }
    }

    /// Every attached element in document order, root first
    pub fn elements(&self) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::once(self.root).chain(self.descendants(self.root))
    }

    pub fn elements_by_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = NodeId> + 'a {
        self.elements().filter(move |id| self.tag(*id) == tag)
    }

    /// Allocate a detached element
    pub fn create_element(&mut self, tag: impl Into<String>) -> NodeId {
        self.push(Element::new(tag))
    }

    /// Allocate a detached, childless copy of `id` without its text.
    ///
    /// Overrides with `Some(v)` set the attribute, `None` removes it.
    pub fn clone_element(
        &mut self,
        id: NodeId,
        overrides: &IndexMap<String, Option<String>>,
    ) -> NodeId {
        let source = self.element(id);
        let mut attributes = source.attributes.clone();
        for (name, value) in overrides {
            match value {
                Some(v) => {
                    attributes.insert(name.clone(), v.clone());
                }
                None => {
                    attributes.shift_remove(name);
                }
            }
        }
        let element = Element {
            tag: source.tag.clone(),
            attributes,
            text: None,
            parent: None,
            children: Vec::new(),
        };
        self.push(element)
    }

    pub fn set_text(&mut self, id: NodeId, text: Option<String>) {
        self.nodes[id.0].text = text;
        self.version += 1;
    }

    /// Set an attribute, returning the previous value
    pub fn set_attribute(
        &mut self,
        id: NodeId,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Option<String> {
        self.version += 1;
        self.nodes[id.0].attributes.insert(name.into(), value.into())
    }

    /// Remove an attribute, returning the previous value
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Option<String> {
        self.version += 1;
        self.nodes[id.0].attributes.shift_remove(name)
    }

    /// Reorder attributes to follow `order`; names not listed keep their
    /// relative order after the listed ones
    pub fn reorder_attributes(&mut self, id: NodeId, order: &[String]) {
        let rank = |name: &String| order.iter().position(|n| n == name).unwrap_or(order.len());
        self.nodes[id.0]
            .attributes
            .sort_by(|a, _, b, _| rank(a).cmp(&rank(b)));
        self.version += 1;
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DocumentError> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` under `parent` before `reference`, or at the end when
    /// `reference` is `None`. A child that is already attached is moved.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DocumentError> {
        self.check_insert(parent, child, reference)?;

        self.unlink(child);
        let siblings = &mut self.nodes[parent.0].children;
        let index = match reference {
            Some(r) => siblings
                .iter()
                .position(|c| *c == r)
                .ok_or(DocumentError::ReferenceNotChild {
                    parent,
                    reference: r,
                })?,
            None => siblings.len(),
        };
        siblings.insert(index, child);
        self.nodes[child.0].parent = Some(parent);
        self.version += 1;
        Ok(())
    }

    /// Validate an insertion without performing it
    pub fn check_insert(
        &self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DocumentError> {
        self.require(parent)?;
        self.require(child)?;
        if child == self.root {
            return Err(DocumentError::RootImmutable);
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(DocumentError::CycleDetected { parent, child });
        }
        if let Some(r) = reference {
            self.require(r)?;
            if r == child || self.parent(r) != Some(parent) {
                return Err(DocumentError::ReferenceNotChild {
                    parent,
                    reference: r,
                });
            }
        }
        Ok(())
    }

    /// Detach `id` from its parent. The element stays in the arena.
    pub fn detach(&mut self, id: NodeId) -> Result<(), DocumentError> {
        self.require(id)?;
        if id == self.root {
            return Err(DocumentError::RootImmutable);
        }
        self.unlink(id);
        self.version += 1;
        Ok(())
    }

    /// Mark the document as changed without a structural edit
    pub fn touch(&mut self) {
        self.version += 1;
    }

    pub fn require(&self, id: NodeId) -> Result<(), DocumentError> {
        if self.contains(id) {
            Ok(())
        } else {
            Err(DocumentError::NodeNotFound(id))
        }
    }

    pub(crate) fn from_parts(nodes: Vec<Element>, root: NodeId) -> Self {
        Self {
            nodes,
            root,
            version: 0,
        }
    }

    fn push(&mut self, element: Element) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(element);
        self.version += 1;
        id
    }

    fn unlink(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|c| *c != id);
        }
    }
}

pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.doc.parent(current);
        Some(current)
    }
}

pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.stack.pop()?;
        self.stack
            .extend(self.doc.children(current).iter().rev().copied());
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Document, NodeId, NodeId, NodeId) {
        let mut doc = Document::new("SCL");
        let ied = doc.create_element("IED");
        doc.set_attribute(ied, "name", "IED1");
        doc.append_child(doc.root(), ied).unwrap();
        let ap = doc.create_element("AccessPoint");
        doc.append_child(ied, ap).unwrap();
        let server = doc.create_element("Server");
        doc.append_child(ap, server).unwrap();
        (doc, ied, ap, server)
    }

    #[test]
    fn test_descendants_pre_order() {
        let (doc, ied, ap, server) = sample();
        let all: Vec<_> = doc.elements().collect();
        assert_eq!(all, vec![doc.root(), ied, ap, server]);
    }

    #[test]
    fn test_closest_includes_self() {
        let (doc, ied, _, server) = sample();
        assert_eq!(doc.closest(server, "IED"), Some(ied));
        assert_eq!(doc.closest(ied, "IED"), Some(ied));
        assert_eq!(doc.closest(server, "Private"), None);
    }

    #[test]
    fn test_insert_before_reorders() {
        let (mut doc, ied, ap, _) = sample();
        let services = doc.create_element("Services");
        doc.insert_before(ied, services, Some(ap)).unwrap();
        assert_eq!(doc.children(ied), &[services, ap]);
        assert_eq!(doc.next_sibling(services), Some(ap));
    }

    #[test]
    fn test_insert_rejects_cycle() {
        let (mut doc, ied, _, server) = sample();
        let err = doc.insert_before(server, ied, None).unwrap_err();
        assert_eq!(err, DocumentError::CycleDetected { parent: server, child: ied });
    }

    #[test]
    fn test_insert_rejects_foreign_reference() {
        let (mut doc, ied, _, server) = sample();
        let services = doc.create_element("Services");
        let err = doc.insert_before(ied, services, Some(server)).unwrap_err();
        assert!(matches!(err, DocumentError::ReferenceNotChild { .. }));
    }

    #[test]
    fn test_detach_keeps_arena_slot() {
        let (mut doc, ied, ap, _) = sample();
        doc.detach(ap).unwrap();
        assert!(doc.children(ied).is_empty());
        assert!(!doc.is_attached(ap));
        assert_eq!(doc.tag(ap), "AccessPoint");
        assert_eq!(doc.detach(doc.root()), Err(DocumentError::RootImmutable));
    }

    #[test]
    fn test_clone_element_overrides() {
        let (mut doc, ied, _, _) = sample();
        doc.set_attribute(ied, "desc", "first");
        let mut overrides = IndexMap::new();
        overrides.insert("name".to_string(), Some("IED9".to_string()));
        overrides.insert("desc".to_string(), None);
        let copy = doc.clone_element(ied, &overrides);

        assert_eq!(doc.tag(copy), "IED");
        assert_eq!(doc.attribute(copy, "name"), Some("IED9"));
        assert_eq!(doc.attribute(copy, "desc"), None);
        assert!(doc.children(copy).is_empty());
        assert_eq!(doc.parent(copy), None);
        assert_eq!(doc.attribute(ied, "name"), Some("IED1"));
    }

    #[test]
    fn test_mutations_bump_version() {
        let (mut doc, ied, _, _) = sample();
        let before = doc.version();
        doc.set_attribute(ied, "desc", "x");
        assert!(doc.version() > before);
    }

    #[test]
    fn test_reorder_attributes() {
        let (mut doc, ied, _, _) = sample();
        doc.set_attribute(ied, "desc", "d");
        doc.set_attribute(ied, "type", "t");
        doc.reorder_attributes(ied, &["type".to_string(), "name".to_string()]);
        let keys: Vec<&str> = doc.element(ied).attributes.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["type", "name", "desc"]);
    }
}
