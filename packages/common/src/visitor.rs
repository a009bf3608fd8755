use scl_parser::{Document, NodeId};

/// Visitor pattern for traversing a document immutably
///
/// The default implementations walk the whole attached tree in document
/// order. Override `visit_element` to act on nodes and call
/// [`walk_element`] to keep descending, or return early to skip a subtree.
pub trait Visitor: Sized {
    fn visit_document(&mut self, doc: &Document) {
        walk_document(self, doc);
    }

    fn visit_element(&mut self, doc: &Document, id: NodeId) {
        walk_element(self, doc, id);
    }
}

pub fn walk_document<V: Visitor>(visitor: &mut V, doc: &Document) {
    visitor.visit_element(doc, doc.root());
}

pub fn walk_element<V: Visitor>(visitor: &mut V, doc: &Document, id: NodeId) {
    for child in doc.children(id) {
        visitor.visit_element(doc, *child);
    }
}
