use super::selector::{Combinator, ComplexSelector, Compound, Filter, SelectorList};
use crate::ast::{Document, NodeId};

/// True when `id` is selected by any branch of `list`
pub fn matches_list(doc: &Document, id: NodeId, list: &SelectorList) -> bool {
    list.selectors.iter().any(|s| matches_complex(doc, id, s))
}

/// Right-to-left evaluation of a complex selector with `id` as the subject
pub fn matches_complex(doc: &Document, id: NodeId, selector: &ComplexSelector) -> bool {
    match selector.compounds.len() {
        0 => false,
        n => matches_from(doc, id, selector, n - 1),
    }
}

fn matches_from(doc: &Document, id: NodeId, selector: &ComplexSelector, index: usize) -> bool {
    if !matches_compound(doc, id, &selector.compounds[index]) {
        return false;
    }
    if index == 0 {
        return true;
    }

    match selector.combinators.get(index - 1) {
        Some(Combinator::Descendant) => doc
            .ancestors(id)
            .any(|ancestor| matches_from(doc, ancestor, selector, index - 1)),
        _ => doc
            .parent(id)
            .is_some_and(|parent| matches_from(doc, parent, selector, index - 1)),
    }
}

pub fn matches_compound(doc: &Document, id: NodeId, compound: &Compound) -> bool {
    if !matches_tag(doc, id, compound) {
        return false;
    }
    compound
        .filters
        .iter()
        .all(|filter| matches_filter(doc, id, compound, filter))
}

fn matches_tag(doc: &Document, id: NodeId, compound: &Compound) -> bool {
    compound.tag.as_deref().map_or(true, |tag| doc.tag(id) == tag)
}

fn matches_filter(doc: &Document, id: NodeId, compound: &Compound, filter: &Filter) -> bool {
    match filter {
        Filter::Root => id == doc.root(),
        Filter::HasAttribute(name) => doc.attribute(id, name).is_some(),
        Filter::AttributeEquals(name, value) => doc.attribute(id, name) == Some(value.as_str()),
        Filter::Not(inner) => !matches_compound(doc, id, inner),
        Filter::NotWithin(inner) => !doc
            .ancestors(id)
            .any(|ancestor| matches_compound(doc, ancestor, inner)),
        Filter::Text(text) => doc.text(id).unwrap_or("").trim() == text,
        Filter::Index(n) => sibling_position(doc, id, compound) == Some(*n),
    }
}

/// Position of `id` among its siblings that satisfy every non-index part of `compound`
fn sibling_position(doc: &Document, id: NodeId, compound: &Compound) -> Option<usize> {
    let parent = doc.parent(id)?;
    doc.children(parent)
        .iter()
        .filter(|sibling| {
            matches_tag(doc, **sibling, compound)
                && compound
                    .filters
                    .iter()
                    .filter(|f| !matches!(f, Filter::Index(_)))
                    .all(|f| matches_filter(doc, **sibling, compound, f))
        })
        .position(|sibling| *sibling == id)
}
