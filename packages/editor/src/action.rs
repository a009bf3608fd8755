//! # Editor Actions
//!
//! Reversible edit operations on SCL documents.
//!
//! ## Semantics
//!
//! ### Create
//! - Inserts a detached element under `parent`, before `reference` or at the end
//! - Inverse is a Delete of the same element at the same position
//!
//! ### Delete
//! - Detaches an element; it stays in the arena so Create can reinsert it
//! - The original position is captured when the action is built
//!
//! ### Move
//! - Relocates an attached element, carrying its subtree
//! - Inverse moves it back to the captured original position
//!
//! ### Update
//! - Sets (`Some`) or removes (`None`) attributes
//! - Inverse restores the captured previous values and attribute order
//!
//! ### Complex
//! - Titled sequence of actions, inverted child by child in reverse order

use crate::errors::{ActionError, ActionResult};
use indexmap::IndexMap;
use scl_foundation::{get_reference, TagSchema};
use scl_parser::{Document, NodeId};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Attribute values of an Update; `None` means absent
pub type AttributeMap = IndexMap<String, Option<String>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum EditorAction {
    Create(Create),
    Delete(Delete),
    Move(Move),
    Update(Update),
    Complex(Complex),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Create {
    pub parent: NodeId,
    pub reference: Option<NodeId>,
    pub element: NodeId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delete {
    pub element: NodeId,
    pub parent: NodeId,
    pub reference: Option<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Move {
    pub element: NodeId,
    pub old_parent: NodeId,
    pub old_reference: Option<NodeId>,
    pub new_parent: NodeId,
    pub new_reference: Option<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Update {
    pub element: NodeId,
    pub old_attributes: AttributeMap,
    pub new_attributes: AttributeMap,
    /// Attribute names before the update, in document order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub old_order: Vec<String>,
    /// Attribute names after the update; empty leaves the order to the edit
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub new_order: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Complex {
    pub title: String,
    pub actions: Vec<EditorAction>,
}

/// Parent and next sibling of an attached element
fn position(doc: &Document, element: NodeId) -> ActionResult<(NodeId, Option<NodeId>)> {
    doc.require(element)?;
    let parent = doc.parent(element).ok_or_else(|| {
        ActionError::InvalidAction(format!("element {} is not attached", element))
    })?;
    Ok((parent, doc.next_sibling(element)))
}

impl Create {
    pub fn new(parent: NodeId, reference: Option<NodeId>, element: NodeId) -> Self {
        Self {
            parent,
            reference,
            element,
        }
    }

    /// Insert `element` at the position the schema prescribes for its tag
    pub fn ordered(doc: &Document, schema: &TagSchema, parent: NodeId, element: NodeId) -> Self {
        let reference = get_reference(doc, schema, parent, doc.tag(element));
        Self::new(parent, reference, element)
    }
}

impl Delete {
    /// Delete `element`, remembering where it currently sits
    pub fn capture(doc: &Document, element: NodeId) -> ActionResult<Self> {
        let (parent, reference) = position(doc, element)?;
        Ok(Self {
            element,
            parent,
            reference,
        })
    }
}

impl Move {
    /// Move `element` under `new_parent`, remembering where it currently sits
    pub fn capture(
        doc: &Document,
        element: NodeId,
        new_parent: NodeId,
        new_reference: Option<NodeId>,
    ) -> ActionResult<Self> {
        let (old_parent, old_reference) = position(doc, element)?;
        Ok(Self {
            element,
            old_parent,
            old_reference,
            new_parent,
            new_reference,
        })
    }
}

impl Update {
    /// Update `element`, remembering the current value of every touched attribute
    pub fn capture(doc: &Document, element: NodeId, new_attributes: AttributeMap) -> ActionResult<Self> {
        doc.require(element)?;
        let old_attributes = new_attributes
            .keys()
            .map(|name| (name.clone(), doc.attribute(element, name).map(str::to_string)))
            .collect();

        let current = &doc.element(element).attributes;
        let old_order: Vec<String> = current.keys().cloned().collect();
        let mut after = current.clone();
        for (name, value) in &new_attributes {
            match value {
                Some(value) => {
                    after.insert(name.clone(), value.clone());
                }
                None => {
                    after.shift_remove(name);
                }
            }
        }
        let new_order = after.into_keys().collect();

        Ok(Self {
            element,
            old_attributes,
            new_attributes,
            old_order,
            new_order,
        })
    }
}

impl Complex {
    pub fn new(title: impl Into<String>, actions: Vec<EditorAction>) -> Self {
        Self {
            title: title.into(),
            actions,
        }
    }
}

impl From<Create> for EditorAction {
    fn from(action: Create) -> Self {
        EditorAction::Create(action)
    }
}

impl From<Delete> for EditorAction {
    fn from(action: Delete) -> Self {
        EditorAction::Delete(action)
    }
}

impl From<Move> for EditorAction {
    fn from(action: Move) -> Self {
        EditorAction::Move(action)
    }
}

impl From<Update> for EditorAction {
    fn from(action: Update) -> Self {
        EditorAction::Update(action)
    }
}

impl From<Complex> for EditorAction {
    fn from(action: Complex) -> Self {
        EditorAction::Complex(action)
    }
}

impl EditorAction {
    pub fn is_create(&self) -> bool {
        matches!(self, EditorAction::Create(_))
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, EditorAction::Delete(_))
    }

    pub fn is_move(&self) -> bool {
        matches!(self, EditorAction::Move(_))
    }

    pub fn is_update(&self) -> bool {
        matches!(self, EditorAction::Update(_))
    }

    /// Everything but Complex
    pub fn is_simple(&self) -> bool {
        !matches!(self, EditorAction::Complex(_))
    }

    /// Short label used in history entries and logs
    pub fn title(&self) -> &str {
        match self {
            EditorAction::Create(_) => "Create",
            EditorAction::Delete(_) => "Delete",
            EditorAction::Move(_) => "Move",
            EditorAction::Update(_) => "Update",
            EditorAction::Complex(c) => &c.title,
        }
    }

    /// Validate against `doc`, then mutate it
    pub fn apply(&self, doc: &mut Document) -> ActionResult<()> {
        debug!(action = self.title(), "applying action");
        match self {
            EditorAction::Create(a) => {
                if doc.contains(a.element) && doc.parent(a.element).is_some() {
                    return Err(ActionError::InvalidAction(format!(
                        "element {} is already attached",
                        a.element
                    )));
                }
                doc.insert_before(a.parent, a.element, a.reference)?;
            }
            EditorAction::Delete(a) => {
                doc.require(a.element)?;
                if doc.parent(a.element) != Some(a.parent) {
                    return Err(ActionError::InvalidAction(format!(
                        "element {} is not a child of {}",
                        a.element, a.parent
                    )));
                }
                doc.detach(a.element)?;
            }
            EditorAction::Move(a) => {
                doc.require(a.element)?;
                if doc.parent(a.element) != Some(a.old_parent) {
                    return Err(ActionError::InvalidAction(format!(
                        "element {} is not a child of {}",
                        a.element, a.old_parent
                    )));
                }
                doc.insert_before(a.new_parent, a.element, a.new_reference)?;
            }
            EditorAction::Update(a) => {
                doc.require(a.element)?;
                for (name, value) in &a.new_attributes {
                    match value {
                        Some(value) => {
                            doc.set_attribute(a.element, name.clone(), value.clone());
                        }
                        None => {
                            doc.remove_attribute(a.element, name);
                        }
                    }
                }
                if a.new_order.is_empty() {
                    doc.touch();
                } else {
                    doc.reorder_attributes(a.element, &a.new_order);
                }
            }
            EditorAction::Complex(complex) => {
                for (index, action) in complex.actions.iter().enumerate() {
                    if let Err(err) = action.apply(doc) {
                        warn!(title = %complex.title, index, %err, "complex action failed, rolling back");
                        for applied in complex.actions[..index].iter().rev() {
                            invert(applied).apply(doc)?;
                        }
                        return Err(err);
                    }
                }
            }
        }
        Ok(())
    }
}

/// The action that undoes `action`
pub fn invert(action: &EditorAction) -> EditorAction {
    match action {
        EditorAction::Create(a) => EditorAction::Delete(Delete {
            element: a.element,
            parent: a.parent,
            reference: a.reference,
        }),
        EditorAction::Delete(a) => EditorAction::Create(Create {
            parent: a.parent,
            reference: a.reference,
            element: a.element,
        }),
        EditorAction::Move(a) => EditorAction::Move(Move {
            element: a.element,
            old_parent: a.new_parent,
            old_reference: a.new_reference,
            new_parent: a.old_parent,
            new_reference: a.old_reference,
        }),
        EditorAction::Update(a) => EditorAction::Update(Update {
            element: a.element,
            old_attributes: a.new_attributes.clone(),
            new_attributes: a.old_attributes.clone(),
            old_order: a.new_order.clone(),
            new_order: a.old_order.clone(),
        }),
        EditorAction::Complex(c) => EditorAction::Complex(Complex {
            title: c.title.clone(),
            actions: c.actions.iter().rev().map(invert).collect(),
        }),
    }
}

/// Invert an action received as JSON
pub fn invert_value(value: &serde_json::Value) -> ActionResult<EditorAction> {
    let action: EditorAction = serde_json::from_value(value.clone()).map_err(|err| {
        warn!(%err, "rejected action value");
        ActionError::UnrecognizedAction(value.to_string())
    })?;
    Ok(invert(&action))
}
