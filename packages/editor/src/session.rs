//! # Edit Session
//!
//! One open SCL document together with its undo history and the publisher
//! selection of the control-block editors.
//!
//! Opening another document resets history and selection in one place, so
//! nothing carries over between files.

use crate::action::EditorAction;
use crate::errors::{ActionError, ActionResult};
use crate::history::History;
use scl_foundation::{locate, ControlBlockIndex, Identity, TagSchema};
use scl_parser::{Document, NodeId};
use tracing::{debug, instrument};

/// Control block tags that can be selected as publishers
const CONTROL_BLOCK_TAGS: [&str; 3] = ["GSEControl", "SampledValueControl", "ReportControl"];

/// Selected publisher and the data set it sends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublisherSelection {
    pub control_block: Option<NodeId>,
    pub data_set: Option<NodeId>,
}

impl PublisherSelection {
    pub fn is_empty(&self) -> bool {
        self.control_block.is_none() && self.data_set.is_none()
    }
}

pub struct EditSession<'s> {
    document: Document,
    schema: &'s TagSchema,
    history: History,
    selection: PublisherSelection,
    index: Option<ControlBlockIndex>,
}

impl EditSession<'static> {
    /// Session over the compiled-in SCL schema with default history depth
    pub fn new(document: Document) -> Self {
        Self::with_schema(document, TagSchema::scl(), History::new())
    }
}

impl<'s> EditSession<'s> {
    pub fn with_schema(document: Document, schema: &'s TagSchema, history: History) -> Self {
        Self {
            document,
            schema,
            history,
            selection: PublisherSelection::default(),
            index: None,
        }
    }

    /// Replace the document, dropping history and selection
    #[instrument(skip_all)]
    pub fn open(&mut self, document: Document) {
        self.document = document;
        self.history.clear();
        self.selection = PublisherSelection::default();
        self.index = None;
        debug!(elements = self.document.len(), "opened document");
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn schema(&self) -> &'s TagSchema {
        self.schema
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn selection(&self) -> PublisherSelection {
        self.selection
    }

    /// Mutable access for building detached elements before a Create
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn apply(&mut self, action: EditorAction) -> ActionResult<()> {
        self.history.apply(action, &mut self.document)?;
        self.drop_stale_selection();
        Ok(())
    }

    pub fn undo(&mut self) -> ActionResult<bool> {
        let undone = self.history.undo(&mut self.document)?;
        self.drop_stale_selection();
        Ok(undone)
    }

    pub fn redo(&mut self) -> ActionResult<bool> {
        let redone = self.history.redo(&mut self.document)?;
        self.drop_stale_selection();
        Ok(redone)
    }

    pub fn begin_batch(&mut self, title: impl Into<String>) {
        self.history.begin_batch(title);
    }

    pub fn end_batch(&mut self) {
        self.history.end_batch();
    }

    /// Select a control block; its data set is the sibling named by `datSet`
    pub fn select_control_block(&mut self, control_block: NodeId) -> ActionResult<()> {
        self.document.require(control_block)?;
        let tag = self.document.tag(control_block);
        if !CONTROL_BLOCK_TAGS.contains(&tag) {
            return Err(ActionError::InvalidAction(format!(
                "{} is not a control block",
                tag
            )));
        }

        let data_set = self.find_data_set(control_block);
        self.selection = PublisherSelection {
            control_block: Some(control_block),
            data_set,
        };
        debug!(selection = ?self.selection, "selected control block");
        Ok(())
    }

    /// Select a control block by tag and identity; `false` when none matches
    pub fn select_by_identity(&mut self, tag: &str, identity: &Identity) -> ActionResult<bool> {
        match locate(&self.document, self.schema, tag, identity) {
            Some(control_block) => {
                self.select_control_block(control_block)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection = PublisherSelection::default();
    }

    /// Control-block index for the current document version, rebuilt when stale
    pub fn control_block_index(&mut self) -> &ControlBlockIndex {
        if self
            .index
            .as_ref()
            .map_or(false, |index| index.is_stale(&self.document))
        {
            self.index = None;
        }
        self.index
            .get_or_insert_with(|| ControlBlockIndex::build(&self.document, self.schema))
    }

    fn find_data_set(&self, control_block: NodeId) -> Option<NodeId> {
        let name = self.document.attribute(control_block, "datSet")?;
        let logical_node = self.document.parent(control_block)?;
        self.document
            .children(logical_node)
            .iter()
            .copied()
            .find(|child| {
                self.document.tag(*child) == "DataSet"
                    && self.document.attribute(*child, "name") == Some(name)
            })
    }

    /// Forget selected nodes that an edit detached
    fn drop_stale_selection(&mut self) {
        let attached = |id: Option<NodeId>| id.map_or(true, |id| self.document.is_attached(id));
        if !attached(self.selection.control_block) || !attached(self.selection.data_set) {
            debug!("selection detached by edit");
            self.selection = PublisherSelection::default();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Delete;
    use scl_parser::parse;

    const SOURCE: &str = r#"<SCL><IED name="IED1"><AccessPoint name="P1"><Server><LDevice inst="LD1">
        <LN0 lnClass="LLN0" inst="" lnType="T">
            <DataSet name="DS1"/>
            <DataSet name="DS2"/>
            <GSEControl name="GCB" datSet="DS2"/>
        </LN0>
    </LDevice></Server></AccessPoint></IED></SCL>"#;

    fn session() -> EditSession<'static> {
        EditSession::new(parse(SOURCE).unwrap())
    }

    #[test]
    fn test_select_by_identity() {
        let mut session = session();
        assert!(session
            .select_by_identity("GSEControl", &Identity::from("IED1>>LD1>GCB"))
            .unwrap());

        let selection = session.selection();
        let data_set = selection.data_set.unwrap();
        assert_eq!(session.document().attribute(data_set, "name"), Some("DS2"));

        assert!(!session
            .select_by_identity("GSEControl", &Identity::from("IED1>>LD1>Other"))
            .unwrap());
    }

    #[test]
    fn test_select_rejects_non_control_block() {
        let mut session = session();
        let data_set = session.document().query_selector("DataSet").unwrap().unwrap();
        assert!(session.select_control_block(data_set).is_err());
        assert!(session.selection().is_empty());
    }

    #[test]
    fn test_open_resets_state() {
        let mut session = session();
        let gcb = session.document().query_selector("GSEControl").unwrap().unwrap();
        session.select_control_block(gcb).unwrap();
        let action = Delete::capture(session.document(), gcb).unwrap();
        session.apply(action.into()).unwrap();
        assert!(session.history().can_undo());

        session.open(parse(SOURCE).unwrap());
        assert!(!session.history().can_undo());
        assert!(session.selection().is_empty());
    }

    #[test]
    fn test_deleting_selection_clears_it() {
        let mut session = session();
        let gcb = session.document().query_selector("GSEControl").unwrap().unwrap();
        session.select_control_block(gcb).unwrap();

        let action = Delete::capture(session.document(), gcb).unwrap();
        session.apply(action.into()).unwrap();
        assert!(session.selection().is_empty());

        assert!(session.undo().unwrap());
        assert!(session.document().is_attached(gcb));
    }

    #[test]
    fn test_index_is_rebuilt_after_edit() {
        let mut session = session();
        let version = session.control_block_index().version();

        let data_set = session.document().query_selector("DataSet").unwrap().unwrap();
        let action = Delete::capture(session.document(), data_set).unwrap();
        session.apply(action.into()).unwrap();

        assert_ne!(session.control_block_index().version(), version);
    }
}
