//! Subscriber-to-publisher resolution.
//!
//! An `ExtRef` names a data attribute of a remote IED. The data attribute is
//! published through the `FCDA` entries of a `DataSet`, and every control
//! block of the same logical node whose `datSet` names that data set sends it.

use crate::identity::{identity, is_public, Identity};
use crate::schema::TagSchema;
use indexmap::{IndexMap, IndexSet};
use scl_parser::{Document, NodeId};
use std::cmp::Ordering;
use tracing::{debug, instrument, warn};

const EXT_REF: &str = "ExtRef";

/// Attributes an `FCDA` shares with the `ExtRef` that subscribes to it
const MATCHING_ATTRIBUTES: [&str; 6] = ["ldInst", "prefix", "lnClass", "lnInst", "doName", "daName"];

/// Control block tags that may publish data for an `ExtRef` service type
pub fn control_block_tags(service_type: Option<&str>) -> &'static [&'static str] {
    match service_type {
        Some("GOOSE") => &["GSEControl"],
        Some("SMV") => &["SampledValueControl"],
        Some("Report") => &["ReportControl"],
        _ => &["GSEControl", "SampledValueControl", "ReportControl"],
    }
}

/// Data set members matching `ext_ref`, in document order
#[instrument(skip(doc, schema))]
pub fn find_fcdas(doc: &Document, schema: &TagSchema, ext_ref: NodeId) -> Vec<NodeId> {
    if !is_subscriber(doc, schema, ext_ref) {
        return Vec::new();
    }
    let Some(ied) = publisher_ied(doc, schema, ext_ref) else {
        return Vec::new();
    };

    doc.descendants(ied)
        .filter(|fcda| {
            doc.tag(*fcda) == "FCDA"
                && is_public(doc, schema, *fcda)
                && matches_ext_ref(doc, *fcda, ext_ref)
        })
        .collect()
}

/// Control blocks publishing the data `ext_ref` subscribes to
pub fn find_control_blocks(doc: &Document, schema: &TagSchema, ext_ref: NodeId) -> IndexSet<NodeId> {
    let fcdas = find_fcdas(doc, schema, ext_ref);
    control_blocks_for(doc, ext_ref, &fcdas)
}

fn is_subscriber(doc: &Document, schema: &TagSchema, ext_ref: NodeId) -> bool {
    doc.contains(ext_ref) && doc.tag(ext_ref) == EXT_REF && is_public(doc, schema, ext_ref)
}

fn publisher_ied(doc: &Document, schema: &TagSchema, ext_ref: NodeId) -> Option<NodeId> {
    let name = doc.attribute(ext_ref, "iedName")?;
    let ied = doc
        .elements_by_tag("IED")
        .find(|ied| doc.attribute(*ied, "name") == Some(name) && is_public(doc, schema, *ied));
    if ied.is_none() {
        warn!(ied_name = name, "ExtRef references an unknown IED");
    }
    ied
}

fn matches_ext_ref(doc: &Document, fcda: NodeId, ext_ref: NodeId) -> bool {
    MATCHING_ATTRIBUTES.iter().all(|name| {
        doc.attribute(fcda, name).unwrap_or("") == doc.attribute(ext_ref, name).unwrap_or("")
    })
}

fn control_blocks_for(doc: &Document, ext_ref: NodeId, fcdas: &[NodeId]) -> IndexSet<NodeId> {
    let tags = control_block_tags(doc.attribute(ext_ref, "serviceType"));
    let mut control_blocks = IndexSet::new();

    for fcda in fcdas {
        let Some(data_set) = doc.parent(*fcda) else {
            continue;
        };
        let Some(logical_node) = doc.parent(data_set) else {
            continue;
        };
        let data_set_name = doc.attribute(data_set, "name");

        for candidate in doc.descendants(logical_node) {
            if tags.contains(&doc.tag(candidate))
                && data_set_name.is_some()
                && doc.attribute(candidate, "datSet") == data_set_name
            {
                control_blocks.insert(candidate);
            }
        }
    }

    debug!(count = control_blocks.len(), "resolved control blocks");
    control_blocks
}

/// An `IED` directly under the root with the control blocks it publishes
#[derive(Debug, Clone, PartialEq)]
pub struct Publisher {
    pub ied: NodeId,
    pub name: String,
    /// Public control blocks keyed by identity, in document order
    pub control_blocks: IndexMap<String, NodeId>,
}

/// Order of names in publisher listings.
///
/// Case is ignored first; on a tie lowercase sorts before uppercase.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| b.cmp(a))
}

/// Publishing IEDs sorted by name, each with its `tag` control blocks
#[instrument(skip(doc, schema))]
pub fn control_blocks_by_ied(doc: &Document, schema: &TagSchema, tag: &str) -> Vec<Publisher> {
    let root = doc.root();
    let mut publishers: Vec<Publisher> = doc
        .children(root)
        .iter()
        .copied()
        .filter(|ied| doc.tag(*ied) == "IED")
        .map(|ied| {
            let control_blocks = doc
                .descendants(ied)
                .filter(|cb| doc.tag(*cb) == tag)
                .filter_map(|cb| match identity(doc, schema, cb) {
                    Identity::Public(key) => Some((key, cb)),
                    Identity::NaN => None,
                })
                .collect();
            Publisher {
                ied,
                name: doc.attribute(ied, "name").unwrap_or("").to_string(),
                control_blocks,
            }
        })
        .collect();

    publishers.sort_by(|a, b| compare_names(&a.name, &b.name));
    debug!(ieds = publishers.len(), tag, "listed publishers");
    publishers
}

/// Memoized FCDA lookup for one document version.
///
/// Public FCDAs are grouped by the name of the first public IED carrying
/// that name, so repeated subscriber lookups do not rescan the document.
#[derive(Debug, Clone)]
pub struct ControlBlockIndex {
    version: u64,
    fcdas_by_ied: IndexMap<String, Vec<NodeId>>,
}

impl ControlBlockIndex {
    #[instrument(skip_all)]
    pub fn build(doc: &Document, schema: &TagSchema) -> Self {
        let mut fcdas_by_ied: IndexMap<String, Vec<NodeId>> = IndexMap::new();

        for ied in doc.elements_by_tag("IED") {
            if !is_public(doc, schema, ied) {
                continue;
            }
            let name = doc.attribute(ied, "name").unwrap_or("").to_string();
            if fcdas_by_ied.contains_key(&name) {
                continue;
            }
            let fcdas = doc
                .descendants(ied)
                .filter(|n| doc.tag(*n) == "FCDA" && is_public(doc, schema, *n))
                .collect();
            fcdas_by_ied.insert(name, fcdas);
        }

        debug!(ieds = fcdas_by_ied.len(), version = doc.version(), "built control block index");
        Self {
            version: doc.version(),
            fcdas_by_ied,
        }
    }

    /// True once `doc` has been mutated after the index was built
    pub fn is_stale(&self, doc: &Document) -> bool {
        self.version != doc.version()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Same result as [`find_fcdas`] for the indexed document version
    pub fn find_fcdas(&self, doc: &Document, schema: &TagSchema, ext_ref: NodeId) -> Vec<NodeId> {
        if !is_subscriber(doc, schema, ext_ref) {
            return Vec::new();
        }
        let Some(name) = doc.attribute(ext_ref, "iedName") else {
            return Vec::new();
        };
        self.fcdas_by_ied
            .get(name)
            .map(|fcdas| {
                fcdas
                    .iter()
                    .copied()
                    .filter(|fcda| matches_ext_ref(doc, *fcda, ext_ref))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Same result as [`find_control_blocks`] for the indexed document version
    pub fn find_control_blocks(
        &self,
        doc: &Document,
        schema: &TagSchema,
        ext_ref: NodeId,
    ) -> IndexSet<NodeId> {
        let fcdas = self.find_fcdas(doc, schema, ext_ref);
        control_blocks_for(doc, ext_ref, &fcdas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use scl_parser::parse;

    #[test]
    fn test_compare_names() {
        let mut names = vec!["b", "IED10", "A", "a", "ied2"];
        names.sort_by(|a, b| compare_names(a, b));
        assert_eq!(names, vec!["a", "A", "b", "IED10", "ied2"]);
    }

    #[test]
    fn test_control_blocks_by_ied_sorts_and_filters() {
        let doc = parse(
            r#"<SCL>
            <IED name="beta"><AccessPoint name="P1"><Server><LDevice inst="LD">
                <LN0 lnClass="LLN0" inst=""><GSEControl name="G2"/><ReportControl name="R1"/>
                <Private type="x"><GSEControl name="hidden"/></Private></LN0>
            </LDevice></Server></AccessPoint></IED>
            <IED name="Alpha"><AccessPoint name="P1"><Server><LDevice inst="LD">
                <LN0 lnClass="LLN0" inst=""><GSEControl name="G1"/></LN0>
            </LDevice></Server></AccessPoint></IED>
            <Private type="x"><IED name="ghost"/></Private>
            </SCL>"#,
        )
        .unwrap();

        let publishers = control_blocks_by_ied(&doc, TagSchema::scl(), "GSEControl");
        let names: Vec<&str> = publishers.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "beta"]);

        let keys: Vec<&str> = publishers[1].control_blocks.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["beta>>LD>G2"]);

        let reports = control_blocks_by_ied(&doc, TagSchema::scl(), "ReportControl");
        assert!(reports[0].control_blocks.is_empty());
        assert_eq!(reports[1].control_blocks.len(), 1);
    }

    #[test]
    fn test_control_block_tags() {
        assert_eq!(control_block_tags(Some("GOOSE")), &["GSEControl"]);
        assert_eq!(control_block_tags(Some("Poll")).len(), 3);
        assert_eq!(control_block_tags(None).len(), 3);
    }
}
