//! Static tag schema: identity policy and canonical child order per tag.
//!
//! The table is data, not code. The SCL table is compiled in from
//! `resources/scl_tags.json`; replacement tables can be loaded with
//! [`TagSchema::from_json`].

use crate::error::{SchemaError, SchemaResult};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

const SCL_TAGS: &str = include_str!("resources/scl_tags.json");

/// Tag-specific identity composition rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecialRule {
    Root,
    IdNaming,
    Hitem,
    Terminal,
    LNode,
    Kdc,
    Association,
    LDevice,
    IedName,
    Fcda,
    ExtRef,
    Ln,
    ClientLn,
    Dai,
    Val,
    ConnectedAp,
    ControlBlock,
    PhysConn,
    P,
    EnumVal,
    ProtNs,
}

/// How the identity of an element is derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityPolicy {
    /// Same identity as the parent
    Singleton,
    /// Parent identity joined with the `name` attribute
    Naming,
    Special(SpecialRule),
    /// Never publicly addressable
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagEntry {
    pub tag: String,
    pub identity: IdentityPolicy,
    /// Child tags in canonical insertion order
    #[serde(default)]
    pub children: Vec<String>,
    /// `false` for groups whose children may appear in any order
    #[serde(default = "default_ordered", skip_serializing_if = "is_ordered")]
    pub ordered: bool,
}

fn default_ordered() -> bool {
    true
}

fn is_ordered(ordered: &bool) -> bool {
    *ordered
}

#[derive(Debug, Deserialize)]
struct SchemaFile {
    root: String,
    private: String,
    tags: Vec<TagEntry>,
}

/// Lookup table keyed by tag, with parents derived from the children lists
#[derive(Debug, Clone)]
pub struct TagSchema {
    root: String,
    private: String,
    entries: IndexMap<String, TagEntry>,
    parents: IndexMap<String, Vec<String>>,
}

impl TagSchema {
    /// The compiled-in SCL schema
    pub fn scl() -> &'static TagSchema {
        static SCHEMA: OnceLock<TagSchema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            TagSchema::from_json(SCL_TAGS).expect("compiled-in SCL tag schema is valid")
        })
    }

    /// Load and validate a schema table
    pub fn from_json(source: &str) -> SchemaResult<Self> {
        let file: SchemaFile = serde_json::from_str(source)?;

        let mut entries = IndexMap::with_capacity(file.tags.len());
        for entry in file.tags {
            if entries.contains_key(&entry.tag) {
                return Err(SchemaError::DuplicateTag(entry.tag));
            }
            entries.insert(entry.tag.clone(), entry);
        }

        if !entries.contains_key(&file.root) {
            return Err(SchemaError::UnknownRoot(file.root));
        }

        let mut parents: IndexMap<String, Vec<String>> = IndexMap::new();
        for entry in entries.values() {
            for child in &entry.children {
                if !entries.contains_key(child) {
                    return Err(SchemaError::UnknownChildTag {
                        parent: entry.tag.clone(),
                        child: child.clone(),
                    });
                }
                parents
                    .entry(child.clone())
                    .or_default()
                    .push(entry.tag.clone());
            }
        }

        Ok(Self {
            root: file.root,
            private: file.private,
            entries,
            parents,
        })
    }

    pub fn root_tag(&self) -> &str {
        &self.root
    }

    pub fn private_tag(&self) -> &str {
        &self.private
    }

    pub fn entry(&self, tag: &str) -> Option<&TagEntry> {
        self.entries.get(tag)
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Identity policy of `tag`; undeclared tags have none
    pub fn policy(&self, tag: &str) -> IdentityPolicy {
        self.entry(tag)
            .map(|e| e.identity)
            .unwrap_or(IdentityPolicy::None)
    }

    pub fn children(&self, tag: &str) -> &[String] {
        self.entry(tag).map(|e| e.children.as_slice()).unwrap_or(&[])
    }

    pub fn parents(&self, tag: &str) -> &[String] {
        self.parents.get(tag).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Position of `child` in the declared order of `parent`, if one is enforced
    pub fn order_index(&self, parent: &str, child: &str) -> Option<usize> {
        let entry = self.entry(parent)?;
        if !entry.ordered {
            return None;
        }
        entry.children.iter().position(|c| c == child)
    }
}
