//! Identity resolution.
//!
//! An identity is a human-readable breadcrumb that names an element by its
//! position, attributes and ancestors. It is recomputed on demand and is only
//! valid until the next mutation of the document.

use crate::schema::{IdentityPolicy, SpecialRule, TagSchema};
use scl_parser::{Document, NodeId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default protocol namespace type of `ProtNs`
pub const DEFAULT_PROT_NS_TYPE: &str = "8-MMS";

/// Identity of an element, or the sentinel for non-addressable elements
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum Identity {
    Public(String),
    NaN,
}

impl Identity {
    pub fn is_nan(&self) -> bool {
        matches!(self, Identity::NaN)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Identity::Public(s) => Some(s),
            Identity::NaN => None,
        }
    }
}

impl From<Option<String>> for Identity {
    fn from(value: Option<String>) -> Self {
        value.map(Identity::Public).unwrap_or(Identity::NaN)
    }
}

impl From<Identity> for Option<String> {
    fn from(value: Identity) -> Self {
        match value {
            Identity::Public(s) => Some(s),
            Identity::NaN => None,
        }
    }
}

impl From<&str> for Identity {
    fn from(value: &str) -> Self {
        Identity::Public(value.to_string())
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Public(s) => write!(f, "{}", s),
            Identity::NaN => write!(f, "NaN"),
        }
    }
}

/// True when the element is attached and outside every private subtree
pub fn is_public(doc: &Document, schema: &TagSchema, id: NodeId) -> bool {
    doc.contains(id)
        && doc.is_attached(id)
        && doc.closest(id, schema.private_tag()).is_none()
}

/// Whether `a` in `doc_a` and `b` in `doc_b` denote the same element.
///
/// Private sections compare by owner and content, everything else by tag and
/// identity. Non-addressable elements are never the same as anything.
pub fn is_same(schema: &TagSchema, doc_a: &Document, a: NodeId, doc_b: &Document, b: NodeId) -> bool {
    if !doc_a.contains(a) || !doc_b.contains(b) || doc_a.tag(a) != doc_b.tag(b) {
        return false;
    }

    if doc_a.tag(a) == schema.private_tag() {
        return match (doc_a.parent(a), doc_b.parent(b)) {
            (Some(owner_a), Some(owner_b)) => {
                is_same(schema, doc_a, owner_a, doc_b, owner_b) && same_subtree(doc_a, a, doc_b, b)
            }
            _ => false,
        };
    }

    match (identity(doc_a, schema, a), identity(doc_b, schema, b)) {
        (Identity::Public(x), Identity::Public(y)) => x == y,
        _ => false,
    }
}

/// Structural equality: tag, attributes in any order, text and children
fn same_subtree(doc_a: &Document, a: NodeId, doc_b: &Document, b: NodeId) -> bool {
    let (x, y) = (doc_a.element(a), doc_b.element(b));
    x.tag == y.tag
        && x.attributes == y.attributes
        && x.text == y.text
        && x.children.len() == y.children.len()
        && x.children
            .iter()
            .zip(&y.children)
            .all(|(ca, cb)| same_subtree(doc_a, *ca, doc_b, *cb))
}

/// Compute the identity of `id`
pub fn identity(doc: &Document, schema: &TagSchema, id: NodeId) -> Identity {
    if !is_public(doc, schema, id) {
        return Identity::NaN;
    }
    resolve(doc, schema, id).into()
}

fn resolve(doc: &Document, schema: &TagSchema, id: NodeId) -> Option<String> {
    let tag = doc.tag(id);
    match schema.policy(tag) {
        IdentityPolicy::Singleton => parent_identity(doc, schema, id),
        IdentityPolicy::Naming => naming(doc, schema, id),
        IdentityPolicy::Special(rule) => special(doc, schema, id, rule),
        IdentityPolicy::None => None,
    }
}

fn parent_identity(doc: &Document, schema: &TagSchema, id: NodeId) -> Option<String> {
    let parent = doc.parent(id)?;
    resolve(doc, schema, parent)
}

fn naming(doc: &Document, schema: &TagSchema, id: NodeId) -> Option<String> {
    let parent = doc.parent(id)?;
    let name = attr(doc, id, "name");
    if parent == doc.root() {
        return Some(name.to_string());
    }
    let parent_identity = resolve(doc, schema, parent)?;
    Some(format!("{}>{}", parent_identity, name))
}

/// Attribute value with absent rendered as empty
fn attr<'a>(doc: &'a Document, id: NodeId, name: &str) -> &'a str {
    doc.attribute(id, name).unwrap_or("")
}

/// Present and non-empty
fn is_set(doc: &Document, id: NodeId, name: &str) -> bool {
    !attr(doc, id, name).is_empty()
}

/// Position among same-tag siblings whose `name` attribute equals ours, absent counting as empty
fn index_by_attribute(doc: &Document, id: NodeId, name: &str) -> Option<usize> {
    let parent = doc.parent(id)?;
    let tag = doc.tag(id);
    let value = attr(doc, id, name);
    doc.children(parent)
        .iter()
        .filter(|s| doc.tag(**s) == tag && attr(doc, **s, name) == value)
        .position(|s| *s == id)
}

fn special(doc: &Document, schema: &TagSchema, id: NodeId, rule: SpecialRule) -> Option<String> {
    let a = |name: &str| attr(doc, id, name);
    let parent = || parent_identity(doc, schema, id);

    let identity = match rule {
        SpecialRule::Root => {
            if id != doc.root() {
                return None;
            }
            String::new()
        }
        SpecialRule::IdNaming => format!("#{}", a("id")),
        SpecialRule::Hitem => format!("{}\t{}", a("version"), a("revision")),
        SpecialRule::Terminal => format!("{}>{}", parent()?, a("connectivityNode")),
        SpecialRule::LNode => {
            if a("iedName") == "None" {
                format!(
                    "{}>({} {} {})",
                    parent()?,
                    a("lnClass"),
                    a("lnInst"),
                    a("lnType")
                )
            } else {
                let ld_inst = if is_set(doc, id, "ldInst") {
                    a("ldInst")
                } else {
                    "(Client)"
                };
                format!(
                    "{} {}/{} {} {}",
                    a("iedName"),
                    ld_inst,
                    a("prefix"),
                    a("lnClass"),
                    a("lnInst")
                )
            }
        }
        SpecialRule::Kdc => format!("{}>{} {}", parent()?, a("iedName"), a("apName")),
        SpecialRule::Association => format!("{}>{}", parent()?, a("associationID")),
        SpecialRule::LDevice => {
            let ied = doc.closest(id, "IED")?;
            format!("{}>>{}", resolve(doc, schema, ied)?, a("inst"))
        }
        SpecialRule::IedName => format!(
            "{}>{} {} {}/{} {} {}",
            parent()?,
            doc.text(id).unwrap_or("").trim(),
            a("apRef"),
            a("ldInst"),
            a("prefix"),
            a("lnClass"),
            a("lnInst")
        ),
        SpecialRule::Fcda => {
            let ix = if is_set(doc, id, "ix") {
                format!(" [{}]", a("ix"))
            } else {
                String::new()
            };
            format!(
                "{}>{}/{} {} {}.{} {} ({}{})",
                parent()?,
                a("ldInst"),
                a("prefix"),
                a("lnClass"),
                a("lnInst"),
                a("doName"),
                a("daName"),
                a("fc"),
                ix
            )
        }
        SpecialRule::ExtRef => {
            let parent = parent()?;
            if !is_set(doc, id, "iedName") {
                let index = index_by_attribute(doc, id, "intAddr")?;
                return Some(format!("{}>{}[{}]", parent, a("intAddr"), index));
            }
            let control_block = if is_set(doc, id, "srcCBName") {
                format!(
                    "{}:{} {}/{} {} {} ",
                    a("serviceType"),
                    a("srcCBName"),
                    a("srcLDInst"),
                    a("srcPrefix"),
                    a("srcLNClass"),
                    a("srcLNInst")
                )
            } else {
                String::new()
            };
            let int_addr = if is_set(doc, id, "intAddr") {
                format!("@{}", a("intAddr"))
            } else {
                String::new()
            };
            format!(
                "{}>{}{} {}/{} {} {} {} {}{}",
                parent,
                control_block,
                a("iedName"),
                a("ldInst"),
                a("prefix"),
                a("lnClass"),
                a("lnInst"),
                a("doName"),
                a("daName"),
                int_addr
            )
        }
        SpecialRule::Ln => format!(
            "{}>{} {} {}",
            parent()?,
            a("prefix"),
            a("lnClass"),
            a("inst")
        ),
        SpecialRule::ClientLn => format!(
            "{}>{} {} {}/{} {} {}",
            parent()?,
            a("iedName"),
            a("apRef"),
            a("ldInst"),
            a("prefix"),
            a("lnClass"),
            a("lnInst")
        ),
        SpecialRule::Dai => format!("{}>{}", parent()?, a("name")),
        SpecialRule::Val => {
            let group = if is_set(doc, id, "sGroup") {
                format!("{}.", a("sGroup"))
            } else {
                String::new()
            };
            let index = index_by_attribute(doc, id, "sGroup")?;
            format!("{}>{} {}", parent()?, group, index)
        }
        SpecialRule::ConnectedAp => format!("{} {}", a("iedName"), a("apName")),
        SpecialRule::ControlBlock => format!("{} {}", a("ldInst"), a("cbName")),
        SpecialRule::PhysConn => format!("{}>{}", parent()?, a("type")),
        SpecialRule::P => {
            let in_phys_conn = doc
                .parent(id)
                .is_some_and(|p| doc.tag(p) == "PhysConn");
            if in_phys_conn {
                format!("{}>{}", parent()?, a("type"))
            } else {
                let index = index_by_attribute(doc, id, "type")?;
                format!("{}>{} [{}]", parent()?, a("type"), index)
            }
        }
        SpecialRule::EnumVal => format!("{}>{}", parent()?, a("ord")),
        SpecialRule::ProtNs => format!(
            "{}>{}\t{}",
            parent()?,
            if is_set(doc, id, "type") {
                a("type")
            } else {
                DEFAULT_PROT_NS_TYPE
            },
            doc.text(id).unwrap_or("").trim()
        ),
    };

    Some(identity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scl_parser::parse;

    fn find(doc: &Document, locator: &str) -> NodeId {
        doc.query_selector(locator).unwrap().unwrap()
    }

    #[test]
    fn test_root_and_naming() {
        let doc = parse(
            r#"<SCL><Substation name="AA1"><VoltageLevel name="E1"/></Substation>
            <Communication><SubNetwork name="S1"/></Communication></SCL>"#,
        )
        .unwrap();
        let schema = TagSchema::scl();

        assert_eq!(identity(&doc, schema, doc.root()), Identity::from(""));
        assert_eq!(identity(&doc, schema, find(&doc, "Substation")), Identity::from("AA1"));
        assert_eq!(identity(&doc, schema, find(&doc, "VoltageLevel")), Identity::from("AA1>E1"));
        assert_eq!(identity(&doc, schema, find(&doc, "Communication")), Identity::from(""));
        assert_eq!(identity(&doc, schema, find(&doc, "SubNetwork")), Identity::from(">S1"));
    }

    #[test]
    fn test_private_and_detached_are_nan() {
        let mut doc = parse(
            r#"<SCL><Substation name="AA1"><Private type="x"><Bay name="B"/></Private></Substation></SCL>"#,
        )
        .unwrap();
        let schema = TagSchema::scl();

        assert!(identity(&doc, schema, find(&doc, "Private")).is_nan());
        assert!(identity(&doc, schema, find(&doc, "Bay")).is_nan());

        let substation = find(&doc, "Substation");
        doc.detach(substation).unwrap();
        assert!(identity(&doc, schema, substation).is_nan());
    }

    #[test]
    fn test_unknown_tag_is_nan() {
        let doc = parse(r#"<SCL><Unknown name="x"/></SCL>"#).unwrap();
        assert!(identity(&doc, TagSchema::scl(), find(&doc, "Unknown")).is_nan());
    }

    #[test]
    fn test_nan_parent_propagates() {
        let doc = parse(r#"<SCL><Unknown><Bay name="B1"/></Unknown></SCL>"#).unwrap();
        assert!(identity(&doc, TagSchema::scl(), find(&doc, "Bay")).is_nan());
    }

    #[test]
    fn test_val_index_counts_same_group() {
        let doc = parse(
            r#"<SCL><DataTypeTemplates><DAType id="T"><BDA name="b">
                <Val sGroup="1">a</Val><Val>b</Val><Val sGroup="1">c</Val>
            </BDA></DAType></DataTypeTemplates></SCL>"#,
        )
        .unwrap();
        let schema = TagSchema::scl();
        let vals = doc.query_selector_all("Val").unwrap();
        let ids: Vec<_> = vals.iter().map(|v| identity(&doc, schema, *v).to_string()).collect();
        assert_eq!(ids, vec!["#T>b>1. 0", "#T>b> 0", "#T>b>1. 1"]);
    }

    #[test]
    fn test_val_empty_group_has_no_prefix() {
        let doc = parse(
            r#"<SCL><DataTypeTemplates><DAType id="T"><BDA name="b">
                <Val sGroup="">a</Val><Val>b</Val><Val sGroup="2">c</Val>
            </BDA></DAType></DataTypeTemplates></SCL>"#,
        )
        .unwrap();
        let schema = TagSchema::scl();
        let vals = doc.query_selector_all("Val").unwrap();
        let ids: Vec<_> = vals.iter().map(|v| identity(&doc, schema, *v)).collect();
        assert_eq!(
            ids,
            vec![Identity::from("#T>b> 0"), Identity::from("#T>b> 1"), Identity::from("#T>b>2. 0")]
        );
        for (val, id) in vals.iter().zip(&ids) {
            assert_eq!(crate::selector::locate(&doc, schema, "Val", id), Some(*val));
        }
    }

    #[test]
    fn test_prot_ns_empty_type_uses_default() {
        let doc = parse(
            r#"<SCL><DataTypeTemplates><DAType id="T">
                <ProtNs type="">IEC 61850-8-1:2003</ProtNs>
                <ProtNs type="9-2">IEC 61850-9-2:2004</ProtNs>
            </DAType></DataTypeTemplates></SCL>"#,
        )
        .unwrap();
        let schema = TagSchema::scl();
        let empty = find(&doc, r#"ProtNs[type=""]"#);
        let expected = Identity::from("#T>8-MMS\tIEC 61850-8-1:2003");
        assert_eq!(identity(&doc, schema, empty), expected);
        assert_eq!(crate::selector::locate(&doc, schema, "ProtNs", &expected), Some(empty));
        assert_eq!(
            identity(&doc, schema, find(&doc, r#"ProtNs[type="9-2"]"#)),
            Identity::from("#T>9-2\tIEC 61850-9-2:2004")
        );
    }

    const SAME_SOURCE: &str = r#"<SCL>
        <Header id="h"/>
        <Substation name="AA1">
            <VoltageLevel name="E1">
                <Bay name="Q01"><Private type="p"><Bay name="X"/></Private><ConductingEquipment name="QA1" type="CBR"/></Bay>
            </VoltageLevel>
        </Substation>
        <IED name="IED1"/>
        <Communication/>
        <DataTypeTemplates>
            <LNodeType id="Dummy.LLN0" lnClass="LLN0"/>
            <LNodeType id="Dummy.LLN0.two" lnClass="LLN0"/>
        </DataTypeTemplates>
    </SCL>"#;

    #[test]
    fn test_is_same_across_documents() {
        let (one, two) = (parse(SAME_SOURCE).unwrap(), parse(SAME_SOURCE).unwrap());
        let schema = TagSchema::scl();
        let same = |locator: &str| is_same(schema, &one, find(&one, locator), &two, find(&two, locator));

        assert!(is_same(schema, &one, one.root(), &two, two.root()));
        assert!(same("Header"));
        assert!(same("Communication"));
        assert!(same("DataTypeTemplates"));
        assert!(same(r#"LNodeType[id="Dummy.LLN0"]"#));
        assert!(same("Private"));
    }

    #[test]
    fn test_is_same_within_document() {
        let doc = parse(SAME_SOURCE).unwrap();
        let schema = TagSchema::scl();
        let same = |a: &str, b: &str| is_same(schema, &doc, find(&doc, a), &doc, find(&doc, b));

        for locator in ["Substation", "IED", "Bay", "Communication"] {
            assert!(same(locator, locator), "{}", locator);
        }
        assert!(!same("Substation", "IED"));
        assert!(!same("Substation", "Bay"));
        assert!(!same("Bay", "Communication"));
        assert!(!same("Communication", "IED"));
        assert!(!same(r#"LNodeType[id="Dummy.LLN0"]"#, r#"LNodeType[id="Dummy.LLN0.two"]"#));
    }

    #[test]
    fn test_is_same_rejects_private_content() {
        let doc = parse(SAME_SOURCE).unwrap();
        let schema = TagSchema::scl();
        let private_element = find(&doc, "Private>Bay");
        let public_element = find(&doc, "ConductingEquipment");

        assert!(!is_same(schema, &doc, private_element, &doc, private_element));
        assert!(!is_same(schema, &doc, private_element, &doc, public_element));
    }

    #[test]
    fn test_is_same_private_needs_equal_content() {
        let one = parse(SAME_SOURCE).unwrap();
        let mut two = parse(SAME_SOURCE).unwrap();
        let private = find(&two, "Private");
        two.set_attribute(private, "type", "q");

        assert!(!is_same(TagSchema::scl(), &one, find(&one, "Private"), &two, private));
    }

    #[test]
    fn test_identity_serializes_as_optional_string() {
        let json = serde_json::to_string(&vec![Identity::from("A>B"), Identity::NaN]).unwrap();
        assert_eq!(json, r#"["A>B",null]"#);
    }
}
