//! Locator construction: the inverse of [`crate::identity`].
//!
//! Every identity rule has a matching parser here that splits the breadcrumb
//! back into attribute, index and text terms. Parent segments are resolved
//! recursively over every tag that may contain the element, and the branches
//! are joined into one comma-separated [`SelectorList`].

use crate::identity::{is_public, Identity, DEFAULT_PROT_NS_TYPE};
use crate::schema::{IdentityPolicy, SpecialRule, TagSchema};
use scl_parser::query::Combinator;
use scl_parser::{ComplexSelector, Compound, Document, Filter, NodeId, SelectorList};
use tracing::{instrument, trace};

/// Recursion bound for singleton chains
const MAX_DEPTH: usize = 64;

/// Locator string for `tag` and `identity`; `:not(*)` when nothing can match
pub fn selector(schema: &TagSchema, tag: &str, identity: &Identity) -> String {
    build_selector(schema, tag, identity).to_string()
}

/// Structured form of [`selector`]
pub fn build_selector(schema: &TagSchema, tag: &str, identity: &Identity) -> SelectorList {
    let Some(identity) = identity.as_str() else {
        return SelectorList::void();
    };

    let private = Compound::tag(schema.private_tag());
    let branches: Vec<ComplexSelector> = branches(schema, tag, identity, 0)
        .into_iter()
        .filter(|b| !b.is_void())
        .map(|b| exclude_private(b, &private))
        .collect();

    if branches.is_empty() {
        SelectorList::void()
    } else {
        SelectorList::new(branches)
    }
}

/// Find the public element with the given tag and identity
#[instrument(skip(doc, schema))]
pub fn locate(doc: &Document, schema: &TagSchema, tag: &str, identity: &Identity) -> Option<NodeId> {
    let list = build_selector(schema, tag, identity);
    let found = doc
        .select(&list)
        .into_iter()
        .find(|id| is_public(doc, schema, *id));
    trace!(?found, "located");
    found
}

/// Branches not pinned to the root by child steps alone could reach into private content
fn exclude_private(mut branch: ComplexSelector, private: &Compound) -> ComplexSelector {
    let anchored = branch
        .compounds
        .first()
        .is_some_and(|c| c.filters.contains(&Filter::Root))
        && branch.combinators.iter().all(|c| *c == Combinator::Child);
    if !anchored {
        if let Some(subject) = branch.compounds.last_mut() {
            subject.filters.push(Filter::NotWithin(Box::new(private.clone())));
        }
    }
    branch
}

fn branches(schema: &TagSchema, tag: &str, identity: &str, depth: usize) -> Vec<ComplexSelector> {
    if depth > MAX_DEPTH {
        return Vec::new();
    }

    match schema.policy(tag) {
        IdentityPolicy::Singleton => singleton(schema, tag, identity, depth),
        IdentityPolicy::Naming => naming(schema, tag, identity, depth),
        IdentityPolicy::Special(rule) => special(schema, tag, identity, rule, depth)
            .unwrap_or_default(),
        IdentityPolicy::None => Vec::new(),
    }
}

/// The tag under every possible parent carrying the same identity
fn singleton(schema: &TagSchema, tag: &str, identity: &str, depth: usize) -> Vec<ComplexSelector> {
    let parents: Vec<ComplexSelector> = schema
        .parents(tag)
        .iter()
        .flat_map(|parent| branches(schema, parent, identity, depth + 1))
        .collect();
    join(parents, vec![Compound::tag(tag)])
}

fn naming(schema: &TagSchema, tag: &str, identity: &str, depth: usize) -> Vec<ComplexSelector> {
    let (parent, name) = match identity.rsplit_once('>') {
        Some((parent, name)) => (Some(parent), name),
        None => (None, identity),
    };
    let parents = parent_branches(schema, tag, parent, depth);
    join(parents, with_attributes(Compound::tag(tag), &[("name", name)]))
}

/// Locators of the possible parents of `tag`.
///
/// `None` stands for "directly under the document root", which is the only
/// place where a breadcrumb has no separator.
fn parent_branches(
    schema: &TagSchema,
    tag: &str,
    parent_identity: Option<&str>,
    depth: usize,
) -> Vec<ComplexSelector> {
    let root = schema.root_tag();
    let parents = schema.parents(tag);
    match parent_identity {
        None if parents.iter().any(|p| p == root) => {
            vec![ComplexSelector::new(Compound::root())]
        }
        None => Vec::new(),
        Some(identity) => parents
            .iter()
            .filter(|p| p.as_str() != root)
            .flat_map(|p| branches(schema, p, identity, depth + 1))
            .collect(),
    }
}

/// Child-combinator cross product of parent locators and subject compounds
fn join(parents: Vec<ComplexSelector>, subjects: Vec<Compound>) -> Vec<ComplexSelector> {
    combine(parents, subjects, Combinator::Child)
}

fn combine(
    parents: Vec<ComplexSelector>,
    subjects: Vec<Compound>,
    combinator: Combinator,
) -> Vec<ComplexSelector> {
    let subjects: Vec<Compound> = subjects.into_iter().filter(|s| !s.is_void()).collect();
    let mut out = Vec::with_capacity(parents.len() * subjects.len());
    for parent in parents.iter().filter(|p| !p.is_void()) {
        for subject in &subjects {
            let branch = match combinator {
                Combinator::Child => parent.clone().child(subject.clone()),
                Combinator::Descendant => parent.clone().descendant(subject.clone()),
            };
            out.push(branch);
        }
    }
    out
}

/// Global locators without a parent chain
fn global(subjects: Vec<Compound>) -> Vec<ComplexSelector> {
    subjects
        .into_iter()
        .filter(|s| !s.is_void())
        .map(ComplexSelector::new)
        .collect()
}

/// Expand `base` with attribute-equality terms.
///
/// An empty value cannot tell an absent attribute from an empty one, so it
/// yields both alternatives `:not([a])` and `[a=""]`.
fn with_attributes(base: Compound, attributes: &[(&str, &str)]) -> Vec<Compound> {
    let mut compounds = vec![base];
    for (name, value) in attributes {
        let alternatives: Vec<Filter> = if value.is_empty() {
            vec![absent(name), Filter::AttributeEquals(name.to_string(), String::new())]
        } else {
            vec![Filter::AttributeEquals(name.to_string(), value.to_string())]
        };
        compounds = compounds
            .into_iter()
            .flat_map(|c| alternatives.iter().map(move |f| c.clone().with(f.clone())))
            .collect();
    }
    compounds
}

fn absent(name: &str) -> Filter {
    Filter::Not(Box::new(
        Compound::any().with(Filter::HasAttribute(name.to_string())),
    ))
}

/// Absent or empty in one term, so sibling indices count both
fn unset(name: &str) -> Filter {
    let empty = Compound::any().attribute(name, "");
    Filter::Not(Box::new(
        Compound::any()
            .with(Filter::HasAttribute(name.to_string()))
            .with(Filter::Not(Box::new(empty))),
    ))
}

/// Equal to `value`, or [`unset`] when `value` is empty
fn indexed_value(base: Compound, name: &str, value: &str) -> Compound {
    if value.is_empty() {
        base.with(unset(name))
    } else {
        base.attribute(name, value)
    }
}

fn with_filter(compounds: Vec<Compound>, filter: Filter) -> Vec<Compound> {
    compounds.into_iter().map(|c| c.with(filter.clone())).collect()
}

/// Split `{parent}>{rest}` on the last separator
fn path_parts(identity: &str) -> Option<(&str, &str)> {
    identity.rsplit_once('>')
}

/// Split on spaces into exactly `N` fields, the last one taking the remainder
fn fields<const N: usize>(value: &str) -> Option<[&str; N]> {
    let mut parts = value.splitn(N, ' ');
    let mut out = [""; N];
    for slot in out.iter_mut() {
        *slot = parts.next()?;
    }
    Some(out)
}

/// `{ldInst}/{prefix} {lnClass} {lnInst}` style references
struct LnRef<'a> {
    ld_inst: &'a str,
    prefix: &'a str,
    ln_class: &'a str,
    ln_inst: &'a str,
}

impl<'a> LnRef<'a> {
    /// Parse `{head...} {ldInst}/{prefix} {lnClass} {lnInst}` where the head
    /// has `H` space-separated fields before `ldInst`
    fn parse<const H: usize>(value: &'a str) -> Option<([&'a str; H], Self)> {
        let (left, right) = value.split_once('/')?;
        let (head, ld_inst) = left.rsplit_once(' ')?;
        let [prefix, ln_class, ln_inst] = fields::<3>(right)?;
        Some((
            fields::<H>(head)?,
            Self {
                ld_inst,
                prefix,
                ln_class,
                ln_inst,
            },
        ))
    }

    fn attributes(&self) -> [(&'static str, &'a str); 4] {
        [
            ("ldInst", self.ld_inst),
            ("prefix", self.prefix),
            ("lnClass", self.ln_class),
            ("lnInst", self.ln_inst),
        ]
    }
}

fn special(
    schema: &TagSchema,
    tag: &str,
    identity: &str,
    rule: SpecialRule,
    depth: usize,
) -> Option<Vec<ComplexSelector>> {
    let base = Compound::tag(tag);

    let selectors = match rule {
        SpecialRule::Root => {
            if !identity.is_empty() {
                return None;
            }
            vec![ComplexSelector::new(Compound::root())]
        }
        SpecialRule::IdNaming => {
            let id = identity.strip_prefix('#')?;
            let parents = singleton_parents(schema, tag, "", depth);
            join(parents, with_attributes(base, &[("id", id)]))
        }
        SpecialRule::Hitem => {
            let (version, revision) = identity.split_once('\t')?;
            let parents = singleton_parents(schema, tag, "", depth);
            join(
                parents,
                with_attributes(base, &[("version", version), ("revision", revision)]),
            )
        }
        SpecialRule::Terminal => {
            let (parent, node) = path_parts(identity)?;
            let parents = parent_branches(schema, tag, Some(parent), depth);
            join(parents, with_attributes(base, &[("connectivityNode", node)]))
        }
        SpecialRule::LNode => {
            if identity.ends_with(')') {
                let (parent, rest) = path_parts(identity)?;
                let inner = rest.strip_prefix('(')?.strip_suffix(')')?;
                let [ln_class, ln_inst, ln_type] = fields::<3>(inner)?;
                let parents = parent_branches(schema, tag, Some(parent), depth);
                join(
                    parents,
                    with_attributes(
                        base,
                        &[
                            ("iedName", "None"),
                            ("lnClass", ln_class),
                            ("lnInst", ln_inst),
                            ("lnType", ln_type),
                        ],
                    ),
                )
            } else {
                let ([ied_name], mut reference) = LnRef::parse::<1>(identity)?;
                if reference.ld_inst == "(Client)" {
                    reference.ld_inst = "";
                }
                let mut attributes = vec![("iedName", ied_name)];
                attributes.extend(reference.attributes());
                global(with_attributes(base, &attributes))
            }
        }
        SpecialRule::Kdc => {
            let (parent, rest) = path_parts(identity)?;
            let [ied_name, ap_name] = fields::<2>(rest)?;
            let parents = parent_branches(schema, tag, Some(parent), depth);
            join(
                parents,
                with_attributes(base, &[("iedName", ied_name), ("apName", ap_name)]),
            )
        }
        SpecialRule::Association => {
            let (parent, association) = path_parts(identity)?;
            let parents = parent_branches(schema, tag, Some(parent), depth);
            join(parents, with_attributes(base, &[("associationID", association)]))
        }
        SpecialRule::LDevice => {
            let (ied, inst) = identity.split_once(">>")?;
            let parents = branches(schema, "IED", ied, depth + 1);
            combine(
                parents,
                with_attributes(base, &[("inst", inst)]),
                Combinator::Descendant,
            )
        }
        SpecialRule::IedName => {
            let (parent, rest) = path_parts(identity)?;
            let ([text, ap_ref], reference) = LnRef::parse::<2>(rest)?;
            let mut attributes = vec![("apRef", ap_ref)];
            attributes.extend(reference.attributes());
            let parents = parent_branches(schema, tag, Some(parent), depth);
            join(
                parents,
                with_filter(
                    with_attributes(base, &attributes),
                    Filter::Text(text.to_string()),
                ),
            )
        }
        SpecialRule::Fcda => {
            let (parent, rest) = path_parts(identity)?;
            let (address, fc_part) = rest.strip_suffix(')')?.rsplit_once(" (")?;
            let (fc, ix) = match fc_part.split_once(" [") {
                Some((fc, ix)) => (fc, ix.strip_suffix(']')?),
                None => (fc_part, ""),
            };
            let (ld_inst, rest) = address.split_once('/')?;
            let (ln_part, data_part) = rest.split_once('.')?;
            let [prefix, ln_class, ln_inst] = fields::<3>(ln_part)?;
            let (do_name, da_name) = data_part.rsplit_once(' ')?;
            let parents = parent_branches(schema, tag, Some(parent), depth);
            join(
                parents,
                with_attributes(
                    base,
                    &[
                        ("ldInst", ld_inst),
                        ("prefix", prefix),
                        ("lnClass", ln_class),
                        ("lnInst", ln_inst),
                        ("doName", do_name),
                        ("daName", da_name),
                        ("fc", fc),
                        ("ix", ix),
                    ],
                ),
            )
        }
        SpecialRule::ExtRef => {
            let (parent, rest) = path_parts(identity)?;
            let parents = parent_branches(schema, tag, Some(parent), depth);
            join(parents, ext_ref_compounds(base, rest)?)
        }
        SpecialRule::Ln => {
            let (parent, rest) = path_parts(identity)?;
            let [prefix, ln_class, inst] = fields::<3>(rest)?;
            let parents = parent_branches(schema, tag, Some(parent), depth);
            join(
                parents,
                with_attributes(
                    base,
                    &[("prefix", prefix), ("lnClass", ln_class), ("inst", inst)],
                ),
            )
        }
        SpecialRule::ClientLn => {
            let (parent, rest) = path_parts(identity)?;
            let ([ied_name, ap_ref], reference) = LnRef::parse::<2>(rest)?;
            let mut attributes = vec![("iedName", ied_name), ("apRef", ap_ref)];
            attributes.extend(reference.attributes());
            let parents = parent_branches(schema, tag, Some(parent), depth);
            join(parents, with_attributes(base, &attributes))
        }
        SpecialRule::Dai => {
            let (parent, name) = path_parts(identity)?;
            let parents = parent_branches(schema, tag, Some(parent), depth);
            join(parents, with_attributes(base, &[("name", name)]))
        }
        SpecialRule::Val => {
            let (parent, rest) = path_parts(identity)?;
            let (group, index) = rest.rsplit_once(' ')?;
            let index: usize = index.parse().ok()?;
            let group = if group.is_empty() {
                group
            } else {
                group.strip_suffix('.').filter(|g| !g.is_empty())?
            };
            let compound = indexed_value(base, "sGroup", group);
            let parents = parent_branches(schema, tag, Some(parent), depth);
            join(parents, vec![compound.with(Filter::Index(index))])
        }
        SpecialRule::ConnectedAp => {
            let [ied_name, ap_name] = fields::<2>(identity)?;
            global(with_attributes(
                base,
                &[("iedName", ied_name), ("apName", ap_name)],
            ))
        }
        SpecialRule::ControlBlock => {
            let [ld_inst, cb_name] = fields::<2>(identity)?;
            global(with_attributes(
                base,
                &[("ldInst", ld_inst), ("cbName", cb_name)],
            ))
        }
        SpecialRule::PhysConn => {
            let (parent, kind) = path_parts(identity)?;
            let parents = parent_branches(schema, tag, Some(parent), depth);
            join(parents, with_attributes(base, &[("type", kind)]))
        }
        SpecialRule::P => {
            let (parent, rest) = path_parts(identity)?;
            let indexed = rest
                .strip_suffix(']')
                .and_then(|r| r.rsplit_once(" ["))
                .and_then(|(kind, index)| Some((kind, index.parse::<usize>().ok()?)));

            let parents: Vec<ComplexSelector> = schema
                .parents(tag)
                .iter()
                .filter(|p| (p.as_str() == "PhysConn") == indexed.is_none())
                .flat_map(|p| branches(schema, p, parent, depth + 1))
                .collect();

            match indexed {
                Some((kind, index)) => join(
                    parents,
                    vec![indexed_value(base, "type", kind).with(Filter::Index(index))],
                ),
                None => join(parents, with_attributes(base, &[("type", rest)])),
            }
        }
        SpecialRule::EnumVal => {
            let (parent, ord) = path_parts(identity)?;
            let parents = parent_branches(schema, tag, Some(parent), depth);
            join(parents, with_attributes(base, &[("ord", ord)]))
        }
        SpecialRule::ProtNs => {
            let (parent, rest) = path_parts(identity)?;
            let (kind, text) = rest.split_once('\t')?;
            let compounds = if kind == DEFAULT_PROT_NS_TYPE {
                vec![
                    base.clone().with(absent("type")),
                    base.clone().attribute("type", ""),
                    base.attribute("type", kind),
                ]
            } else {
                vec![base.attribute("type", kind)]
            };
            let parents = parent_branches(schema, tag, Some(parent), depth);
            join(parents, with_filter(compounds, Filter::Text(text.to_string())))
        }
    };

    Some(selectors)
}

/// Parent locators for rules whose parent chain is made of singletons
fn singleton_parents(
    schema: &TagSchema,
    tag: &str,
    identity: &str,
    depth: usize,
) -> Vec<ComplexSelector> {
    schema
        .parents(tag)
        .iter()
        .flat_map(|p| branches(schema, p, identity, depth + 1))
        .collect()
}

fn ext_ref_compounds(base: Compound, rest: &str) -> Option<Vec<Compound>> {
    if let Some(head) = rest.strip_suffix(']') {
        let (int_addr, index) = head.rsplit_once('[')?;
        let index: usize = index.parse().ok()?;
        return Some(with_filter(
            with_attributes(base, &[("intAddr", int_addr)]),
            Filter::Index(index),
        ));
    }

    let (body, int_addr) = match rest.split_once('@') {
        Some((body, int_addr)) => (body, int_addr),
        None => (rest, ""),
    };

    let mut attributes: Vec<(&str, &str)> = Vec::new();
    let target = match body.split_once(':') {
        Some((service_type, source)) => {
            let (src_cb_name, source) = source.split_once(' ')?;
            let (src_ld_inst, source) = source.split_once('/')?;
            let [src_prefix, src_ln_class, src_ln_inst, target] = fields::<4>(source)?;
            attributes.extend([
                ("serviceType", service_type),
                ("srcCBName", src_cb_name),
                ("srcLDInst", src_ld_inst),
                ("srcPrefix", src_prefix),
                ("srcLNClass", src_ln_class),
                ("srcLNInst", src_ln_inst),
            ]);
            target
        }
        None => body,
    };

    let ([ied_name], reference) = LnRef::parse::<1>(target)?;
    let [prefix, ln_class, rest] = [reference.prefix, reference.ln_class, reference.ln_inst];
    let [ln_inst, do_name, da_name] = fields::<3>(rest)?;
    if ied_name.is_empty() {
        return None;
    }
    attributes.extend([
        ("iedName", ied_name),
        ("ldInst", reference.ld_inst),
        ("prefix", prefix),
        ("lnClass", ln_class),
        ("lnInst", ln_inst),
        ("doName", do_name),
        ("daName", da_name),
        ("intAddr", int_addr),
    ]);

    let mut compounds = with_attributes(base, &attributes);
    if !attributes.iter().any(|(name, _)| *name == "srcCBName") {
        compounds = compounds
            .into_iter()
            .flat_map(|c| {
                [
                    c.clone().with(absent("srcCBName")),
                    c.attribute("srcCBName", ""),
                ]
            })
            .collect();
    }
    Some(compounds)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sel(tag: &str, identity: &str) -> String {
        selector(TagSchema::scl(), tag, &Identity::from(identity))
    }

    #[test]
    fn test_nan_is_void() {
        assert_eq!(selector(TagSchema::scl(), "Bay", &Identity::NaN), ":not(*)");
        assert_eq!(selector(TagSchema::scl(), "Private", &Identity::from("x")), ":not(*)");
    }

    #[test]
    fn test_naming_chain() {
        assert_eq!(
            sel("VoltageLevel", "AA1>E1"),
            r#":root>Substation[name="AA1"]>VoltageLevel[name="E1"]"#
        );
    }

    #[test]
    fn test_singleton_under_root() {
        assert_eq!(sel("Header", ""), ":root>Header");
        assert_eq!(sel("Header", "AA1"), ":not(*)");
    }

    #[test]
    fn test_control_block_absent_alternatives() {
        assert_eq!(
            sel("GSE", " GCB"),
            r#"GSE:not([ldInst])[cbName="GCB"]:not(Private *),GSE[ldInst=""][cbName="GCB"]:not(Private *)"#
        );
    }

    #[test]
    fn test_ldevice_uses_descendant() {
        assert_eq!(
            sel("LDevice", "IED1>>CB1"),
            r#":root>IED[name="IED1"] LDevice[inst="CB1"]:not(Private *)"#
        );
    }

    #[test]
    fn test_id_naming() {
        assert_eq!(
            sel("EnumType", "#Dummy_ctlModel"),
            r#":root>DataTypeTemplates>EnumType[id="Dummy_ctlModel"]"#
        );
        assert_eq!(sel("EnumType", "Dummy_ctlModel"), ":not(*)");
    }

    #[test]
    fn test_malformed_special_is_void() {
        assert_eq!(sel("FCDA", "IED1>>CB1>DS>garbage"), ":not(*)");
        assert_eq!(sel("Val", "IED1>>CB1> XCBR 1>Pos>ctlModel>x"), ":not(*)");
    }

    #[test]
    fn test_global_branch_skips_private_twin() {
        let doc = scl_parser::parse(
            r#"<SCL><Substation name="AA1"><Private type="x"><LNode iedName="IED1" ldInst="CB1" lnClass="XCBR" lnInst="1"/></Private><Bay name="Q01"><LNode iedName="IED1" ldInst="CB1" lnClass="XCBR" lnInst="1"/></Bay></Substation></SCL>"#,
        )
        .unwrap();
        let list = build_selector(TagSchema::scl(), "LNode", &Identity::from("IED1 CB1/ XCBR 1"));
        let found = doc.query_selector(&list.to_string()).unwrap().unwrap();
        assert_eq!(doc.tag(doc.parent(found).unwrap()), "Bay");
        assert_eq!(doc.select(&list), vec![found]);
    }

    #[test]
    fn test_fields_splits_remainder() {
        assert_eq!(fields::<2>("a b c"), Some(["a", "b c"]));
        assert_eq!(fields::<3>("a b"), None);
        assert_eq!(fields::<3>(" XCBR 1"), Some(["", "XCBR", "1"]));
    }
}
