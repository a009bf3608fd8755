//! Locator queries over a [`Document`].
//!
//! The dialect is a small CSS subset: tag and `*` tests, attribute presence
//! and equality, `:root`, `:not(compound)`, `:index(n)` and `:text("s")`,
//! joined by the child (`>`) and descendant (whitespace) combinators and
//! separated into alternatives by commas.

mod matcher;
mod parser;
mod selector;

pub use matcher::{matches_complex, matches_compound, matches_list};
pub use parser::{parse_selector, LocatorParser};
pub use selector::{Combinator, ComplexSelector, Compound, Filter, SelectorList};

use crate::ast::{Document, NodeId};
use crate::error::QueryResult;
use tracing::trace;

impl Document {
    /// First attached element in document order matched by `locator`
    pub fn query_selector(&self, locator: &str) -> QueryResult<Option<NodeId>> {
        let list = parse_selector(locator)?;
        Ok(self.select_first(&list))
    }

    /// Every attached element matched by `locator`, in document order
    pub fn query_selector_all(&self, locator: &str) -> QueryResult<Vec<NodeId>> {
        let list = parse_selector(locator)?;
        Ok(self.select(&list))
    }

    pub fn select_first(&self, list: &SelectorList) -> Option<NodeId> {
        if list.is_void() {
            return None;
        }
        let found = self.elements().find(|id| matches_list(self, *id, list));
        trace!(locator = %list, ?found, "select_first");
        found
    }

    pub fn select(&self, list: &SelectorList) -> Vec<NodeId> {
        if list.is_void() {
            return Vec::new();
        }
        self.elements()
            .filter(|id| matches_list(self, *id, list))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::parse;

    const SOURCE: &str = r#"<SCL>
        <Substation name="AA1">
            <VoltageLevel name="E1"><Bay name="B1"/><Bay name="B2"/></VoltageLevel>
        </Substation>
        <IED name="IED1">
            <AccessPoint name="P1"><Server><LDevice inst="CB">
                <LN0 lnClass="LLN0" inst=""/>
                <LN lnClass="XCBR" inst="1"/>
                <LN prefix="" lnClass="XCBR" inst="2"/>
                <LN prefix="CB" lnClass="CSWI" inst="1"/>
            </LDevice></Server></AccessPoint>
        </IED>
        <Communication><SubNetwork name="S1"><ConnectedAP iedName="IED1" apName="P1">
            <Address><P type="IP">10.0.0.1</P><P type="IP">10.0.0.2</P></Address>
        </ConnectedAP></SubNetwork></Communication>
    </SCL>"#;

    #[test]
    fn test_child_chain_from_root() {
        let doc = parse(SOURCE).unwrap();
        let bay = doc
            .query_selector(r#":root>Substation[name="AA1"]>VoltageLevel[name="E1"]>Bay[name="B2"]"#)
            .unwrap()
            .unwrap();
        assert_eq!(doc.attribute(bay, "name"), Some("B2"));
    }

    #[test]
    fn test_descendant_combinator() {
        let doc = parse(SOURCE).unwrap();
        let lns = doc
            .query_selector_all(r#"IED[name="IED1"] LDevice[inst="CB"]>LN"#)
            .unwrap();
        assert_eq!(lns.len(), 3);
    }

    #[test]
    fn test_absent_or_empty_alternatives() {
        let doc = parse(SOURCE).unwrap();
        let lns = doc
            .query_selector_all(r#"LN:not([prefix])[lnClass="XCBR"],LN[prefix=""][lnClass="XCBR"]"#)
            .unwrap();
        let insts: Vec<_> = lns.iter().map(|id| doc.attribute(*id, "inst")).collect();
        assert_eq!(insts, vec![Some("1"), Some("2")]);
    }

    #[test]
    fn test_index_counts_matching_siblings() {
        let doc = parse(SOURCE).unwrap();
        let second = doc
            .query_selector(r#"Address>P[type="IP"]:index(1)"#)
            .unwrap()
            .unwrap();
        assert_eq!(doc.text(second), Some("10.0.0.2"));
        assert_eq!(doc.query_selector(r#"P[type="IP"]:index(2)"#).unwrap(), None);
    }

    #[test]
    fn test_text_filter() {
        let doc = parse(SOURCE).unwrap();
        let found = doc.query_selector(r#"P:text("10.0.0.1")"#).unwrap();
        assert!(found.is_some());
    }

    #[test]
    fn test_void_matches_nothing() {
        let doc = parse(SOURCE).unwrap();
        assert!(doc.query_selector_all(":not(*)").unwrap().is_empty());
    }

    #[test]
    fn test_detached_elements_are_not_found() {
        let mut doc = parse(SOURCE).unwrap();
        let ied = doc.query_selector("IED").unwrap().unwrap();
        doc.detach(ied).unwrap();
        assert_eq!(doc.query_selector("LN0").unwrap(), None);
    }

    #[test]
    fn test_overlapping_branches_are_deduplicated() {
        let doc = parse(SOURCE).unwrap();
        let bays = doc.query_selector_all("Bay,VoltageLevel>Bay").unwrap();
        let names: Vec<_> = bays.iter().map(|id| doc.attribute(*id, "name")).collect();
        assert_eq!(names, vec![Some("B1"), Some("B2")]);
    }
}
