use crate::schema::TagSchema;
use scl_parser::{Document, NodeId};

/// The sibling a new `child_tag` element has to be inserted before.
///
/// Returns the first child of `parent`, outside any private subtree, whose tag
/// comes strictly after `child_tag` in the parent's declared order. `None`
/// means "append at the end", which is also the answer when the parent has no
/// enforced order or `child_tag` is not part of it.
pub fn get_reference(
    doc: &Document,
    schema: &TagSchema,
    parent: NodeId,
    child_tag: &str,
) -> Option<NodeId> {
    let parent_tag = doc.tag(parent);
    let position = schema.order_index(parent_tag, child_tag)?;
    let order = schema.children(parent_tag);
    let private = schema.private_tag();

    doc.children(parent).iter().copied().find(|child| {
        doc.closest(*child, private).is_none()
            && order
                .iter()
                .position(|tag| tag == doc.tag(*child))
                .is_some_and(|index| index > position)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use scl_parser::parse;

    fn reference_tag(source: &str, child_tag: &str) -> Option<String> {
        let doc = parse(source).unwrap();
        get_reference(&doc, TagSchema::scl(), doc.root(), child_tag)
            .map(|id| doc.tag(id).to_string())
    }

    #[test]
    fn test_lnode_goes_before_equipment() {
        let bay = r#"<Bay><Private>testprivate</Private><ConductingEquipment name="QA1"/></Bay>"#;
        assert_eq!(reference_tag(bay, "LNode").as_deref(), Some("ConductingEquipment"));

        let bay = r#"<Bay><Private/><PowerTransformer name="pTrans"/><ConductingEquipment name="QA1"/></Bay>"#;
        assert_eq!(reference_tag(bay, "LNode").as_deref(), Some("PowerTransformer"));
    }

    #[test]
    fn test_substation_goes_before_ied() {
        let scl = r#"<SCL><Header/><IED name="IED"/><DataTypeTemplates/></SCL>"#;
        assert_eq!(reference_tag(scl, "Substation").as_deref(), Some("IED"));
    }

    #[test]
    fn test_voltage_level_appends() {
        let substation = r#"<Substation><Private/><LNode/></Substation>"#;
        assert_eq!(reference_tag(substation, "VoltageLevel"), None);
    }

    #[test]
    fn test_bay_goes_before_function() {
        let level = r#"<VoltageLevel><Private/><Function/></VoltageLevel>"#;
        assert_eq!(reference_tag(level, "Bay").as_deref(), Some("Function"));
    }

    #[test]
    fn test_equipment_goes_before_connectivity_node() {
        let bay = r#"<Bay><Private/><ConnectivityNode/></Bay>"#;
        assert_eq!(
            reference_tag(bay, "ConductingEquipment").as_deref(),
            Some("ConnectivityNode")
        );
    }

    #[test]
    fn test_same_tag_is_not_a_reference() {
        let bay = r#"<Bay><ConductingEquipment name="QA1"/><ConnectivityNode/></Bay>"#;
        assert_eq!(
            reference_tag(bay, "ConductingEquipment").as_deref(),
            Some("ConnectivityNode")
        );
    }

    #[test]
    fn test_unordered_and_unknown() {
        let services = r#"<Services><GOOSE/><DynAssociation/></Services>"#;
        assert_eq!(reference_tag(services, "GetDirectory"), None);

        let bay = r#"<Bay><ConnectivityNode/></Bay>"#;
        assert_eq!(reference_tag(bay, "IED"), None);
    }
}
