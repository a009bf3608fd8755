use super::{print_json, Context, OutputFormat};
use anyhow::{bail, Result};
use clap::Args;
use colored::Colorize;
use scl_foundation::{identity as identity_of, locate as locate_in, selector, Identity};
use scl_parser::{Document, Element, NodeId};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct LocateArgs {
    /// SCL file to read
    pub file: PathBuf,

    /// Tag of the element to find
    pub tag: String,

    /// Identity of the element, as printed by `scl identity`
    pub identity: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LocateReport<'a> {
    tag: &'a str,
    identity: &'a Identity,
    selector: String,
    node: Option<NodeId>,
    element: Option<&'a Element>,
}

pub fn locate(args: LocateArgs, ctx: &Context) -> Result<()> {
    let doc = ctx.open(&args.file)?;
    let schema = ctx.schema();
    let identity = Identity::from(args.identity.as_str());

    let node = locate_in(&doc, schema, &args.tag, &identity);
    let report = LocateReport {
        tag: &args.tag,
        identity: &identity,
        selector: selector(schema, &args.tag, &identity),
        node,
        element: node.map(|id| doc.element(id)),
    };

    match ctx.format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text => {
            println!("{} {}", "Selector:".bold(), report.selector);
            if let Some(id) = node {
                println!("{} {} {}", "Found:".green().bold(), id, start_tag(&doc, id));
                if ctx.verbose {
                    // The element must resolve back to the identity it was located by
                    println!("   Identity: {}", identity_of(&doc, schema, id));
                }
            }
        }
    }

    if node.is_none() {
        bail!("No {} with identity '{}' in {}", args.tag, identity, args.file.display());
    }
    Ok(())
}

/// `<Tag a="1" b="2">` rendering of an element's opening tag
fn start_tag(doc: &Document, id: NodeId) -> String {
    let element = doc.element(id);
    let mut out = format!("<{}", element.tag);
    for (name, value) in &element.attributes {
        out.push_str(&format!(" {}=\"{}\"", name, value));
    }
    out.push('>');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use scl_parser::parse;

    #[test]
    fn test_start_tag_keeps_attribute_order() {
        let doc = parse(r#"<SCL><Bay name="Q01" desc="feeder"/></SCL>"#).unwrap();
        let bay = doc.query_selector("Bay").unwrap().unwrap();
        assert_eq!(start_tag(&doc, bay), r#"<Bay name="Q01" desc="feeder">"#);
    }
}
