use super::{print_json, Context, OutputFormat};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use scl_common::{walk_element, Visitor};
use scl_foundation::{identity as identity_of, Identity, TagSchema};
use scl_parser::{Document, NodeId};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct IdentityArgs {
    /// SCL file to read
    pub file: PathBuf,

    /// Only list elements with this tag
    #[arg(short, long)]
    pub tag: Option<String>,

    /// Include elements without a public identity
    #[arg(short, long)]
    pub all: bool,
}

#[derive(Debug, Serialize)]
pub struct IdentityEntry {
    pub tag: String,
    pub identity: Identity,
}

/// Collects identities in document order
struct IdentityCollector<'a> {
    schema: &'a TagSchema,
    tag: Option<&'a str>,
    all: bool,
    entries: Vec<IdentityEntry>,
}

impl Visitor for IdentityCollector<'_> {
    fn visit_element(&mut self, doc: &Document, id: NodeId) {
        let tag = doc.tag(id);
        if self.tag.map_or(true, |wanted| wanted == tag) {
            let identity = identity_of(doc, self.schema, id);
            if self.all || !identity.is_nan() {
                self.entries.push(IdentityEntry {
                    tag: tag.to_string(),
                    identity,
                });
            }
        }
        walk_element(self, doc, id);
    }
}

pub fn identity(args: IdentityArgs, ctx: &Context) -> Result<()> {
    let doc = ctx.open(&args.file)?;

    let mut collector = IdentityCollector {
        schema: ctx.schema(),
        tag: args.tag.as_deref(),
        all: args.all,
        entries: Vec::new(),
    };
    collector.visit_document(&doc);

    match ctx.format {
        OutputFormat::Json => print_json(&collector.entries)?,
        OutputFormat::Text => {
            for entry in &collector.entries {
                let identity = match &entry.identity {
                    Identity::Public(identity) => identity.normal(),
                    Identity::NaN => "NaN".dimmed(),
                };
                println!("{} {}", entry.tag.cyan(), identity);
            }
            if ctx.verbose {
                println!();
                println!("   Elements listed: {}", collector.entries.len());
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scl_parser::parse;

    fn collect(source: &str, tag: Option<&str>, all: bool) -> Vec<String> {
        let doc = parse(source).unwrap();
        let mut collector = IdentityCollector {
            schema: TagSchema::scl(),
            tag,
            all,
            entries: Vec::new(),
        };
        collector.visit_document(&doc);
        collector
            .entries
            .into_iter()
            .map(|entry| format!("{} {}", entry.tag, entry.identity))
            .collect()
    }

    const SOURCE: &str = r#"<SCL>
        <Substation name="AA1">
            <Private type="x"><VoltageLevel name="hidden"/></Private>
            <VoltageLevel name="E1"><Bay name="Q01"/></VoltageLevel>
        </Substation>
    </SCL>"#;

    #[test]
    fn test_lists_public_identities_in_order() {
        assert_eq!(
            collect(SOURCE, None, false),
            vec!["SCL ", "Substation AA1", "VoltageLevel AA1>E1", "Bay AA1>E1>Q01"]
        );
    }

    #[test]
    fn test_tag_filter_and_all() {
        assert_eq!(
            collect(SOURCE, Some("VoltageLevel"), true),
            vec!["VoltageLevel NaN", "VoltageLevel AA1>E1"]
        );
    }
}
