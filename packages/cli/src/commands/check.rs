use super::{print_json, Context, OutputFormat};
use anyhow::{bail, Result};
use clap::Args;
use colored::Colorize;
use scl_common::{find_scl_files, RealFileSystem};
use scl_editor::{ActionResult, Delete, EditSession, History};
use scl_foundation::{identity, is_public, locate, Identity, TagSchema};
use scl_parser::{serialize, Document, NodeId};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// SCL file or directory to check
    pub path: PathBuf,

    /// Also delete and restore every element through the undo history
    #[arg(long)]
    pub edits: bool,
}

/// An element that does not resolve back to itself
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Failure {
    pub node: NodeId,
    pub tag: String,
    pub identity: Identity,
    pub located: Option<NodeId>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReport {
    pub path: PathBuf,
    pub elements: usize,
    pub failures: Vec<Failure>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub edit_failures: Vec<Failure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileReport {
    fn passed(&self) -> bool {
        self.failures.is_empty() && self.edit_failures.is_empty() && self.error.is_none()
    }
}

pub fn check(args: CheckArgs, ctx: &Context) -> Result<()> {
    // An explicitly named file is checked whatever its extension
    let files = if args.path.is_file() {
        vec![args.path.clone()]
    } else {
        find_scl_files(&RealFileSystem, &args.path, ctx.config.extensions.as_slice())?
    };
    if files.is_empty() {
        bail!("No SCL files found at {}", args.path.display());
    }

    let reports: Vec<FileReport> = files
        .iter()
        .map(|file| check_file(file, &args, ctx))
        .collect();

    match ctx.format {
        OutputFormat::Json => print_json(&reports)?,
        OutputFormat::Text => print_reports(&reports, ctx.verbose),
    }

    let failed = reports.iter().filter(|report| !report.passed()).count();
    if failed > 0 {
        bail!("{} of {} files failed the round-trip check", failed, reports.len());
    }
    Ok(())
}

fn check_file(path: &Path, args: &CheckArgs, ctx: &Context) -> FileReport {
    let mut report = FileReport {
        path: path.to_path_buf(),
        elements: 0,
        failures: Vec::new(),
        edit_failures: Vec::new(),
        error: None,
    };

    let doc = match ctx.open(path) {
        Ok(doc) => doc,
        Err(err) => {
            report.error = Some(format!("{:#}", err));
            return report;
        }
    };

    report.elements = public_elements(&doc, ctx.schema()).len();
    report.failures = check_round_trip(&doc, ctx.schema());

    if args.edits {
        match check_edits(doc, ctx.schema(), ctx.config.history_limit) {
            Ok(failures) => report.edit_failures = failures,
            Err(err) => report.error = Some(err.to_string()),
        }
    }

    report
}

fn public_elements(doc: &Document, schema: &TagSchema) -> Vec<NodeId> {
    doc.elements()
        .filter(|id| is_public(doc, schema, *id))
        .collect()
}

/// Every public element must be located again through its own identity
pub fn check_round_trip(doc: &Document, schema: &TagSchema) -> Vec<Failure> {
    public_elements(doc, schema)
        .into_iter()
        .filter_map(|id| {
            let tag = doc.tag(id);
            let identity = identity(doc, schema, id);
            let located = locate(doc, schema, tag, &identity);
            (located != Some(id)).then(|| Failure {
                node: id,
                tag: tag.to_string(),
                identity,
                located,
            })
        })
        .collect()
}

/// Delete every public element and undo it; the document and the element's
/// identity must come back unchanged
pub fn check_edits(doc: Document, schema: &TagSchema, history_limit: usize) -> ActionResult<Vec<Failure>> {
    let original = serialize(&doc);
    let elements = public_elements(&doc, schema);
    let mut session = EditSession::with_schema(doc, schema, History::with_max_levels(history_limit));
    let mut failures = Vec::new();

    for id in elements {
        if id == session.document().root() {
            continue;
        }
        let tag = session.document().tag(id).to_string();
        let before = identity(session.document(), schema, id);

        let delete = Delete::capture(session.document(), id)?;
        session.apply(delete.into())?;
        session.undo()?;

        let after = identity(session.document(), schema, id);
        if after != before || serialize(session.document()) != original {
            failures.push(Failure {
                node: id,
                tag,
                identity: before,
                located: locate(session.document(), schema, session.document().tag(id), &after),
            });
        }
    }

    Ok(failures)
}

fn print_reports(reports: &[FileReport], verbose: bool) {
    for report in reports {
        if let Some(error) = &report.error {
            println!("{} {}: {}", "✗".red(), report.path.display(), error);
            continue;
        }
        if report.passed() {
            if verbose {
                println!(
                    "{} {} ({} elements)",
                    "✓".green(),
                    report.path.display(),
                    report.elements
                );
            }
            continue;
        }

        println!("{} {}", "✗".red(), report.path.display());
        for failure in &report.failures {
            let located = failure
                .located
                .map_or_else(|| "nothing".to_string(), |id| id.to_string());
            println!(
                "  {} {} {} '{}' located {}",
                "round-trip".red().bold(),
                failure.node,
                failure.tag,
                failure.identity,
                located
            );
        }
        for failure in &report.edit_failures {
            println!(
                "  {} {} {} '{}' not restored by undo",
                "edit".red().bold(),
                failure.node,
                failure.tag,
                failure.identity
            );
        }
    }

    let passed = reports.iter().filter(|report| report.passed()).count();
    println!();
    println!("   Files checked: {}", reports.len());
    if passed == reports.len() {
        println!("   {} All elements round-trip", "✓".green());
    } else {
        println!("   {} {}", "Failed:".red(), reports.len() - passed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scl_parser::parse;

    const SOURCE: &str = r#"<SCL>
        <Substation name="AA1">
            <VoltageLevel name="E1"><Bay name="Q01"/><Bay name="Q02"/></VoltageLevel>
        </Substation>
        <IED name="IED1"><AccessPoint name="P1"/></IED>
    </SCL>"#;

    #[test]
    fn test_round_trip_passes_on_distinct_names() {
        let doc = parse(SOURCE).unwrap();
        assert!(check_round_trip(&doc, TagSchema::scl()).is_empty());
    }

    #[test]
    fn test_duplicate_names_are_reported() {
        let doc = parse(r#"<SCL><Substation name="AA1"/><Substation name="AA1"/></SCL>"#).unwrap();
        let failures = check_round_trip(&doc, TagSchema::scl());
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].tag, "Substation");
        assert!(failures[0].located.is_some());
    }

    #[test]
    fn test_edits_restore_document() {
        let doc = parse(SOURCE).unwrap();
        let failures = check_edits(doc, TagSchema::scl(), 2).unwrap();
        assert!(failures.is_empty());
    }
}
