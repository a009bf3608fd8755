use super::{print_json, Context, OutputFormat};
use anyhow::{bail, Result};
use clap::Args;
use colored::Colorize;
use scl_editor::{EditSession, History};
use scl_foundation::{control_block_tags, control_blocks_by_ied, identity, is_public, Identity, TagSchema};
use scl_parser::{Document, NodeId};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct SubscriptionsArgs {
    /// SCL file to read
    pub file: PathBuf,

    /// Only show subscribers of the control block with this identity
    #[arg(short, long)]
    pub publisher: Option<String>,

    /// Include ExtRefs that resolve to no control block
    #[arg(short, long)]
    pub unresolved: bool,

    /// List publishing IEDs and their control blocks instead of subscriptions
    #[arg(short, long)]
    pub list_publishers: bool,

    /// Control block tag listed by --list-publishers
    #[arg(long, value_name = "TAG", default_value = "GSEControl")]
    pub control_block: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub ext_ref: Identity,
    pub control_blocks: Vec<Published>,
    pub fcdas: Vec<Identity>,
}

/// A control block together with its tag
#[derive(Debug, Serialize)]
pub struct Published {
    pub tag: String,
    pub identity: Identity,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PublisherReport {
    control_block: Identity,
    data_set: Option<Identity>,
    subscriptions: Vec<Subscription>,
}

/// One publishing IED in a `--list-publishers` listing
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PublisherListing {
    pub ied: String,
    pub control_blocks: Vec<String>,
}

/// Publishing IEDs sorted by name with the identities of their `tag` control blocks
pub fn list_publishers(doc: &Document, schema: &TagSchema, tag: &str) -> Result<Vec<PublisherListing>> {
    if !control_block_tags(None).contains(&tag) {
        bail!(
            "'{}' is not a control block tag, expected one of {}",
            tag,
            control_block_tags(None).join(", ")
        );
    }

    Ok(control_blocks_by_ied(doc, schema, tag)
        .into_iter()
        .map(|publisher| PublisherListing {
            ied: publisher.name,
            control_blocks: publisher.control_blocks.into_keys().collect(),
        })
        .collect())
}

pub fn subscriptions(args: SubscriptionsArgs, ctx: &Context) -> Result<()> {
    let doc = ctx.open(&args.file)?;
    let schema = ctx.schema();

    if args.list_publishers {
        let listing = list_publishers(&doc, schema, &args.control_block)?;
        match ctx.format {
            OutputFormat::Json => print_json(&listing)?,
            OutputFormat::Text => print_publishers(&listing, &args.control_block),
        }
        return Ok(());
    }
    let mut session = EditSession::with_schema(doc, schema, History::with_max_levels(ctx.config.history_limit));

    if let Some(publisher) = &args.publisher {
        let publisher = Identity::from(publisher.as_str());
        let mut found = false;
        for tag in control_block_tags(None) {
            if session.select_by_identity(tag, &publisher)? {
                found = true;
                break;
            }
        }
        if !found {
            bail!("No control block with identity '{}' in {}", publisher, args.file.display());
        }
    }

    let selection = session.selection();
    let ext_refs: Vec<NodeId> = {
        let doc = session.document();
        doc.elements_by_tag("ExtRef")
            .filter(|id| is_public(doc, schema, *id))
            .collect()
    };

    let index = session.control_block_index().clone();
    let doc = session.document();
    let mut subscriptions = Vec::new();
    for ext_ref in ext_refs {
        let control_blocks = index.find_control_blocks(doc, schema, ext_ref);
        let fcdas = index.find_fcdas(doc, schema, ext_ref);

        if let Some(selected) = selection.control_block {
            if !control_blocks.contains(&selected) {
                continue;
            }
        } else if control_blocks.is_empty() && !args.unresolved {
            continue;
        }

        subscriptions.push(Subscription {
            ext_ref: identity(doc, schema, ext_ref),
            control_blocks: control_blocks
                .iter()
                .map(|id| Published {
                    tag: doc.tag(*id).to_string(),
                    identity: identity(doc, schema, *id),
                })
                .collect(),
            fcdas: fcdas.iter().map(|id| identity(doc, schema, *id)).collect(),
        });
    }

    match (ctx.format, selection.control_block) {
        (OutputFormat::Json, Some(control_block)) => print_json(&PublisherReport {
            control_block: identity(doc, schema, control_block),
            data_set: selection.data_set.map(|id| identity(doc, schema, id)),
            subscriptions,
        })?,
        (OutputFormat::Json, None) => print_json(&subscriptions)?,
        (OutputFormat::Text, _) => {
            if let Some(data_set) = selection.data_set {
                println!("{} {}", "DataSet:".bold(), identity(doc, schema, data_set));
                println!();
            }
            print_subscriptions(&subscriptions, ctx.verbose);
        }
    }

    Ok(())
}

fn print_publishers(listing: &[PublisherListing], tag: &str) {
    for publisher in listing {
        println!("{} {}", "IED".cyan(), publisher.ied.bold());
        for control_block in &publisher.control_blocks {
            println!("  {} {} {}", "→".green(), tag, control_block);
        }
    }

    println!();
    println!("   Publishers: {}", listing.len());
}

fn print_subscriptions(subscriptions: &[Subscription], verbose: bool) {
    for subscription in subscriptions {
        println!("{} {}", "ExtRef".cyan(), subscription.ext_ref);
        if subscription.control_blocks.is_empty() {
            println!("  {}", "unresolved".yellow());
        }
        for published in &subscription.control_blocks {
            println!("  {} {} {}", "→".green(), published.tag, published.identity);
        }
        if verbose {
            for fcda in &subscription.fcdas {
                println!("    {} {}", "FCDA".dimmed(), fcda);
            }
        }
    }

    println!();
    println!("   Subscriptions: {}", subscriptions.len());
}
