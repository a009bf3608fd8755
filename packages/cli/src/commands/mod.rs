pub mod check;
pub mod identity;
pub mod locate;
pub mod subscriptions;

pub use check::{check, CheckArgs};
pub use identity::{identity, IdentityArgs};
pub use locate::{locate, LocateArgs};
pub use subscriptions::{subscriptions, SubscriptionsArgs};

use crate::config::Config;
use anyhow::{Context as _, Result};
use clap::ValueEnum;
use scl_common::{load_document, load_schema, RealFileSystem};
use scl_foundation::TagSchema;
use scl_parser::Document;
use serde::Serialize;
use std::borrow::Cow;
use std::path::{Path, PathBuf};

/// Output format of the listing commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Settings shared by every command
pub struct Context {
    pub config: Config,
    pub schema: Cow<'static, TagSchema>,
    pub format: OutputFormat,
    pub verbose: bool,
}

impl Context {
    /// Resolve the schema from the command line first, then the config file
    pub fn new(
        config: Config,
        schema_override: Option<PathBuf>,
        format: OutputFormat,
        verbose: bool,
    ) -> Result<Self> {
        let schema = match schema_override.or_else(|| config.schema.clone()) {
            Some(path) => Cow::Owned(
                load_schema(&RealFileSystem, &path)
                    .with_context(|| format!("Failed to load schema {}", path.display()))?,
            ),
            None => Cow::Borrowed(TagSchema::scl()),
        };

        Ok(Self {
            config,
            schema,
            format,
            verbose,
        })
    }

    pub fn schema(&self) -> &TagSchema {
        &self.schema
    }

    pub fn open(&self, path: &Path) -> Result<Document> {
        load_document(&RealFileSystem, path)
            .with_context(|| format!("Failed to load {}", path.display()))
    }
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
