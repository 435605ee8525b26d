//! Schema association for a spec.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use super::CliConfig;
use crate::core::DalecError;
use crate::schema::SchemaContributor;
use crate::session::workspace_root_for;
use crate::tracker::{DocumentTracker, TextDocument};
use crate::utils::platform::absolute_path;

/// Command to print the schema that applies to a spec.
#[derive(Args)]
pub struct SchemaCommand {
    /// Path to the Dalec spec
    file: PathBuf,

    /// Print the schema URI instead of its content
    #[arg(long)]
    uri: bool,

    /// Workspace root (default: nearest git root)
    #[arg(long)]
    workspace: Option<PathBuf>,
}

impl SchemaCommand {
    /// Print the schema URI or content.
    ///
    /// # Errors
    ///
    /// Unrecognized specs and schemas that cannot be read.
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        let config = cli.load().await?;
        let output = cli.output(&config);
        let document = TextDocument::load(&self.file).await?;
        let mut tracker = DocumentTracker::default();
        tracker.open(&document);

        let workspace = match &self.workspace {
            Some(workspace) => absolute_path(workspace)?,
            None => workspace_root_for(&document.path),
        };
        let contributor = SchemaContributor::new(&config);
        let Some(uri) = contributor.schema_for_document(&tracker, &document.key, Some(&workspace)) else {
            return Err(DalecError::NotASpecDocument {
                path: document.path.display().to_string(),
            }
            .into());
        };

        if self.uri {
            println!("{uri}");
            return Ok(());
        }

        match contributor.schema_content(&uri, &output).await {
            Some(content) => {
                println!("{content}");
                Ok(())
            }
            None => Err(DalecError::ConfigError {
                message: "No Dalec spec schema is available".to_string(),
            }
            .into()),
        }
    }
}
