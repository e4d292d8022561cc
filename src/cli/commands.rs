//! Command dispatch

use std::collections::HashSet;
use std::io;
use std::path::Path;

use clap::CommandFactory;
use termtree::Tree;
use tracing::{debug, instrument};

use crate::application::services::{ExportTarget, TargetOutcome};
use crate::cli::args::{
    Cli, Commands, CommunitiesCommands, ConfigCommands, ExportCommands, ExportFlags,
};
use crate::cli::output;
use crate::cli::{CliError, CliResult};
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::hierarchy::ChildIndex;
use crate::domain::{ancestor_chain, ExportDocument, Node, NodeKind};
use crate::infrastructure::di::ServiceContainer;

/// Run the parsed command.
pub async fn execute_command(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        Commands::Config { command } => config_command(cli.config.as_deref(), command),
        Commands::Export { command } => {
            let container = build_container(cli)?;
            export_command(&container, command).await
        }
        Commands::Communities { command } => {
            let container = build_container(cli)?;
            communities_command(&container, command).await
        }
    }
}

fn build_container(cli: &Cli) -> CliResult<ServiceContainer> {
    let settings = Settings::load(cli.config.as_deref())?;
    debug!(url = %settings.catalog.url, "settings loaded");
    Ok(ServiceContainer::new(settings)?)
}

// ============================================================
// export
// ============================================================

async fn export_command(container: &ServiceContainer, command: &ExportCommands) -> CliResult<()> {
    match command {
        ExportCommands::Community { name, flags } => {
            export_one(container, ExportTarget::Community(name.clone()), flags).await
        }
        ExportCommands::Domain { name, flags } => {
            export_one(container, ExportTarget::Domain(name.clone()), flags).await
        }
        ExportCommands::Communities { names, flags } => {
            let targets: Vec<ExportTarget> = names
                .iter()
                .map(|n| ExportTarget::Community(n.clone()))
                .collect();
            let options = flags.apply(container.settings.export_options()?);
            let outcomes = container.export.export_many(&targets, &options).await;
            save_outcomes(container, outcomes, flags)
        }
        ExportCommands::All { flags } => {
            let options = flags.apply(container.settings.export_options()?);
            let outcomes = container.export.export_all(&options).await?;
            save_outcomes(container, outcomes, flags)
        }
    }
}

#[instrument(level = "debug", skip(container, target, flags), fields(export = %target))]
async fn export_one(
    container: &ServiceContainer,
    target: ExportTarget,
    flags: &ExportFlags,
) -> CliResult<()> {
    let options = flags.apply(container.settings.export_options()?);
    if options.bulk && target.kind() == NodeKind::Domain {
        return Err(CliError::InvalidArgs(
            "--bulk applies to community exports only".to_string(),
        ));
    }

    let document = container.export.export(&target, &options).await?;
    let path = container
        .document_store(flags.output_dir.as_deref())
        .save(&document)?;

    report(&document, &path);
    Ok(())
}

/// Write each successful document; any failed target makes the run a partial failure.
fn save_outcomes(
    container: &ServiceContainer,
    outcomes: Vec<TargetOutcome>,
    flags: &ExportFlags,
) -> CliResult<()> {
    let store = container.document_store(flags.output_dir.as_deref());
    let total = outcomes.len();

    output::header(&format!("Exported {total} targets"));
    let mut failed = 0;
    for TargetOutcome { target, result } in outcomes {
        match result.and_then(|document| store.save(&document).map(|path| (document, path))) {
            Ok((document, path)) => report(&document, &path),
            Err(e) => {
                failed += 1;
                output::failure(&format!("{target}: {e}"));
            }
        }
    }

    if failed > 0 {
        return Err(CliError::PartialFailure { failed, total });
    }
    Ok(())
}

fn report(document: &ExportDocument, path: &Path) {
    let target = &document.target;
    let stats = &document.statistics;
    output::success(&format!(
        "{} '{}' via {}",
        target.kind,
        target.name,
        target.method.label()
    ));
    output::detail(&format!(
        "{} communities, {} domains, {} assets ({} with attributes, {} with relations)",
        stats.total_communities,
        stats.total_domains,
        stats.total_assets,
        stats.assets_with_attributes,
        stats.assets_with_relations
    ));
    output::action("Written", &path.display());
}

// ============================================================
// communities
// ============================================================

async fn communities_command(
    container: &ServiceContainer,
    command: &CommunitiesCommands,
) -> CliResult<()> {
    let page_size = container.settings.export_options()?.page_size;
    match command {
        CommunitiesCommands::List => {
            let communities = container.export.list_communities(page_size).await?;
            for community in &communities {
                output::info(&format!("{}\t{}", community.name, community.id));
            }
            Ok(())
        }
        CommunitiesCommands::Tree { name } => {
            let root = container.export.find_node(NodeKind::Community, name).await?;
            let universe = container.export.list_communities(page_size).await?;
            output::header(&breadcrumb(&root, &universe));
            let index = ChildIndex::build(&universe);
            let mut visited = HashSet::from([root.id.clone()]);
            output::info(&subtree(&root, &index, &mut visited));
            Ok(())
        }
    }
}

/// `Top / ... / Name` path from the topmost ancestor down to `node`.
fn breadcrumb(node: &Node, universe: &[Node]) -> String {
    ancestor_chain(&node.id, universe)
        .iter()
        .rev()
        .map(|id| {
            universe
                .iter()
                .find(|n| &n.id == id)
                .map_or(id.as_str(), |n| n.name.as_str())
        })
        .collect::<Vec<_>>()
        .join(" / ")
}

fn subtree(node: &Node, index: &ChildIndex<'_>, visited: &mut HashSet<String>) -> Tree<String> {
    let mut tree = Tree::new(node.name.clone());
    for child in index.children_of(&node.id) {
        if visited.insert(child.id.clone()) {
            tree.push(subtree(child, index, visited));
        }
    }
    tree
}

// ============================================================
// config
// ============================================================

fn config_command(local: Option<&Path>, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = Settings::load(local)?;
            output::info(&settings.to_toml()?);
        }
        ConfigCommands::Init => output::info(&Settings::template()),
        ConfigCommands::Path => {
            match global_config_path() {
                Some(path) => output::action("Global", &path.display()),
                None => output::warning("no home directory, global config unavailable"),
            }
            let local = local.map(Path::to_path_buf).unwrap_or_else(local_config_path);
            output::action("Local", &local.display());
        }
    }
    Ok(())
}
