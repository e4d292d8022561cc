//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint};

use crate::application::services::ExportOptions;
use crate::domain::{DomainGrouping, ExportMethod};

/// Export catalog communities and domains with their assets as JSON documents
#[derive(Parser, Debug)]
#[command(name = "catex")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug output, repeat for more (-d info, -dd debug, -ddd trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub debug: u8,

    /// Config file (default: ./catex.toml if present)
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export communities or domains to JSON
    Export {
        #[command(subcommand)]
        command: ExportCommands,
    },

    /// Browse the community hierarchy
    Communities {
        #[command(subcommand)]
        command: CommunitiesCommands,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ExportCommands {
    /// Export one community and, by default, its subcommunities
    Community {
        /// Exact community name
        name: String,
        #[command(flatten)]
        flags: ExportFlags,
    },

    /// Export one domain
    Domain {
        /// Exact domain name
        name: String,
        #[command(flatten)]
        flags: ExportFlags,
    },

    /// Export several communities, one document each
    Communities {
        /// Exact community names
        #[arg(required = true)]
        names: Vec<String>,
        #[command(flatten)]
        flags: ExportFlags,
    },

    /// Export every community in the catalog, one document each
    All {
        #[command(flatten)]
        flags: ExportFlags,
    },
}

/// Per-run overrides of the configured export defaults.
#[derive(Args, Debug, Clone, Default)]
pub struct ExportFlags {
    /// Do not descend into subcommunities
    #[arg(long)]
    pub no_subcommunities: bool,

    /// Export communities and domains without their assets
    #[arg(long)]
    pub no_assets: bool,

    /// Skip asset attributes
    #[arg(long)]
    pub no_attributes: bool,

    /// Include asset relations
    #[arg(long)]
    pub relations: bool,

    /// Include responsibilities with resolved owners
    #[arg(long)]
    pub authorizations: bool,

    /// Keep only responsibilities assigned on the asset itself
    #[arg(long)]
    pub direct_only: bool,

    /// Query surface: graph | rest
    #[arg(long)]
    pub method: Option<ExportMethod>,

    /// Fetch a community scope with one filtered query (graph only)
    #[arg(long)]
    pub bulk: bool,

    /// Fold assets by domain id or name: id | name
    #[arg(long = "group-by")]
    pub group_by: Option<DomainGrouping>,

    /// Output directory (default: export.output_dir)
    #[arg(short, long, value_hint = ValueHint::DirPath)]
    pub output_dir: Option<PathBuf>,
}

impl ExportFlags {
    /// Apply the flags on top of `options`; flags only ever switch away from defaults.
    pub fn apply(&self, mut options: ExportOptions) -> ExportOptions {
        if self.no_subcommunities {
            options.include_subcommunities = false;
        }
        if self.no_assets {
            options.include_assets = false;
        }
        if self.no_attributes {
            options.include_attributes = false;
        }
        if self.relations {
            options.include_relations = true;
        }
        if self.authorizations {
            options.include_authorizations = true;
        }
        if self.direct_only {
            options.include_inherited = false;
        }
        if let Some(method) = self.method {
            options.method = method;
        }
        if self.bulk {
            options.bulk = true;
        }
        if let Some(grouping) = self.group_by {
            options.grouping = grouping;
        }
        options
    }
}

#[derive(Subcommand, Debug)]
pub enum CommunitiesCommands {
    /// List all communities as `name<TAB>id`
    List,

    /// Show the subcommunity tree of a community
    Tree {
        /// Exact community name
        name: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show effective configuration (password redacted)
    Show,
    /// Print a commented config template
    Init,
    /// Show config file locations
    Path,
}
