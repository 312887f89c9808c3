use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[clap(name = "fuel-test-driver", version)]
pub struct CliArgs {
    #[clap(
        long = "config-dir",
        help = "Directory containing cluster configuration YAML documents."
    )]
    pub config_dir: Option<PathBuf>,

    #[clap(subcommand)]
    pub action: DriverSubcommand,
}

#[derive(clap::Subcommand, Debug)]
pub enum DriverSubcommand {
    /// Run every case the group spec resolves to.
    Run {
        #[clap(help = "Selection in the form 'group' or 'group(config)'.")]
        group_spec: String,
    },

    /// Resolve a group spec and print the resulting plan without executing
    /// anything.
    Explain {
        #[clap(help = "Selection in the form 'group' or 'group(config)'.")]
        group_spec: String,
    },

    /// List all registered groups, including their config-pinned variants.
    ListGroups,

    /// List all known configurations.
    ListConfigs,
}
