use clap::{Parser, Subcommand};

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[clap(about = "Pull-sync the remote FTP tree into the local tree", display_order = 1)]
    Sync {
        #[clap(long, help = "Override the configured remote root path")]
        remote_root: Option<String>,
        #[clap(long, help = "Override the configured local root path")]
        local_root: Option<String>,
        #[clap(short, long, help = "Descend into remote subdirectories")]
        recursive: bool,
        #[clap(
            long,
            value_name = "HOURS",
            help = "Only pull files modified within the last HOURS hours"
        )]
        recent_hours: Option<u64>,
        #[clap(
            long = "ext",
            value_name = "EXT",
            help = "Allowed filename suffix, repeatable (e.g. --ext .jpg --ext .png); empty list allows everything"
        )]
        extensions: Vec<String>,
        #[clap(long, help = "Skip files whose local copy already matches the remote size")]
        skip_unchanged: bool,
        #[clap(long, help = "Emit a single-line JSON summary after the run")]
        json: bool,
        #[clap(short, long, help = "Suppress the human-readable summary")]
        quiet: bool,
        #[clap(short, long, help = "Print verbose diagnostic logs for debugging")]
        verbose: bool,
    },
    #[clap(about = "Configure the FTP target", display_order = 2)]
    Set {
        #[clap(short = 'H', long, help = "FTP host", display_order = 1)]
        host: Option<String>,
        #[clap(short = 'P', long, help = "FTP port", display_order = 2)]
        port: Option<u16>,
        #[clap(short, long, help = "FTP username", display_order = 3)]
        username: Option<String>,
        #[clap(short = 'w', long, help = "FTP password", display_order = 4)]
        password: Option<String>,
        #[clap(long, help = "Request passive transfer mode", display_order = 5)]
        passive: Option<bool>,
        #[clap(long, help = "Default remote root path", display_order = 6)]
        remote_root: Option<String>,
        #[clap(long, help = "Default local root path", display_order = 7)]
        local_root: Option<String>,
    },
    #[clap(about = "Show the stored configuration", name = "show", display_order = 3)]
    Show {},
}
