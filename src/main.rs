use clap::Parser;

use ftpmirror::{cli, commands, config, sync, util};

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    let config = config::Config::init();

    match cli.command {
        cli::Commands::Sync {
            remote_root,
            local_root,
            recursive,
            recent_hours,
            extensions,
            skip_unchanged,
            json,
            quiet,
            verbose,
        } => {
            // keep the guard alive so buffered file logs are flushed on exit
            let _guard = util::init_logging(verbose);
            sync::handle_sync(
                &config,
                sync::HandleSyncArgs {
                    remote_root,
                    local_root,
                    recursive,
                    recent_hours,
                    extensions,
                    skip_unchanged,
                    json,
                    quiet,
                    verbose,
                },
            )
        }
        cli::Commands::Set {
            host,
            port,
            username,
            password,
            passive,
            remote_root,
            local_root,
        } => commands::handle_set(
            &config,
            host,
            port,
            username,
            password,
            passive,
            remote_root,
            local_root,
        ),
        cli::Commands::Show {} => commands::handle_show(&config),
    }
}
