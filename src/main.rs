use clap::Parser;
use secretsync::cli::{commands, Cli, Commands};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    secretsync::logging::init(cli.verbose);

    let result = match cli.command {
        Commands::List => commands::list::execute(&cli).await,
        Commands::Show { ref repo } => commands::show::execute(&cli, repo).await,
        Commands::Add {
            ref url,
            ref changes,
        } => commands::add::execute(&cli, url, changes).await,
        Commands::Edit {
            ref repo,
            ref url,
            ref unset,
            ref changes,
        } => commands::edit::execute(&cli, repo, url.as_deref(), unset, changes).await,
        Commands::Delete { ref repo, force } => {
            commands::delete::execute(&cli, repo, force).await
        }
        Commands::Verify { ref repo, ref key } => {
            commands::verify::execute(&cli, repo, key).await
        }
        Commands::Completions { ref shell } => commands::completions::execute(shell),
        Commands::Audit { last, ref since } => {
            commands::audit_cmd::execute(&cli, last, since.as_deref())
        }
    };

    if let Err(e) = result {
        secretsync::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}
