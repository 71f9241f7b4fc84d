use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use mood_journal::backend::firebase::FirebaseBackend;
use mood_journal::backend::memory::MemoryBackend;
use mood_journal::cli::CliArgs;
use mood_journal::config::{Backend, Config};
use mood_journal::logging::init_logging;
use mood_journal::ui::Tui;
use mood_journal::{App, AuthClient, EntryStore};
use std::sync::Arc;
use tracing::info;

fn main() -> Result<()> {
    color_eyre::install()?;

    let args = CliArgs::parse();
    let config = Config::load(&args).wrap_err("invalid configuration")?;
    init_logging(&config.log_file, &config.log_filter)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(config))
}

async fn run(config: Config) -> Result<()> {
    let (auth, store): (Arc<dyn AuthClient>, Arc<dyn EntryStore>) = match config.backend {
        Backend::Offline => {
            info!("starting with the in-memory store");
            let backend = MemoryBackend::open();
            (Arc::new(backend.auth()), Arc::new(backend.store()))
        }
        Backend::Firebase(firebase) => {
            info!(project = %firebase.project_id, "starting with Firebase");
            let backend =
                FirebaseBackend::new(firebase).wrap_err("failed to build the HTTP client")?;
            (Arc::new(backend.auth()), Arc::new(backend.store()))
        }
    };

    let (app, rx) = App::new(auth, store);
    let mut tui = Tui::new()?;
    app.run(rx, &mut tui).await?;

    Ok(())
}
