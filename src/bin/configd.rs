use configd::cli::{self, Command, ConfigdCommand};
use configd::{config, ConfigdError};

fn main() {
    // Install global collector configured based on CONFIGD_LOG env var.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env(config::env::LOG_DIRECTIVE)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(true)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .with_thread_ids(true)
        .init();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(num_cpus::get())
        .on_thread_start(|| tracing::trace!("thread start"))
        .on_thread_stop(|| tracing::trace!("thread stop"))
        .enable_io()
        .enable_time()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("failed to build runtime: {}", err);
            std::process::exit(1);
        }
    };

    runtime.block_on(async {
        run().await;
    })
}

async fn run() {
    if let Err(err) = run_inner().await {
        let code = if err.is_access_denied() {
            eprintln!("access denied: {}", err);
            2
        } else {
            eprintln!("{}", err);
            1
        };
        std::process::exit(code);
    };
}

async fn run_inner() -> Result<(), ConfigdError> {
    let ConfigdCommand { client, command } = cli::parse();

    match command {
        Command::CreateRepository(create) => create.run(client).await,
        Command::Save(save) => save.run(client).await,
        Command::Fetch(fetch) => fetch.run(client).await,
        Command::Entries(entries) => entries.run(client).await,
        Command::Delete(delete) => delete.run(client).await,
        Command::CreateEntry(write) => write.create(client).await,
        Command::UpdateEntry(write) => write.update(client).await,
        Command::History(history) => history.run(client).await,
        Command::Server(server) => server.run().await,
    }
}
