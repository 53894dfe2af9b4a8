use std::process::ExitCode;

use anyhow::Context as _;
use migrate::{Backend, Migration, MigrationReport, Settings};
use store::{DocumentStore, FileStore, FirestoreStore};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    migrate::logging::init();

    match run().await {
        Ok(report) => {
            tracing::info!(
                stripped = report.items_stripped,
                notes = report.notes_written,
                users_cleared = report.users_cleared,
                "done"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("migration failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<MigrationReport> {
    let settings = Settings::new().context("failed to load settings")?;
    settings.validate()?;

    match settings.store.backend {
        Backend::File => {
            tracing::info!(path = %settings.store.path.display(), "using file store");
            let store = FileStore::new(settings.store.path.clone());
            migrate_with(&store, &settings).await
        }
        Backend::Firestore => {
            tracing::info!(
                project = %settings.firestore.project_id,
                emulator = ?settings.firestore.emulator_host,
                "using firestore"
            );
            let store = FirestoreStore::new(&settings.firestore)
                .context("failed to create firestore client")?;
            migrate_with(&store, &settings).await
        }
    }
}

async fn migrate_with<S: DocumentStore>(
    store: &S,
    settings: &Settings,
) -> anyhow::Result<MigrationReport> {
    let layout = settings.collections.layout()?;
    let report = Migration::new(store, layout, settings.migration.clone())
        .run()
        .await?;
    Ok(report)
}
