//! Wiring & DI. Entry point: bootstrap adapters, inject into services, run UI.
//! No business logic here.

use dotenv::dotenv;
use examgrid::adapters::export::GridCsvExporter;
use examgrid::adapters::http::HttpExamService;
use examgrid::adapters::memory::InMemoryExamService;
use examgrid::adapters::ui::TuiInputPort;
use examgrid::domain::SchedulingContext;
use examgrid::ports::{
    AcademicDirectoryPort, ExamStorePort, InputPort, OptionRegistryPort, RoomCatalogPort,
    SessionPort,
};
use examgrid::shared::config::AppConfig;
use examgrid::usecases::{ExamSchedulingCoordinator, GridService};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Every outbound port, backed by one adapter.
struct Backend {
    rooms: Arc<dyn RoomCatalogPort>,
    sessions: Arc<dyn SessionPort>,
    options: Arc<dyn OptionRegistryPort>,
    exams: Arc<dyn ExamStorePort>,
    directory: Arc<dyn AcademicDirectoryPort>,
}

impl Backend {
    fn from_adapter<A>(adapter: Arc<A>) -> Self
    where
        A: RoomCatalogPort
            + SessionPort
            + OptionRegistryPort
            + ExamStorePort
            + AcademicDirectoryPort
            + 'static,
    {
        Self {
            rooms: adapter.clone(),
            sessions: adapter.clone(),
            options: adapter.clone(),
            exams: adapter.clone(),
            directory: adapter,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let env_loaded = dotenv();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match &env_loaded {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(_) => info!(cwd = %cwd.display(), "no .env found (check CWD)"),
    }

    let cfg = AppConfig::load().map_err(|e| anyhow::anyhow!("config: {}", e))?;

    // --- Backend: JSON fixture (offline) or the remote exam service ---
    let backend = match cfg.fixture_path.as_deref() {
        Some(path) => {
            info!(path, "serving from fixture");
            let store = InMemoryExamService::load(path)
                .await
                .map_err(|e| anyhow::anyhow!("{}", e))?;
            Backend::from_adapter(Arc::new(store))
        }
        None => {
            let client = HttpExamService::new(cfg.api_base_url_or_default(), cfg.request_timeout())
                .map_err(|e| anyhow::anyhow!("{}", e))?;
            Backend::from_adapter(Arc::new(client))
        }
    };

    let session_id = match cfg.session_id {
        Some(id) => id,
        None => inquire::CustomType::<i64>::new("Exam session id:")
            .prompt()
            .map_err(|e| anyhow::anyhow!("{}", e))?,
    };
    let ctx = SchedulingContext::new(session_id);

    let weekly_off = cfg.weekly_off_or_default();
    info!(
        session_id,
        weekly_off = ?weekly_off.days(),
        available_rooms_only = cfg.available_rooms_only_or_default(),
        "scheduling context ready"
    );

    // --- Services ---
    let grid_service = Arc::new(GridService::new(
        Arc::clone(&backend.sessions),
        Arc::clone(&backend.exams),
        weekly_off,
    ));
    let coordinator = ExamSchedulingCoordinator::new(
        Arc::clone(&backend.rooms),
        Arc::clone(&backend.options),
        Arc::clone(&backend.exams),
        Arc::clone(&grid_service),
        cfg.available_rooms_only_or_default(),
    );
    let exporter = GridCsvExporter::new(cfg.export_dir_or_default());

    let input_port: Arc<dyn InputPort> = Arc::new(TuiInputPort::new(
        ctx,
        grid_service,
        coordinator,
        Arc::clone(&backend.directory),
        exporter,
    ));

    // --- Run (main menu -> schedule / grid / cell / export) ---
    input_port
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    Ok(())
}
