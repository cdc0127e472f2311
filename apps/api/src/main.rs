use std::net::SocketAddr;
use std::sync::Arc;

use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use reservation_cell::{
    AvailabilityChannels, AvailabilityService, BlockWorkflowService, BookingLedger, ExpirySweeper,
    ReservationStore, SchedulingState,
};
use schedule_cell::{BlockService, TemplateService};
use shared_config::AppConfig;

#[tokio::main]
async fn main() {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting clinic scheduling API server");

    // Load configuration
    let config = AppConfig::from_env();

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Wire the scheduling engine
    let templates = Arc::new(TemplateService::new());
    let blocks = Arc::new(BlockService::new());
    let channels = Arc::new(AvailabilityChannels::new(config.event_buffer_capacity));
    let ledger = Arc::new(BookingLedger::new());
    let store = Arc::new(ReservationStore::new(
        &config,
        ledger.clone(),
        channels.clone(),
    ));
    let availability = Arc::new(AvailabilityService::new(
        templates.clone(),
        blocks.clone(),
        store.clone(),
        ledger.clone(),
        channels.clone(),
    ));
    let blocks_flow = Arc::new(BlockWorkflowService::new(
        blocks.clone(),
        store.clone(),
        channels.clone(),
    ));
    let scheduling_state = SchedulingState {
        store: store.clone(),
        ledger,
        availability,
        blocks: blocks_flow,
    };

    // Start the hold expiry sweeper
    let sweeper = Arc::new(ExpirySweeper::new(store, config.sweep_interval_seconds));
    let sweeper_task = sweeper.clone();
    tokio::spawn(async move {
        sweeper_task.run().await;
    });

    // Build the application router
    let app = router::create_router(templates, scheduling_state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors);

    // Run the server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.bind_port));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
