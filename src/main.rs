use axum::routing::get;
use axum_prometheus::PrometheusMetricLayer;
use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use feedback_sense::config::{Config, ModelSources};
use feedback_sense::emotion::EmotionClassifier;
use feedback_sense::engine::ModelRegistry;
use feedback_sense::pipeline::Pipeline;
use feedback_sense::remote::InferenceClient;
use feedback_sense::sarcasm::{RemoteTier, SarcasmClassifier};
use feedback_sense::sentiment::SentimentClassifier;
use feedback_sense::server::{self, AppState};
use feedback_sense::store::{FeedbackStore, NullStore, SqliteFeedbackStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,feedback_sense=debug".into()),
        )
        .init();

    let config = Config::parse();
    tracing::info!("Starting feedback server with config: {:?}", config);

    let sources = ModelSources::from(&config);
    let models = ModelRegistry::new(sources.sentiment, sources.sarcasm);
    tracing::info!("Loading classifier models...");
    models.load().await;

    let remote = match config.inference() {
        Some(inference) => Some(RemoteTier::new(
            InferenceClient::new(inference)?,
            config.sarcasm_label.clone(),
        )),
        None => {
            tracing::info!("No remote sarcasm endpoint configured");
            None
        }
    };

    let store: Arc<dyn FeedbackStore> = match &config.database_url {
        Some(url) => Arc::new(SqliteFeedbackStore::connect(url).await?),
        None => {
            tracing::info!("No database configured, responses will not be stored");
            Arc::new(NullStore)
        }
    };

    let mut pipeline = Pipeline::new(
        SentimentClassifier::new(models.sentiment.clone(), config.keyword_sentiment),
        SarcasmClassifier::new(models.sarcasm.clone(), remote),
        EmotionClassifier::default(),
    )
    .with_store(store);
    if let Some(seed) = config.response_seed {
        pipeline = pipeline.with_seed(seed);
    }

    let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();

    let app = server::router(AppState::new(Arc::new(pipeline), models))
        .route("/metrics", get(|| async move { metric_handle.render() }))
        .layer(prometheus_layer)
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(&config.server_address()).await?;
    tracing::info!("Server running on http://{}", config.server_address());

    axum::serve(listener, app).await?;
    Ok(())
}
