use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Semaphore};
use tracing::info;

use vesper_analyzer::{AnalyzerLlmClient, IncrementalAnalyzer, PromptLibrary, ReflectionConfig, ReflectionWorker};
use vesper_core::config::VesperConfig;
use vesper_ingest::batch_manager::{BatchManager, BatchManagerConfig};
use vesper_ingest::ingest::IngestWorker;
use vesper_ingest::queue::SqsUploadQueue;
use vesper_ingest::reconciliation::Reconciler;
use vesper_ingest::vad::VadParams;
use vesper_ingest::worker::{run_poll_loop, run_reconciliation_loop, PollLoopConfig};
use vesper_mentalstate::MentalStateCalculator;
use vesper_storage::object_store::S3ObjectStore;
use vesper_storage::repo::{
    AudioFileRepo, BatchRepo, DailyReflectionRepo, EventRepo, MentalStateScoreRepo, TranscriptionResultRepo, UserRepo,
};
use vesper_storage::{pool, KvStore, ObjectStore};
use vesper_transcribe::vendor::{DiarizationClient, TranscriptionClient};
use vesper_transcribe::worker::{BatchWorker, BatchWorkerConfig};

mod app;
mod error;
mod http;
mod principal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "vesper_gateway=info,tower_http=info".into()),
        )
        .init();

    let config_path = std::env::var("VESPER_CONFIG").ok();
    let config = VesperConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        tracing::warn!("config load failed ({e}), using defaults");
        VesperConfig::default()
    });

    let pg_pool = pool::connect_postgres(&config.postgres.url, config.postgres.max_connections).await?;
    let redis_pool = pool::connect_redis(&config.redis.url)?;

    let aws_shared = {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest()).region(
            aws_config::Region::new(config.object_store.region.clone()),
        );
        if let Some(endpoint) = &config.object_store.endpoint {
            loader = loader.endpoint_url(endpoint.clone());
        }
        loader.load().await
    };
    let s3_client = aws_sdk_s3::Client::new(&aws_shared);
    let sqs_client = aws_sdk_sqs::Client::new(&aws_shared);

    let object_store: Arc<dyn ObjectStore> = Arc::new(S3ObjectStore::new(s3_client, config.object_store.bucket.clone()));
    let queue = Arc::new(SqsUploadQueue::new(sqs_client, config.queue.upload_notifications_url.clone()));

    let users = UserRepo::new(pg_pool.clone());
    let audio_files = AudioFileRepo::new(pg_pool.clone());
    let batches = BatchRepo::new(pg_pool.clone());
    let transcripts = TranscriptionResultRepo::new(pg_pool.clone());
    let events = EventRepo::new(pg_pool.clone());
    let mental_state_scores = MentalStateScoreRepo::new(pg_pool.clone());
    let daily_reflections = DailyReflectionRepo::new(pg_pool.clone());
    let kv = KvStore::new(redis_pool);

    let batch_manager = Arc::new(BatchManager::new(
        batches.clone(),
        BatchManagerConfig {
            max_gap_seconds: config.batch.max_gap_seconds,
            timeout_seconds: config.batch.timeout_seconds,
        },
    ));

    let vad_params = VadParams {
        sample_rate_hz: config.vad.sample_rate_hz,
        min_speech_ms: config.vad.min_speech_ms,
        min_silence_ms: config.vad.min_silence_ms,
        threshold: config.vad.threshold,
        pad_ms: config.vad.pad_ms,
    };

    let ingest_worker = Arc::new(IngestWorker {
        audio_files: audio_files.clone(),
        batches: batch_manager.clone(),
        object_store: object_store.clone(),
        vad_params,
        vad_semaphore: Arc::new(Semaphore::new(config.vad.max_concurrent)),
    });

    let reconciler = Arc::new(Reconciler {
        ingest: ingest_worker.clone(),
        object_store: object_store.clone(),
        bucket: config.object_store.bucket.clone(),
        max_keys: config.batch.reconciliation_max_keys,
    });

    let transcription_client = Arc::new(TranscriptionClient::new(
        config.vendors.transcription_base_url.clone(),
        config.vendors.transcription_api_key.clone(),
    ));
    let diarization_client = Arc::new(DiarizationClient::new(
        config.vendors.diarization_base_url.clone(),
        config.vendors.diarization_api_key.clone(),
        Duration::from_secs(config.vendors.diarization_poll_interval_seconds),
        Duration::from_secs(config.vendors.diarization_max_wait_seconds),
    ));
    let batch_worker = BatchWorker::new(
        audio_files.clone(),
        batches.clone(),
        transcripts.clone(),
        object_store.clone(),
        transcription_client,
        diarization_client,
        BatchWorkerConfig {
            monitor_interval_seconds: config.batch.monitor_interval_seconds,
            timeout_seconds: config.batch.timeout_seconds,
            max_concurrent: config.transcribe.max_concurrent,
            signed_url_ttl_seconds: config.transcribe.signed_url_ttl_seconds,
        },
    );

    let llm_client = Arc::new(AnalyzerLlmClient::new(
        config.vendors.llm_base_url.clone(),
        config.vendors.llm_api_key.clone(),
        config.vendors.llm_model.clone(),
    ));
    let prompts_dir = std::env::var("VESPER_PROMPTS_DIR").unwrap_or_else(|_| "prompts".to_string());
    let prompts = Arc::new(PromptLibrary::load(&prompts_dir)?);
    let analyzer = Arc::new(IncrementalAnalyzer::new(
        events.clone(),
        transcripts.clone(),
        llm_client.clone(),
        prompts.clone(),
        vesper_analyzer::analyzer::AnalyzerConfig {
            event_gap_seconds: config.analyzer.event_gap_seconds,
            max_transcripts_per_cycle: config.analyzer.max_transcripts_per_cycle,
        },
    ));

    let reflection_worker = Arc::new(ReflectionWorker::new(
        events.clone(),
        daily_reflections,
        llm_client,
        prompts,
        ReflectionConfig {
            interval_seconds: config.analyzer.interval_seconds,
            reflection_delay_seconds: config.analyzer.reflection_delay_seconds,
        },
    ));

    let mental_state = MentalStateCalculator::new(events.clone(), mental_state_scores.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let poll_handle = tokio::spawn(run_poll_loop(
        queue,
        ingest_worker,
        PollLoopConfig {
            max_messages: config.queue.max_messages,
            wait_seconds: config.queue.poll_wait_seconds,
            visibility_timeout_seconds: config.queue.visibility_timeout_seconds,
        },
        shutdown_rx.clone(),
    ));
    let reconciliation_handle = tokio::spawn(run_reconciliation_loop(
        reconciler,
        config.batch.reconciliation_interval_seconds,
        shutdown_rx.clone(),
    ));
    let batch_monitor_handle = tokio::spawn(batch_worker.run_monitor_loop(shutdown_rx.clone()));
    let analyzer_handle = tokio::spawn(vesper_analyzer::worker::run_analyzer_loop(
        analyzer.clone(),
        config.analyzer.interval_seconds,
        shutdown_rx.clone(),
    ));
    let reflection_handle = tokio::spawn(vesper_analyzer::reflection::run_reflection_loop(
        reflection_worker,
        config.analyzer.interval_seconds,
        shutdown_rx.clone(),
    ));

    let bind = config.gateway.bind.clone();
    let port = config.gateway.port;
    let state = Arc::new(app::AppState {
        config: config.clone(),
        users,
        events,
        transcripts,
        kv,
        pg_pool: pg_pool.clone(),
        redis_pool: redis_pool.clone(),
        analyzer,
        mental_state,
        shutdown: shutdown_tx.clone(),
    });
    let router = app::build_router(state);

    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    info!("vesper gateway listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
            tokio::select! {
                _ = tokio::signal::ctrl_c() => info!("SIGINT received, shutting down"),
                _ = sigterm.recv() => info!("SIGTERM received, shutting down"),
            }
            let _ = shutdown_tx.send(true);
            info!("shutdown signal received, draining background workers");
        })
        .await?;

    const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);
    let drain = async {
        let _ = tokio::join!(
            poll_handle,
            reconciliation_handle,
            batch_monitor_handle,
            analyzer_handle,
            reflection_handle,
        );
    };
    if tokio::time::timeout(SHUTDOWN_GRACE, drain).await.is_err() {
        tracing::warn!("background workers did not drain within grace period, exiting anyway");
    }

    Ok(())
}
