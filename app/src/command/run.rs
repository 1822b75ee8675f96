use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use warelay_config::Config;
use warelay_core::TransportSender;
use warelay_gateway::console::ConsoleTransport;
use warelay_gateway::{DeliveryTracker, PipelineConfig, ReplyPipeline, ScheduleGate, run_events};

use crate::command::{
    CommandStrategy, build_completion_client, build_key_pool, build_session_store,
};

/// Strategy for running the relay gateway.
pub struct RunStrategy;

impl CommandStrategy for RunStrategy {
    type Input = ();

    async fn execute(&self, (): Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;
        info!("Loaded config from ~/warelay/config.json");

        // The transport persists its pairing credentials here, isolated
        // per deployment so two instances never share a login.
        let auth_dir = Config::ensure_auth_dir(&config.gateway.deployment_id)?;
        info!("Transport auth state at {}", auth_dir.display());

        let store = Arc::new(build_session_store(&config));
        let sweeper = store.spawn_sweeper(Duration::from_secs(60));

        let pool = Arc::new(build_key_pool(&config)?);
        let tracker = Arc::new(DeliveryTracker::new());
        let gate = ScheduleGate::from_config(&config.schedule)?;
        let completion = build_completion_client(&config);

        // Console transport for local runs; the production bridge feeds
        // the same event stream and sender trait.
        let sender = config
            .gateway
            .allowed_senders
            .first()
            .cloned()
            .unwrap_or_else(|| "local".to_string());
        let (transport, events) = ConsoleTransport::start(format!("{sender}@s.whatsapp.net"));

        let pipeline = Arc::new(ReplyPipeline::new(
            PipelineConfig::from_config(&config),
            gate,
            Arc::clone(&store),
            pool,
            Arc::clone(&tracker),
            completion,
            transport as Arc<dyn TransportSender>,
        ));

        info!("Relay gateway is running. Press Ctrl+C to stop.");
        run_events(pipeline, tracker, events).await;

        sweeper.abort();
        Ok(())
    }
}
