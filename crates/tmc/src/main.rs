use tmc_core::{
    config::Config,
    export::table_to_text,
    pipeline::{Pipeline, PipelineSettings},
};

#[tokio::main]
async fn main() -> Result<(), tmc_core::Error> {
    let cfg = Config::load()?;
    tmc_core::logging::init("tmc", &cfg.log_level)?;

    let transport = tmc_telegram::from_config(&cfg)?;
    let mut pipeline = Pipeline::new(
        transport,
        PipelineSettings {
            entities: cfg.terms.clone(),
            limit: cfg.limit,
            participant_threshold: cfg.participant_threshold,
        },
    );

    let summary = match pipeline.run(&cfg.exports).await {
        Ok(summary) => summary,
        Err(e) => {
            tracing::error!(state = ?pipeline.state(), error = %e, "crawl aborted");
            return Err(e);
        }
    };

    tracing::info!(
        channels = summary.channels,
        requests = summary.crawl.requests,
        posts = summary.crawl.events,
        "crawl complete"
    );
    print!("{}", table_to_text(&summary.rows));
    Ok(())
}
