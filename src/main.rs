use job_digest_lib::config::{DeliveryConfig, RunConfig};
use job_digest_lib::{delivery, logger, sources};
use job_digest_lib::{Aggregator, HttpBrowser, PageFetcher, Policy};

use std::error::Error;
use log::{error, info, warn};

fn main() -> Result<(), Box<dyn Error>> {
    logger::init();
    info!("Starting Job Digest...");

    let run = RunConfig::from_env();

    // Policy problems are fatal before anything is fetched.
    let policy = match Policy::load(&run.policy_file) {
        Ok(p) => p,
        Err(e) => {
            error!("Invalid policy: {}", e);
            return Err(e.into());
        }
    };

    let aggregation = {
        let browser = HttpBrowser::new()?;
        let mut aggregator = Aggregator::new(&policy, PageFetcher::new(browser));
        aggregator.aggregate_all(&sources::catalog())
        // session dropped here, on every exit path
    };

    let failed = aggregation.outcomes.iter().filter(|o| o.error.is_some()).count();
    if failed > 0 {
        warn!("{} of {} sources contributed nothing.", failed, aggregation.outcomes.len());
    }

    let records = aggregation.records;
    if records.is_empty() {
        warn!("No matching jobs found.");
        return Ok(());
    }

    delivery::write_csv(&records, &run.output_csv)?;

    let delivery_config = DeliveryConfig::from_env();
    if let Some(sender) = &delivery_config.sender {
        info!("Digests prepared on behalf of {}.", sender);
    }
    let written = delivery::write_digests(&delivery_config, &records, &run.outbox_dir)?;

    info!("Run completed. {} jobs, {} digests.", records.len(), written.len());
    Ok(())
}
