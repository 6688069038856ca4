use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use transit_realtime::config::UpdaterConfig;
use transit_realtime::loader::load_network;
use transit_realtime::realtime::{
    JourneyUpdate, RouteDepartureMatcher, UpdateResult, parse_feed_message,
};
use transit_realtime::snapshot::SnapshotSource;

/// Lower bound on the background commit period.
const MIN_COMMIT_PERIOD: Duration = Duration::from_millis(10);

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Paths from environment
    let Ok(network_path) = std::env::var("TIMETABLE_DATA") else {
        error!("TIMETABLE_DATA not set");
        return ExitCode::FAILURE;
    };
    let Ok(feed_path) = std::env::var("REALTIME_FEED") else {
        error!("REALTIME_FEED not set");
        return ExitCode::FAILURE;
    };
    let config = match std::env::var("UPDATER_CONFIG") {
        Ok(path) => match UpdaterConfig::from_json_file(&path) {
            Ok(config) => config,
            Err(e) => {
                error!(path = %path, error = %e, "failed to read updater config");
                return ExitCode::FAILURE;
            }
        },
        Err(_) => UpdaterConfig::default(),
    };

    let network = match load_network(&network_path, config.index_threshold) {
        Ok(network) => Arc::new(network),
        Err(e) => {
            error!(path = %network_path, error = %e, "failed to load network");
            return ExitCode::FAILURE;
        }
    };
    info!(
        feed = network.feed_id(),
        trips = network.trip_count(),
        patterns = network.pattern_count(),
        "loaded network"
    );

    let source = Arc::new(
        SnapshotSource::new(network, config.clone()).with_matcher(Box::new(RouteDepartureMatcher)),
    );

    // Publish batched updates in the background
    let committer = Arc::clone(&source);
    let period = config.max_snapshot_frequency().max(MIN_COMMIT_PERIOD);
    let commit_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await; // First tick is immediate, skip it
        loop {
            interval.tick().await;
            committer.commit(false);
        }
    });

    let file = match tokio::fs::File::open(&feed_path).await {
        Ok(file) => file,
        Err(e) => {
            error!(path = %feed_path, error = %e, "failed to open realtime feed");
            return ExitCode::FAILURE;
        }
    };

    let mut lines = BufReader::new(file).lines();
    let mut total = UpdateResult::new();
    let mut messages = 0usize;
    let mut skipped = 0usize;
    let mut line_number = 0usize;
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                error!(path = %feed_path, error = %e, "failed to read realtime feed");
                return ExitCode::FAILURE;
            }
        };
        line_number += 1;
        if line.trim().is_empty() {
            continue;
        }

        let message = match parse_feed_message(&line) {
            Ok(message) => message,
            Err(e) => {
                warn!(line = line_number, error = %e, "skipping malformed feed message");
                skipped += 1;
                continue;
            }
        };
        let updates: Vec<JourneyUpdate> = message
            .updates
            .iter()
            .filter_map(|dto| match JourneyUpdate::try_from(dto) {
                Ok(update) => Some(update),
                Err(e) => {
                    warn!(line = line_number, trip = ?dto.trip_id, error = %e, "skipping malformed update");
                    skipped += 1;
                    None
                }
            })
            .collect();

        let result = source.apply_updates(&message.feed_id, message.full_dataset, &updates);
        total.merge(&result);
        messages += 1;
        tokio::task::yield_now().await;
    }

    commit_task.abort();
    let snapshot = source.commit(true);
    info!(
        messages,
        skipped,
        generation = snapshot.generation(),
        timetables = snapshot.realtime_timetable_count(),
        "replay finished: {total}"
    );
    ExitCode::SUCCESS
}
