//! `firehose run`: follow the live stream, printing each delivered text.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use firehose_core::KeywordSet;
use firehose_http::HttpStreamTransport;
use firehose_stream::ConnectionSupervisor;

use crate::config::FirehoseConfig;

pub async fn run(config: FirehoseConfig) -> Result<()> {
    config.validate()?;
    let keywords = load_keywords(&config.track, config.keyword_file.as_deref())?;
    if keywords.is_empty() {
        bail!("nothing to track: pass --track or --keyword-file");
    }

    let transport = HttpStreamTransport::new(config.stream_config()?)
        .context("building the HTTP stream transport")?;
    info!(endpoint = %transport.config().endpoint, "starting firehose");

    let stdout_closed = Arc::new(Notify::new());
    let on_closed = Arc::clone(&stdout_closed);
    let supervisor = ConnectionSupervisor::new(
        Arc::new(transport),
        config.supervisor_config(),
        move |text| {
            if let Err(e) = print_event(&mut std::io::stdout().lock(), &text) {
                debug!(error = %e, "writing to stdout failed");
                on_closed.notify_one();
            }
        },
        |added| {
            if !added.is_empty() {
                info!(added = ?added, "now tracking");
            }
        },
    )?;

    supervisor
        .update_tracked_keywords(keywords.as_slice().to_vec())
        .await;

    let refresh = config.keyword_file.clone().map(|path| {
        tokio::spawn(refresh_keywords(
            supervisor.clone(),
            config.track.clone(),
            path,
            config.refresh_interval(),
            keywords,
        ))
    });

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("waiting for Ctrl-C")?;
            info!("shutting down");
        }
        _ = stdout_closed.notified() => info!("stdout closed, shutting down"),
    }

    if let Some(task) = refresh {
        task.abort();
    }
    supervisor.shutdown();

    let stats = supervisor.stats();
    info!(
        handoffs = stats.handoffs_succeeded,
        failed = stats.handoffs_failed,
        locks_expired = stats.locks_expired,
        "firehose stopped"
    );
    Ok(())
}

fn print_event(out: &mut impl Write, text: &str) -> std::io::Result<()> {
    writeln!(out, "{text}")?;
    out.flush()
}

/// `track` followed by the keyword file's terms, de-duplicated.
fn load_keywords(track: &[String], keyword_file: Option<&Path>) -> Result<KeywordSet> {
    let from_file = match keyword_file {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading keyword file {}", path.display()))?;
            KeywordSet::parse_lines(&text)
        }
        None => KeywordSet::default(),
    };
    Ok(KeywordSet::new(track.iter().chain(from_file.iter()).cloned()))
}

/// Re-read the keyword file every `every`; hand off only when its
/// membership changed.
async fn refresh_keywords(
    supervisor: ConnectionSupervisor,
    track: Vec<String>,
    path: PathBuf,
    every: Duration,
    mut tracked: KeywordSet,
) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let next = match load_keywords(&track, Some(&path)) {
            Ok(next) => next,
            Err(e) => {
                warn!(error = %e, "keeping current keywords");
                continue;
            }
        };
        if next.is_empty() || next.same_members(&tracked) {
            continue;
        }
        info!(keywords = %next, "keyword file changed");
        supervisor
            .update_tracked_keywords(next.as_slice().to_vec())
            .await;
        tracked = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_come_first_and_duplicates_collapse() {
        let path = std::env::temp_dir().join(format!("firehose-keywords-{}.txt", std::process::id()));
        std::fs::write(&path, "# watched terms\ntokio\nrust\n\nserde\n").unwrap();

        let keywords = load_keywords(&["rust".to_string()], Some(&path)).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(keywords.as_slice(), ["rust", "tokio", "serde"]);
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn print_event_surfaces_write_errors() {
        let mut out = Vec::new();
        print_event(&mut out, "hello").unwrap();
        assert_eq!(out, b"hello\n");

        let err = print_event(&mut ClosedPipe, "hello").unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::BrokenPipe);
    }

    #[tokio::test]
    async fn zero_refresh_interval_fails_before_connecting() {
        let config = FirehoseConfig {
            endpoint: Some("http://127.0.0.1:9/filter.json".into()),
            track: vec!["rust".into()],
            refresh_interval_ms: 0,
            ..Default::default()
        };
        let err = run(config).await.unwrap_err();
        assert!(err.to_string().contains("refresh_interval_ms"));
    }

    #[test]
    fn unreadable_keyword_file_is_an_error() {
        let err = load_keywords(&[], Some(Path::new("/nonexistent/keywords.txt"))).unwrap_err();
        assert!(err.to_string().contains("reading keyword file"));
    }
}
