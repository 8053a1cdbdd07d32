use anyhow::Context;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use trawl_browserless::{BrowserlessClient, BrowserlessSource};
use trawl_conductor::runner::status_file::write_status;
use trawl_conductor::{Conductor, SessionDeps, StdoutNotifier};
use trawl_page::{AgentBrowser, AgentPolicy};
use trawl_store::{ContentStore, FileQuotaStore, SettingsFile, StorePaths};

pub fn execute(paths: &StorePaths) -> anyhow::Result<()> {
    paths.ensure_dirs()?;
    let settings_file = Arc::new(SettingsFile::new(paths));
    let settings = settings_file.load()?;
    let backend = settings.browserless.with_context(|| {
        format!(
            "no page backend configured; set browserless.url in {}",
            paths.config_json.display()
        )
    })?;

    let client = BrowserlessClient::new(&backend.url, backend.token.as_deref())?;
    let browser = AgentBrowser::new(
        Arc::new(BrowserlessSource::new(client)),
        settings_file.clone(),
        AgentPolicy::default(),
    );
    let deps = SessionDeps::new(
        settings_file,
        Arc::new(FileQuotaStore::new(paths)),
        Arc::new(ContentStore::new(paths)),
        Arc::new(browser),
        Arc::new(StdoutNotifier),
    )
    .with_event_log(&paths.events_jsonl)
    .with_stop_marker(&paths.stop_request);

    let cancel = CancellationToken::new();
    ctrlc_cancel(cancel.clone());

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let conductor = Conductor::new(deps);
        let mirror = conductor.mirror_status(&paths.status_json);

        let handle = conductor.start().await?;
        println!(
            "Session {} started: {} groups",
            handle.session_id,
            handle.targets.len()
        );

        let stopper = {
            let conductor = conductor.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                cancel.cancelled().await;
                conductor.stop().await;
            })
        };

        let summary = handle.wait().await;
        stopper.abort();
        mirror.abort();
        write_status(&paths.status_json, &conductor.status())?;

        println!(
            "Done: {}/{} groups completed, {} failed, {} posts found{}",
            summary.completed,
            summary.attempted,
            summary.failed,
            summary.posts_found,
            if summary.detected {
                " (security check hit, backing off)"
            } else if summary.stopped {
                " (stopped)"
            } else {
                ""
            }
        );
        Ok::<(), anyhow::Error>(())
    })
}

fn ctrlc_cancel(cancel: CancellationToken) {
    let _ = ctrlc::set_handler(move || {
        cancel.cancel();
    });
}
