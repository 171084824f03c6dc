//! Command implementations

use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::app::{AppContainer, ClipObserver, ClipSummary};
use crate::cli::args::ClipArgs;
use crate::domain::model::{ClipRequest, ExtractionOutcome, ProgressEvent, TimeSpec};
use crate::ports::CancelHandle;
use crate::utils::Utils;

/// Progress bar resolution (per-mille)
const BAR_LENGTH: u64 = 1000;

const PROGRESS_CHANNEL_CAPACITY: usize = 64;

/// Execute the clip command
pub async fn clip(container: &dyn AppContainer, args: &ClipArgs, output_dir: PathBuf) -> ExtractionOutcome {
    let request = ClipRequest::new(
        args.url.clone(),
        args.start.map(|s| s.as_seconds()),
        args.duration.as_seconds(),
        output_dir,
    );

    let (cancel, token) = CancelHandle::pair();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling extraction");
            cancel.cancel();
        }
    });

    let (summary_tx, summary_rx) = oneshot::channel();
    let (progress_tx, progress_rx) = mpsc::channel(PROGRESS_CHANNEL_CAPACITY);
    let ui = tokio::spawn(render_progress(
        summary_rx,
        progress_rx,
        !args.json,
        args.show_progress(),
    ));

    let outcome = container
        .clip_interactor()
        .execute(&request, ClipObserver::new(summary_tx, progress_tx), token)
        .await;

    if let Err(e) = ui.await {
        debug!("Progress display ended abnormally: {}", e);
    }
    ctrl_c.abort();

    report(&outcome, args.json);
    outcome
}

/// Print the summary once known, then drive the progress bar until the channel closes
async fn render_progress(
    summary: oneshot::Receiver<ClipSummary>,
    mut progress: mpsc::Receiver<ProgressEvent>,
    print_summary: bool,
    show_bar: bool,
) {
    let Ok(summary) = summary.await else {
        // Rejected before extraction
        return;
    };
    if print_summary {
        print_download_info(&summary);
    }

    let bar = show_bar.then(|| {
        let bar = ProgressBar::new(BAR_LENGTH);
        if let Ok(style) = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {percent:>3}% {msg}",
        ) {
            bar.set_style(style.progress_chars("##-"));
        }
        bar
    });

    while let Some(event) = progress.recv().await {
        if let Some(bar) = &bar {
            bar.set_position((event.fraction_complete * BAR_LENGTH as f64).round() as u64);
        }
    }

    if let Some(bar) = bar {
        bar.finish_and_clear();
    }
}

fn print_download_info(summary: &ClipSummary) {
    let window = &summary.window;
    println!("Title:  {}", summary.title);
    println!("Video:  {} ({})", summary.video_id, summary.canonical_url);
    println!(
        "Window: {} ~ {} ({} s)",
        TimeSpec::from_seconds(window.start_seconds),
        TimeSpec::from_seconds(window.end_seconds()),
        window.duration_seconds
    );
    if let Some(note) = &summary.note {
        println!("Note:   {}", note);
    }
    println!("Output: {}", summary.output_path.display());
}

/// Final output: JSON on stdout, or a human line (errors on stderr)
fn report(outcome: &ExtractionOutcome, json: bool) {
    if json {
        match serde_json::to_string_pretty(outcome) {
            Ok(text) => println!("{}", text),
            Err(e) => warn!("Failed to serialize outcome: {}", e),
        }
        return;
    }

    match (&outcome.output_path, outcome.error_kind) {
        (Some(path), _) => {
            info!(path = %path.display(), "Clip saved");
            println!(
                "Saved {} in {}",
                path.display(),
                Utils::format_elapsed(outcome.elapsed_seconds)
            );
        }
        (None, Some(kind)) => {
            eprintln!(
                "error[{}]: {}",
                kind,
                outcome.message.as_deref().unwrap_or("extraction failed")
            );
        }
        (None, None) => eprintln!("error: extraction produced no output"),
    }
}
