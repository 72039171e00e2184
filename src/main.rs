mod cli;

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use recsplit::{SplitEvent, Splitter};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli::build_cli().get_matches();
    let opts = cli::options_from_matches(&matches)?;
    init_tracing(opts.verbose);

    let input = opts.config.input.clone();
    let splitter = Splitter::new(opts.config)?;
    let ui_task = if opts.quiet { None } else { Some(spawn_progress(splitter.subscribe())) };

    let result = splitter.run().await;
    if let Some(task) = ui_task {
        let _ = task.await;
    }
    let report = result.with_context(|| format!("split {}", input.display()))?;

    println!(
        "wrote {} files, {} ({} per chunk)",
        report.outputs.len(),
        fmt_bytes(report.total_bytes),
        fmt_bytes(report.chunk_size),
    );
    println!("split took {:?}", report.elapsed);
    Ok(())
}

fn init_tracing(verbose: bool) {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::WARN };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .init();
}

fn spawn_progress(mut rx: broadcast::Receiver<SplitEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let sty = ProgressStyle::with_template("{prefix} {bar:40.cyan/blue} {pos}/{len} chunks ({elapsed}) {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        let pb = ProgressBar::new(0);
        pb.set_style(sty);
        pb.set_prefix("[split]");

        let mut copied = 0u64;
        loop {
            let evt = match rx.recv().await {
                Ok(e) => e,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            };

            match evt {
                SplitEvent::Planned { file_size, chunk_size, chunks, workers } => {
                    pb.set_length(chunks as u64);
                    pb.set_message(format!(
                        "{} in chunks of {}, {} worker(s)",
                        fmt_bytes(file_size),
                        fmt_bytes(chunk_size),
                        workers
                    ));
                }
                SplitEvent::ChunkStarted { index, path } => {
                    pb.set_message(format!("chunk {} -> {}", index + 1, path.display()));
                }
                SplitEvent::ChunkDone { bytes, .. } => {
                    copied += bytes;
                    pb.inc(1);
                    pb.set_message(format!("{} copied", fmt_bytes(copied)));
                }
                SplitEvent::ChunkFailed { index, message } => {
                    pb.println(format!("[ERR] chunk {}: {}", index + 1, message));
                }
                SplitEvent::ChunkSkipped { index } => {
                    pb.println(format!("[SKIP] chunk {}", index + 1));
                }
                SplitEvent::Finished { ok, total_bytes, chunks_done, .. } => {
                    if ok {
                        // Totals from the engine, in case any ChunkDone was missed.
                        pb.set_position(chunks_done as u64);
                        pb.finish_with_message(format!("done, {} copied", fmt_bytes(total_bytes)));
                    } else {
                        pb.abandon_with_message("failed");
                    }
                    break;
                }
            }
        }
    })
}

fn fmt_bytes(n: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = 1024.0 * 1024.0;
    const GB: f64 = 1024.0 * 1024.0 * 1024.0;
    let f = n as f64;
    if f >= GB {
        format!("{:.2}GiB", f / GB)
    } else if f >= MB {
        format!("{:.2}MiB", f / MB)
    } else if f >= KB {
        format!("{:.2}KiB", f / KB)
    } else {
        format!("{}B", n)
    }
}
