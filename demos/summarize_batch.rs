//! Batch summarization example
//!
//! Signs in, queues every PDF given on the command line, summarizes them one
//! after another and writes each summary next to its source as a .txt file.
//!
//! ```text
//! cargo run --example summarize_batch -- advocate@example.com password a.pdf b.pdf
//! ```

use legalytics_client::{Config, EntryKind, Event, OperationKind, Workspace};
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing (optional)
    // Uncomment if you add tracing-subscriber to your dependencies:
    // tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let (Some(email), Some(password)) = (args.next(), args.next()) else {
        eprintln!("usage: summarize_batch <email> <password> <file.pdf>...");
        std::process::exit(2);
    };
    let files: Vec<PathBuf> = args.map(PathBuf::from).collect();

    let config = Config {
        identity: legalytics_client::IdentityConfig {
            api_key: std::env::var("LEGALYTICS_API_KEY")
                .ok()
                .map(secrecy::SecretString::new),
            ..Default::default()
        },
        ..Default::default()
    };
    let workspace = Workspace::with_rest_identity(config)?;

    // Progress subscriber
    let mut events = workspace.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                Event::ItemStarted { id, operation } => {
                    println!("[{}] {} started", id, operation);
                }
                Event::Progress { id, percent } => {
                    println!("[{}] uploading {}%", id, percent);
                }
                Event::ItemFailed { id, error } => {
                    println!("[{}] failed: {}", id, error);
                }
                Event::RunFinished { summary } => {
                    println!(
                        "Run finished: {} processed, {} succeeded, {} failed",
                        summary.processed, summary.succeeded, summary.failed
                    );
                }
                _ => {}
            }
        }
    });

    if let Err(e) = workspace.gate().sign_in(&email, &password).await {
        eprintln!("Sign-in failed: {}", e);
        std::process::exit(1);
    }

    for path in &files {
        match workspace.submit_path(path).await {
            Ok(id) => println!("Queued {} as item {}", path.display(), id),
            Err(e) => eprintln!("Skipping {}: {}", path.display(), e),
        }
    }

    let summarize = workspace.http_operation(OperationKind::Summarize)?;
    workspace.run(&summarize).await;

    for entry in workspace.log().entries().await {
        if let EntryKind::Outcome { source_label, .. } = &entry.kind {
            let artifact = workspace.export_summary(entry.id, "txt").await?;
            let target = PathBuf::from(source_label).with_extension("summary.txt");
            tokio::fs::write(&target, &artifact.bytes).await?;
            println!("Wrote {}", target.display());
        }
    }

    workspace.gate().sign_out().await?;
    Ok(())
}
