//! Interactive chat loop.
//!
//! Each line is submitted in the background so the prompt stays responsive;
//! a second line sent while one is still classifying is turned away.

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use saathi::config::SaathiConfig;
use saathi::error::SaathiError;
use saathi::intent::PipelineState;

const HELP: &str = "Commands: /feed, /summary, /translate <text>, /help, /quit";

pub async fn chat(config: &SaathiConfig) -> Result<()> {
    let runtime = super::start(config, true).await?;
    let session = runtime.session;
    let view = runtime.view;
    let _follower = session.follow_identity();

    let mut notices = runtime.notices;
    tokio::spawn(async move {
        while let Some(notice) = notices.recv().await {
            super::print_notice(&notice);
        }
    });

    let mut status = session.watch_status();
    tokio::spawn(async move {
        while status.changed().await.is_ok() {
            let current = *status.borrow_and_update();
            eprintln!("Status: {current}");
        }
    });

    let mut pipeline = session.pipeline().watch_state();
    tokio::spawn(async move {
        while pipeline.changed().await.is_ok() {
            if *pipeline.borrow_and_update() == PipelineState::Classifying {
                eprintln!("...");
            }
        }
    });

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line.split_once(' ').map_or((line, ""), |(cmd, rest)| (cmd, rest.trim())) {
            ("/quit" | "/exit", _) => break,
            ("/help", _) => println!("{HELP}"),
            ("/feed", _) => super::print_lines(&view.feed_lines()),
            ("/summary", _) => super::print_lines(&view.summary_lines()),
            ("/translate", text) => {
                if let Some(translated) = session.translate(text).await {
                    println!("{translated}");
                }
            }
            _ if line.starts_with('/') => println!("Unknown command. {HELP}"),
            _ => {
                let session = session.clone();
                let text = line.to_string();
                tokio::spawn(async move {
                    match session.submit(&text).await {
                        Ok(_) => {}
                        Err(SaathiError::Busy) => {
                            eprintln!("! Still working on your last message.")
                        }
                        Err(e) => tracing::debug!(error = %e, "submission not recorded"),
                    }
                });
            }
        }
    }

    session.disconnect();
    Ok(())
}
