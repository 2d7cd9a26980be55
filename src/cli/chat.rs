use std::io::Write;

use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::sync::mpsc;

use super::recommend::print_investors;
use crate::ai::chat::{Advisor, GREETING, Session};
use crate::core::AppConfig;
use crate::core::logging::init_tracing;

pub async fn run() -> Result<()> {
    init_tracing(&format!("{}=warn", env!("CARGO_CRATE_NAME")));

    let config = AppConfig::default();
    let advisor = Advisor::from_config(&config)?;
    let mut session = Session::with_greeting("terminal");
    let mut rl = DefaultEditor::new()?;

    println!("{}", GREETING);

    loop {
        let readline = rl.readline(">>> ");
        match readline {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line.as_str());

                // Print fragments as they stream in
                let (tx, mut rx) = mpsc::unbounded_channel::<String>();
                let printer = tokio::spawn(async move {
                    let mut streamed = String::new();
                    while let Some(fragment) = rx.recv().await {
                        print!("{}", fragment);
                        let _ = std::io::stdout().flush();
                        streamed.push_str(&fragment);
                    }
                    streamed
                });

                let previous = session.recommendations().map(<[_]>::to_vec);
                let reply = session.send(&advisor, &line, Some(tx)).await;
                let streamed = printer.await.unwrap_or_default();

                // Canned and error replies are never streamed
                if streamed.is_empty() {
                    println!("{}", reply);
                } else if streamed != reply {
                    println!("\n\n{}", reply);
                } else {
                    println!();
                }

                if let Some(recommendations) = session.recommendations()
                    && previous.as_deref() != Some(recommendations)
                {
                    print_investors(recommendations);
                }
            }
            Err(ReadlineError::Interrupted) => break,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }

    Ok(())
}
