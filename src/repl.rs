//! Interactive REPL for the product advisor.
//!
//! One free-text line per turn. Stage progress and results are printed here,
//! not in the pipeline, so the pipeline stays silent and testable. Every
//! failure path ends with the loop waiting for the next input; nothing a
//! single turn does can take the process down.

use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::debug;

use crate::advisor::Advisor;
use crate::errors::PipelineError;

/// Width of the printed rules.
const RULE_WIDTH: usize = 70;

/// Cap for unexpected error messages shown to the user.
const MAX_ERROR_CHARS: usize = 300;

/// Control inputs that terminate the loop.
fn is_exit_command(input: &str) -> bool {
    matches!(input.to_lowercase().as_str(), "exit" | "quit" | "q")
}

/// Truncate an unexpected error message for display.
fn truncate_error(message: &str) -> String {
    if message.chars().count() > MAX_ERROR_CHARS {
        let cut: String = message.chars().take(MAX_ERROR_CHARS).collect();
        format!("{}...", cut)
    } else {
        message.to_string()
    }
}

fn print_banner() {
    println!("\n{}", "=".repeat(RULE_WIDTH));
    println!("PRODUCT ADVISOR - Interactive Assistant");
    println!("{}\n", "=".repeat(RULE_WIDTH));
    println!("Type 'exit', 'quit', or 'q' to quit.\n");
}

/// Run the interactive loop until the user exits.
pub async fn run_repl(advisor: &Advisor) -> Result<()> {
    let mut editor = DefaultEditor::new()?;
    print_banner();

    loop {
        match editor.readline("You: ") {
            Ok(line) => {
                let input = line.trim().to_string();
                if input.is_empty() {
                    continue;
                }
                if is_exit_command(&input) {
                    println!("\nGoodbye!\n");
                    break;
                }
                let _ = editor.add_history_entry(&input);

                // Ctrl-C abandons the in-flight turn: the select drops the
                // pipeline future at its next await point and no partial
                // output is printed.
                tokio::select! {
                    biased;
                    _ = tokio::signal::ctrl_c() => {
                        println!("\nInterrupted. The current request was abandoned.\n");
                    }
                    _ = run_turn(advisor, &input) => {}
                }
            }
            Err(ReadlineError::Interrupted) => {
                debug!("readline interrupted");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("\nGoodbye!\n");
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}

/// Run a single turn and print its output (one-shot `--message` mode).
pub async fn run_once(advisor: &Advisor, message: &str) {
    run_turn(advisor, message).await;
}

/// Drive the three stages for one input, printing progress between them.
async fn run_turn(advisor: &Advisor, input: &str) {
    println!("\n{}", "-".repeat(RULE_WIDTH));
    println!("⏳ Processing your request...\n");
    println!("[Searching] Finding products...\n");

    let search = match advisor.search(input).await {
        Ok(s) => s,
        Err(e) => return report_stage_error(&e),
    };

    println!("[Analyzing] Ranking products...\n");
    let analysis = match advisor.analyze(input, &search).await {
        Ok(a) => a,
        Err(e) => return report_stage_error(&e),
    };

    println!("[Critic] Reviewing recommendations...\n");
    let critique = match advisor.critique(input, &analysis).await {
        Ok(c) => c,
        Err(e) => return report_stage_error(&e),
    };

    println!("\n{}", "=".repeat(RULE_WIDTH));
    println!("RECOMMENDED PRODUCTS");
    println!("{}\n", "=".repeat(RULE_WIDTH));
    println!("{}", analysis.trim());

    println!("\n{}", "=".repeat(RULE_WIDTH));
    println!("CRITIC REVIEW");
    println!("{}\n", "=".repeat(RULE_WIDTH));
    if critique.raw.trim().is_empty() {
        println!("(No critic feedback)");
    } else {
        println!("{}", critique.raw.trim());
    }

    println!("\n{}", "-".repeat(RULE_WIDTH));
    println!("Ready for your next query.\n");
}

/// Surface a stage failure as a short diagnostic and abandon the turn.
fn report_stage_error(err: &anyhow::Error) {
    match err.downcast_ref::<PipelineError>() {
        Some(PipelineError::NoResults) => {
            println!("⚠️ Could not find any JSON results from the search agent.\n");
        }
        Some(PipelineError::UnparsableResult { raw }) => {
            println!("⚠️ Could not parse any products from the search response.\n");
            println!("Raw response:\n");
            println!("{}\n", raw);
        }
        Some(PipelineError::EmptyAnalysis) => {
            println!("⚠️ Analyzer did not return any content.\n");
        }
        None => {
            println!("❌ Error occurred: {}\n", truncate_error(&err.to_string()));
        }
    }
    println!("Please try another query.\n");
}
