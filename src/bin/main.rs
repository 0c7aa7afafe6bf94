use spendsense_core::{
    analysis::AnalysisOrchestrator,
    chat::ChatOrchestrator,
    export::export_report,
    gateway::MockAgentGateway,
    models::LedgerFile,
    session::new_session,
    upload::MockUploader,
};
use std::sync::Arc;
use tracing::info;

const SAMPLE_LEDGER: &str = "\
date,merchant,amount
2024-01-03,Grocer Mart,1240
2024-01-07,Stream Co,499
2024-01-15,City Power,2180";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    info!("SpendSense orchestration core starting");

    // Composition root: wire the orchestrators over a shared session.
    // Mock collaborators keep the demo functional without the remote fleet;
    // swap in HttpUploader/HttpAgentGateway::from_env() for live agents.
    let session = new_session();
    let uploader = Arc::new(MockUploader::succeeding());
    let gateway = Arc::new(MockAgentGateway::with_canned_responses());

    let analysis = AnalysisOrchestrator::new(uploader, gateway.clone(), Arc::clone(&session));
    let chat = ChatOrchestrator::new(gateway, session);

    // Dashboard flow: load a ledger, add goals, run the analysis
    let ledger = LedgerFile::new("transactions.csv", Some("text/csv".to_string()), SAMPLE_LEDGER)?;
    analysis.load_ledger(ledger).await;
    analysis.add_goal("Save ₹50,000 for vacation").await;
    analysis.add_goal("Cut ghost subscriptions").await;

    analysis.run_analysis().await?;
    analysis.await_enrichment().await;

    println!("\n=== ANALYSIS ===");
    println!("State: {}", analysis.state().await);
    if let Some(snapshot) = analysis.snapshot().await {
        println!("Produced at: {}", snapshot.produced_at);
        println!(
            "Market context: {}",
            if snapshot.market_context.is_some() { "attached" } else { "unavailable" }
        );

        let report = export_report(&snapshot)?;
        println!("Export: {} ({} bytes)", report.filename, report.contents.len());
    }

    // Chat flow: the loaded ledger rides along as context
    chat.send("What's my 3-month spending projection?").await;

    println!("\n=== TRANSCRIPT ===");
    for turn in chat.transcript().turns().await {
        println!("[{:?} @ {}]", turn.speaker, turn.produced_at.time());
        println!("{}\n", turn.text);
    }

    Ok(())
}
