//! Interactive terminal session against an in-memory records fixture and an
//! OpenAI-compatible model endpoint.

use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use salesdesk_assistant::{AssistantConfig, AssistantServices, OpenAiCompatibleModel};
use salesdesk_core::{BusinessAssumptions, SalespersonContext, SalespersonId, SystemClock};
use salesdesk_memory::InMemoryConversationStore;
use salesdesk_observability::LogFormat;
use salesdesk_records::InMemoryRecordsClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let format = std::env::var("SALESDESK_LOG_FORMAT")
        .ok()
        .and_then(|raw| LogFormat::parse(&raw))
        .unwrap_or(LogFormat::Compact);
    salesdesk_observability::init(format);

    let config = AssistantConfig::from_env();

    let assumptions = match &config.assumptions_path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading assumptions from {}", path.display()))?;
            BusinessAssumptions::from_json_str(&raw).context("parsing business assumptions")?
        }
        None => BusinessAssumptions::default(),
    };

    let records = match &config.fixtures_path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading records fixture from {}", path.display()))?;
            InMemoryRecordsClient::from_fixture_json(&raw).context("loading records fixture")?
        }
        None => {
            tracing::warn!("SALESDESK_FIXTURES not set; starting with an empty records system");
            InMemoryRecordsClient::new()
        }
    };

    let llm = OpenAiCompatibleModel::new(&config.llm_endpoint, &config.llm_model, config.llm_timeout)
        .context("building language model client")?
        .with_api_key(config.llm_api_key.clone());

    let salesperson = SalespersonContext::new(SalespersonId::new(), config.salesperson_name.clone(), config.erp_user_id);

    let orchestrator = AssistantServices {
        records: Arc::new(records),
        store: Arc::new(InMemoryConversationStore::new()),
        llm: Arc::new(llm),
        clock: Arc::new(SystemClock),
        assumptions: Arc::new(assumptions),
    }
    .build(config);

    tracing::info!(salesperson = %salesperson.id, name = %salesperson.name, "session started");

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if matches!(text, "/esci" | "/exit" | "/quit") {
            break;
        }
        let reply = orchestrator.process_message(&salesperson, text).await;
        stdout.write_all(format!("{reply}\n\n").as_bytes()).await?;
    }

    Ok(())
}
