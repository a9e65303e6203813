use std::sync::Arc;

use anyhow::{Result, bail};

use crate::bitrix::RestBridge;
use crate::core::AppConfig;
use crate::scheduling::{FormValues, OperationOutcome, Orchestrator};

pub async fn run(values: FormValues) -> Result<()> {
    let config = AppConfig::default();
    let bridge = Arc::new(RestBridge::new(&config.bitrix_webhook_url));
    let orchestrator = Orchestrator::new(bridge, config.variant);

    let user_id = orchestrator.connect().await?;
    println!("Connected to the portal as user {}", user_id);

    match orchestrator.handle_submit(&values).await {
        OperationOutcome::CalendarAndActivity { deal_id } => {
            println!("Created the calendar event and an activity on deal #{}", deal_id);
        }
        OperationOutcome::CalendarOnly => {
            println!("Created the calendar event. No deal reference, so no CRM activity.");
        }
        OperationOutcome::Failed { message } => bail!(message),
    }

    Ok(())
}
