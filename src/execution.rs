//! Execution boundary. The engine never signs or submits anything: executing
//! an opportunity here means flipping its `executed` flag and logging the
//! action for the operator.

use anyhow::{anyhow, Result};
use std::sync::Arc;
use tracing::info;

use crate::storage::{ActivityLog, LogKind, OpportunityStore};

#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub success: bool,
    pub detail: String,
}

pub struct ExecutionService {
    opportunities: Arc<dyn OpportunityStore>,
    activity: Arc<dyn ActivityLog>,
}

impl ExecutionService {
    pub fn new(opportunities: Arc<dyn OpportunityStore>, activity: Arc<dyn ActivityLog>) -> Self {
        Self {
            opportunities,
            activity,
        }
    }

    pub async fn execute(&self, opportunity_id: i64) -> Result<ExecutionOutcome> {
        let Some(opportunity) = self.opportunities.get(opportunity_id).await? else {
            return Err(anyhow!("Arbitrage opportunity {} not found", opportunity_id));
        };

        self.opportunities
            .update_executed(opportunity.id, true)
            .await?;

        let detail = format!(
            "Executed arbitrage opportunity #{} ({} -> {})",
            opportunity.id, opportunity.buy_dex, opportunity.sell_dex
        );
        info!("🚀 {}", detail);
        self.activity.add(LogKind::Success, detail.clone()).await;

        Ok(ExecutionOutcome {
            success: true,
            detail,
        })
    }
}
