use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

pub async fn enqueue_settlement(state: &AppState, shipment_id: Uuid) -> Result<(), AppError> {
    state
        .settle_tx
        .send(shipment_id)
        .await
        .map_err(|err| AppError::Internal(format!("settlement queue send failed: {err}")))?;

    state.metrics.settlements_in_queue.inc();
    Ok(())
}
