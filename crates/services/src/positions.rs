use std::sync::Arc;

use tracing::{info, instrument, warn};

use forgebill_catalog::{Position, PositionRequest};
use forgebill_core::PositionId;
use forgebill_infra::{PositionRepository, StoreError};

use crate::error::{missing, ServiceError, ServiceResult};

#[derive(Clone)]
pub struct PositionService {
    positions: Arc<dyn PositionRepository>,
}

impl PositionService {
    pub fn new(positions: Arc<dyn PositionRepository>) -> Self {
        Self { positions }
    }

    #[instrument(skip(self), err)]
    pub async fn list(&self) -> ServiceResult<Vec<Position>> {
        Ok(self.positions.list().await?)
    }

    #[instrument(skip(self), fields(position_id = %id), err)]
    pub async fn get(&self, id: PositionId) -> ServiceResult<Position> {
        self.positions
            .get(id)
            .await?
            .ok_or_else(|| missing::<Position>(id))
    }

    #[instrument(skip(self, request), err)]
    pub async fn create(&self, request: PositionRequest) -> ServiceResult<Position> {
        let request = request.normalized();
        request.validate()?;

        let position = self.positions.create(request).await?;
        info!(position_id = %position.id, "position created");
        Ok(position)
    }

    /// Replace text, price and unit. Contracts and invoices referencing the
    /// position see the new price on their next read.
    #[instrument(skip(self, request), fields(position_id = %id), err)]
    pub async fn update(&self, id: PositionId, request: PositionRequest) -> ServiceResult<Position> {
        let request = request.normalized();
        request.validate()?;

        let mut position = self.get(id).await?;
        position.apply(request);
        self.positions.update(&position).await?;
        Ok(position)
    }

    #[instrument(skip(self), fields(position_id = %id), err)]
    pub async fn delete(&self, id: PositionId) -> ServiceResult<()> {
        if !self.positions.exists(id).await? {
            return Err(missing::<Position>(id));
        }

        let usage = self.positions.usage_count(id).await?;
        if usage > 0 {
            warn!(usage, "position delete rejected");
            return Err(ServiceError::conflict(format!(
                "position {id} is used by {usage} contract or invoice lines"
            )));
        }

        match self.positions.delete(id).await {
            Ok(()) => {
                info!("position deleted");
                Ok(())
            }
            Err(StoreError::Constraint(detail)) => {
                warn!(%detail, "position delete rejected");
                Err(ServiceError::conflict(format!("position {id} is still referenced")))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Number of contract and invoice lines referencing the position.
    #[instrument(skip(self), fields(position_id = %id), err)]
    pub async fn usage_count(&self, id: PositionId) -> ServiceResult<u64> {
        if !self.positions.exists(id).await? {
            return Err(missing::<Position>(id));
        }
        Ok(self.positions.usage_count(id).await?)
    }
}
