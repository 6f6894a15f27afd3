use tracing::debug;

use forgebill_catalog::{resolve_all, LineItem, LineItemRequest, Position};
use forgebill_infra::PositionRepository;

use crate::error::{missing, ServiceResult};

/// Resolve line item requests and check that referenced positions exist.
///
/// Validation runs for every line before any lookup; nothing is written here.
pub(crate) async fn resolve_line_items(
    positions: &dyn PositionRepository,
    requests: &[LineItemRequest],
) -> ServiceResult<Vec<LineItem>> {
    let lines = resolve_all(requests)?;

    for id in lines.iter().filter_map(LineItem::existing_position) {
        if !positions.exists(id).await? {
            return Err(missing::<Position>(id));
        }
    }

    let inline = lines.iter().filter(|l| l.existing_position().is_none()).count();
    debug!(lines = lines.len(), inline, "resolved line items");
    Ok(lines)
}
