use anyhow::Context;
use tracing::info;

use forgebill_infra::StoreConfig;
use forgebill_services::build_services;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    forgebill_observability::init();

    let config = StoreConfig::from_env().context("invalid store configuration")?;
    info!(backend = config.backend.describe(), "starting forgebill");

    let services = build_services(&config)
        .await
        .context("failed to initialise billing store")?;

    let customers = services.customers.list().await?.len();
    let positions = services.positions.list().await?.len();
    let contracts = services.contracts.list().await?.len();
    let invoices = services.invoices.list().await?.len();
    let balance = services.transactions.balance().await?;

    info!(
        customers,
        positions,
        contracts,
        invoices,
        %balance,
        "billing catalog loaded"
    );
    Ok(())
}
