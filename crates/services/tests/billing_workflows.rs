use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;

use forgebill_catalog::{LineItemRequest, PositionRequest};
use forgebill_contracts::{ContractRequest, ContractUpdate};
use forgebill_core::{ContractId, CustomerId, InvoiceId, PositionId};
use forgebill_customers::{Customer, CustomerRequest};
use forgebill_infra::{ContractRepository, InMemoryBillingStore, PositionRepository};
use forgebill_invoicing::{InvoiceKind, InvoiceRequest};
use forgebill_ledger::{PaymentMedium, TransactionKind, TransactionRequest};
use forgebill_services::{BillingServices, ErrorKind, ServiceError};

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn setup() -> (Arc<InMemoryBillingStore>, BillingServices) {
    let store = Arc::new(InMemoryBillingStore::new());
    let services = BillingServices::new(store.clone());
    (store, services)
}

async fn customer(services: &BillingServices) -> Customer {
    services
        .customers
        .create(CustomerRequest {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            street: "12 Analytical Way".to_string(),
            postal_code: "10115".to_string(),
            city: "Berlin".to_string(),
            tax_id: Some("DE123".to_string()),
        })
        .await
        .unwrap()
}

async fn position(services: &BillingServices, text: &str, price: &str) -> PositionId {
    services
        .positions
        .create(PositionRequest {
            text: text.to_string(),
            price: dec(price),
            unit: "h".to_string(),
        })
        .await
        .unwrap()
        .id
}

fn invoice_request(customer_id: CustomerId, positions: Vec<LineItemRequest>) -> InvoiceRequest {
    let now = Utc::now();
    InvoiceRequest {
        customer_id,
        start: now,
        finish: now + Duration::days(30),
        deposit: Decimal::ZERO,
        deposit_paid_at: None,
        kind: InvoiceKind::Standard,
        positions,
    }
}

#[tokio::test]
async fn contract_lines_match_referenced_positions() {
    let (_, services) = setup();
    let customer = customer(&services).await;
    let design = position(&services, "Design", "80").await;
    let review = position(&services, "Review", "60").await;

    let contract = services
        .contracts
        .create(ContractRequest {
            customer_id: customer.id,
            positions: vec![
                LineItemRequest::existing(design, dec("3")),
                LineItemRequest::existing(review, dec("1")),
            ],
        })
        .await
        .unwrap();

    assert_eq!(contract.customer.id, customer.id);
    assert!(!contract.accepted);
    assert_eq!(contract.positions.len(), 2);
    assert_eq!(contract.positions[0].position.id, design);
    assert_eq!(contract.positions[1].position.id, review);
    assert_eq!(contract.total, dec("300"));
}

#[tokio::test]
async fn inline_line_item_creates_position_with_exact_price() {
    let (_, services) = setup();
    let customer = customer(&services).await;

    let contract = services
        .contracts
        .create(ContractRequest {
            customer_id: customer.id,
            positions: vec![LineItemRequest::inline("Setup fee", dec("149.99"), "flat", dec("1"))],
        })
        .await
        .unwrap();

    let created = &contract.positions[0].position;
    assert_eq!(created.price, dec("149.99"));
    assert_eq!(services.positions.get(created.id).await.unwrap().price, dec("149.99"));
}

#[tokio::test]
async fn incomplete_line_item_fails_validation_and_persists_nothing() {
    let (_, services) = setup();
    let customer = customer(&services).await;

    let incomplete = LineItemRequest {
        position_id: None,
        text: Some("Missing price".to_string()),
        price: None,
        unit: Some("h".to_string()),
        amount: dec("1"),
    };
    let err = services
        .contracts
        .create(ContractRequest {
            customer_id: customer.id,
            positions: vec![
                LineItemRequest::inline("Would be orphaned", dec("5"), "pcs", dec("1")),
                incomplete,
            ],
        })
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::BadRequest);
    assert!(services.contracts.list().await.unwrap().is_empty());
    assert!(services.positions.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_references_are_not_found() {
    let (_, services) = setup();
    let customer = customer(&services).await;

    let err = services
        .contracts
        .create(ContractRequest {
            customer_id: CustomerId::new(999),
            positions: vec![],
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { entity: "customer", id: 999 }));

    let err = services
        .contracts
        .create(ContractRequest {
            customer_id: customer.id,
            positions: vec![LineItemRequest::existing(PositionId::new(77), dec("1"))],
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { entity: "position", id: 77 }));
    assert!(services.contracts.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn conversion_mirrors_contract_lines() {
    let (_, services) = setup();
    let customer = customer(&services).await;
    let p1 = position(&services, "Consulting", "100").await;
    let p2 = position(&services, "Travel", "45.50").await;

    let contract = services
        .contracts
        .create(ContractRequest {
            customer_id: customer.id,
            positions: vec![
                LineItemRequest::existing(p1, dec("3")),
                LineItemRequest::existing(p2, dec("1")),
            ],
        })
        .await
        .unwrap();

    let before = Utc::now();
    let draft = services
        .contracts
        .convert_to_invoice_draft(contract.id)
        .await
        .unwrap();

    assert_eq!(draft.customer_id, customer.id);
    assert_eq!(draft.kind, InvoiceKind::FromContract);
    assert!(draft.start >= before);
    assert_eq!(draft.start, draft.finish);
    assert_eq!(draft.positions.len(), 2);
    assert_eq!(draft.positions[0].position_id, Some(p1.get()));
    assert_eq!(draft.positions[0].amount, dec("3"));
    assert_eq!(draft.positions[1].position_id, Some(p2.get()));
    assert_eq!(draft.positions[1].amount, dec("1"));

    // Read-only: the contract is unchanged.
    assert_eq!(services.contracts.get(contract.id).await.unwrap(), contract);
}

#[tokio::test]
async fn converting_unknown_contract_is_not_found() {
    let (_, services) = setup();
    let err = services
        .contracts
        .convert_to_invoice_draft(ContractId::new(5))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn invoice_contract_creates_derived_invoice() {
    let (_, services) = setup();
    let customer = customer(&services).await;
    let p1 = position(&services, "Consulting", "100").await;

    let contract = services
        .contracts
        .create(ContractRequest {
            customer_id: customer.id,
            positions: vec![LineItemRequest::existing(p1, dec("2"))],
        })
        .await
        .unwrap();

    let invoice = services.invoice_contract(contract.id).await.unwrap();
    assert_eq!(invoice.kind, InvoiceKind::FromContract);
    assert_eq!(invoice.customer.id, customer.id);
    assert_eq!(invoice.total, dec("200"));
    // No inline positions were created along the way.
    assert_eq!(services.positions.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn deleting_contract_leaves_no_orphaned_lines() {
    let (store, services) = setup();
    let customer = customer(&services).await;
    let p1 = position(&services, "A", "1").await;
    let p2 = position(&services, "B", "2").await;

    let contract = services
        .contracts
        .create(ContractRequest {
            customer_id: customer.id,
            positions: vec![
                LineItemRequest::existing(p1, dec("1")),
                LineItemRequest::existing(p2, dec("2")),
                LineItemRequest::existing(p1, dec("3")),
            ],
        })
        .await
        .unwrap();
    assert_eq!(store.contract_line_count(contract.id).unwrap(), 3);

    services.contracts.delete(contract.id).await.unwrap();

    assert_eq!(store.contract_line_count(contract.id).unwrap(), 0);
    assert!(!ContractRepository::exists(store.as_ref(), contract.id).await.unwrap());
    let err = services.contracts.delete(contract.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn deleting_invoice_removes_lines_first() {
    let (store, services) = setup();
    let customer = customer(&services).await;
    let p1 = position(&services, "A", "1").await;

    let invoice = services
        .invoices
        .create(invoice_request(customer.id, vec![LineItemRequest::existing(p1, dec("4"))]))
        .await
        .unwrap();
    assert_eq!(store.invoice_line_count(invoice.id).unwrap(), 1);

    services.invoices.delete(invoice.id).await.unwrap();
    assert_eq!(store.invoice_line_count(invoice.id).unwrap(), 0);
    assert_eq!(
        services.invoices.get(invoice.id).await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[tokio::test]
async fn invoice_total_sums_line_totals() {
    let (_, services) = setup();
    let customer = customer(&services).await;
    let ten = position(&services, "Ten", "10.00").await;
    let five = position(&services, "Five fifty", "5.50").await;

    let invoice = services
        .invoices
        .create(invoice_request(
            customer.id,
            vec![
                LineItemRequest::existing(ten, dec("2")),
                LineItemRequest::existing(five, dec("1")),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(invoice.total, dec("25.50"));
}

#[tokio::test]
async fn invoice_totals_follow_live_position_price() {
    // Line totals are priced from the current position, not frozen at invoicing time.
    let (_, services) = setup();
    let customer = customer(&services).await;
    let hourly = position(&services, "Hourly", "50").await;

    let invoice = services
        .invoices
        .create(invoice_request(customer.id, vec![LineItemRequest::existing(hourly, dec("2"))]))
        .await
        .unwrap();
    assert_eq!(invoice.total, dec("100"));

    services
        .positions
        .update(
            hourly,
            PositionRequest {
                text: "Hourly".to_string(),
                price: dec("65"),
                unit: "h".to_string(),
            },
        )
        .await
        .unwrap();

    let reread = services.invoices.get(invoice.id).await.unwrap();
    assert_eq!(reread.positions[0].total, dec("130"));
    assert_eq!(reread.total, dec("130"));
}

#[tokio::test]
async fn new_customer_has_no_contracts_or_invoices() {
    let (_, services) = setup();
    let customer = customer(&services).await;

    assert!(services.customers.contracts_for(customer.id).await.unwrap().is_empty());
    assert!(services.customers.invoices_for(customer.id).await.unwrap().is_empty());
    assert!(services.invoices.get_by_customer(customer.id).await.unwrap().is_empty());

    let err = services
        .customers
        .contracts_for(CustomerId::new(404))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn customer_queries_return_only_their_records() {
    let (_, services) = setup();
    let ada = customer(&services).await;
    let other = customer(&services).await;
    let p1 = position(&services, "A", "10").await;

    services
        .contracts
        .create(ContractRequest {
            customer_id: ada.id,
            positions: vec![LineItemRequest::existing(p1, dec("1"))],
        })
        .await
        .unwrap();
    services
        .invoices
        .create(invoice_request(other.id, vec![LineItemRequest::existing(p1, dec("1"))]))
        .await
        .unwrap();

    assert_eq!(services.customers.contracts_for(ada.id).await.unwrap().len(), 1);
    assert!(services.customers.invoices_for(ada.id).await.unwrap().is_empty());
    assert_eq!(services.invoices.get_by_customer(other.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn contract_update_only_touches_accepted_flag() {
    let (_, services) = setup();
    let customer = customer(&services).await;
    let p1 = position(&services, "A", "10").await;
    let contract = services
        .contracts
        .create(ContractRequest {
            customer_id: customer.id,
            positions: vec![LineItemRequest::existing(p1, dec("2"))],
        })
        .await
        .unwrap();

    let updated = services
        .contracts
        .update(contract.id, ContractUpdate { accepted: true })
        .await
        .unwrap();

    assert!(updated.accepted);
    assert_eq!(updated.positions, contract.positions);
    assert_eq!(updated.created_at, contract.created_at);

    let err = services
        .contracts
        .update(ContractId::new(42), ContractUpdate { accepted: true })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn invoice_update_replaces_header_and_keeps_lines() {
    let (_, services) = setup();
    let customer = customer(&services).await;
    let p1 = position(&services, "A", "10").await;
    let invoice = services
        .invoices
        .create(invoice_request(customer.id, vec![LineItemRequest::existing(p1, dec("2"))]))
        .await
        .unwrap();

    let paid_at = Utc::now();
    let mut request = invoice_request(customer.id, vec![]);
    request.deposit = dec("5");
    request.deposit_paid_at = Some(paid_at);
    request.kind = InvoiceKind::Deposit;

    let updated = services.invoices.update(invoice.id, request).await.unwrap();
    assert_eq!(updated.kind, InvoiceKind::Deposit);
    assert_eq!(updated.deposit, dec("5"));
    assert_eq!(updated.positions.len(), 1);
    assert_eq!(updated.outstanding, dec("15"));

    let mut backwards = invoice_request(customer.id, vec![]);
    backwards.finish = backwards.start - Duration::days(1);
    let err = services.invoices.update(invoice.id, backwards).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);

    let err = services
        .invoices
        .update(InvoiceId::new(900), invoice_request(customer.id, vec![]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn invalid_header_for_unknown_invoice_is_not_found() {
    let (_, services) = setup();
    let customer = customer(&services).await;

    let mut backwards = invoice_request(customer.id, vec![]);
    backwards.finish = backwards.start - Duration::days(1);
    let err = services
        .invoices
        .update(InvoiceId::new(901), backwards)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { entity: "invoice", id: 901 }));
}

#[tokio::test]
async fn invoice_inline_line_item_creates_position_with_exact_price() {
    let (_, services) = setup();
    let customer = customer(&services).await;

    let invoice = services
        .invoices
        .create(invoice_request(
            customer.id,
            vec![LineItemRequest::inline("Hosting", dec("12.3456"), "month", dec("6"))],
        ))
        .await
        .unwrap();

    let created = &invoice.positions[0].position;
    assert_eq!(created.price, dec("12.3456"));
    assert_eq!(created.unit, "month");
    assert_eq!(services.positions.get(created.id).await.unwrap().price, dec("12.3456"));
    assert_eq!(invoice.total, dec("74.0736"));
}

#[tokio::test]
async fn invoice_with_unknown_position_is_not_found_and_persists_nothing() {
    let (_, services) = setup();
    let customer = customer(&services).await;

    let err = services
        .invoices
        .create(invoice_request(
            customer.id,
            vec![
                LineItemRequest::inline("Would be orphaned", dec("5"), "pcs", dec("1")),
                LineItemRequest::existing(PositionId::new(999), dec("1")),
            ],
        ))
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::NotFound { entity: "position", id: 999 }));
    assert!(services.invoices.list().await.unwrap().is_empty());
    assert!(services.positions.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn prices_beyond_storage_range_are_rejected() {
    let (_, services) = setup();

    for price in [Decimal::MAX, dec("1000000000000.01"), dec("0.12345")] {
        let err = services
            .positions
            .create(PositionRequest {
                text: "Too much".to_string(),
                price,
                unit: "pcs".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
    }
    assert!(services.positions.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn oversized_line_amount_is_rejected_before_any_write() {
    let (_, services) = setup();
    let customer = customer(&services).await;
    let priced = position(&services, "Premium", "999999999999").await;

    let err = services
        .contracts
        .create(ContractRequest {
            customer_id: customer.id,
            positions: vec![LineItemRequest::existing(priced, Decimal::MAX)],
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);

    let err = services
        .invoices
        .create(invoice_request(
            customer.id,
            vec![LineItemRequest::inline("Bulk", dec("1"), "pcs", dec("1000001"))],
        ))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);

    assert!(services.contracts.list().await.unwrap().is_empty());
    assert!(services.customers.contracts_for(customer.id).await.unwrap().is_empty());
    assert!(services.invoices.list().await.unwrap().is_empty());
    assert_eq!(services.positions.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn corrupt_stored_price_surfaces_as_internal_failure() {
    let (store, services) = setup();
    let customer = customer(&services).await;
    // Written straight to the store, bypassing request validation.
    let corrupt = PositionRepository::create(
        &*store,
        PositionRequest {
            text: "Corrupt".to_string(),
            price: Decimal::MAX,
            unit: "pcs".to_string(),
        },
    )
    .await
    .unwrap();

    let err = services
        .contracts
        .create(ContractRequest {
            customer_id: customer.id,
            positions: vec![LineItemRequest::existing(corrupt.id, dec("2"))],
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert!(matches!(err, ServiceError::Invariant(_)));

    let err = services.contracts.list().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
}

#[tokio::test]
async fn referenced_records_cannot_be_deleted() {
    let (_, services) = setup();
    let customer = customer(&services).await;
    let p1 = position(&services, "A", "10").await;
    let contract = services
        .contracts
        .create(ContractRequest {
            customer_id: customer.id,
            positions: vec![LineItemRequest::existing(p1, dec("1"))],
        })
        .await
        .unwrap();

    let err = services.positions.delete(p1).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    let err = services.customers.delete(customer.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    services.contracts.delete(contract.id).await.unwrap();
    services.positions.delete(p1).await.unwrap();
    services.customers.delete(customer.id).await.unwrap();
    assert!(services.customers.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn customer_crud_round_trip() {
    let (_, services) = setup();
    let created = customer(&services).await;

    let updated = services
        .customers
        .update(
            created.id,
            CustomerRequest {
                first_name: "Ada".to_string(),
                last_name: "King".to_string(),
                tax_id: Some("  ".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.last_name, "King");
    assert_eq!(updated.tax_id, None);
    assert_eq!(services.customers.get(created.id).await.unwrap(), updated);

    let err = services
        .customers
        .create(CustomerRequest::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);
}

#[tokio::test]
async fn transactions_book_and_balance() {
    let (_, services) = setup();
    let date = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();

    let income = services
        .transactions
        .create(TransactionRequest {
            amount: dec("1200"),
            description: "Invoice 7 paid".to_string(),
            date,
            kind: TransactionKind::Income,
            medium: PaymentMedium::BankTransfer,
        })
        .await
        .unwrap();
    services
        .transactions
        .create(TransactionRequest {
            amount: dec("-200.25"),
            description: "Office supplies".to_string(),
            date,
            kind: TransactionKind::Expense,
            medium: PaymentMedium::Card,
        })
        .await
        .unwrap();

    assert_eq!(services.transactions.balance().await.unwrap(), dec("999.75"));

    let updated = services
        .transactions
        .update(
            income.id,
            TransactionRequest {
                amount: dec("1000"),
                description: "Invoice 7 paid (partial)".to_string(),
                date,
                kind: TransactionKind::Income,
                medium: PaymentMedium::Cash,
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.medium, PaymentMedium::Cash);
    assert_eq!(services.transactions.balance().await.unwrap(), dec("799.75"));

    services.transactions.delete(income.id).await.unwrap();
    assert_eq!(
        services.transactions.get(income.id).await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
}
