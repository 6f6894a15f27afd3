use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use forgebill_core::{
    ensure_bounded, sum_totals, DomainError, DomainResult, Entity, TransactionId, MAX_PRICE,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expense,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMedium {
    Cash,
    BankTransfer,
    Card,
    Other,
}

macro_rules! impl_tag {
    ($t:ty, { $($variant:path => $tag:literal),+ $(,)? }) => {
        impl $t {
            pub fn as_str(self) -> &'static str {
                match self {
                    $($variant => $tag,)+
                }
            }
        }

        impl core::str::FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($tag => Ok($variant),)+
                    other => Err(DomainError::validation(format!(
                        "unknown {} '{}'",
                        stringify!($t),
                        other
                    ))),
                }
            }
        }
    };
}

impl_tag!(TransactionKind, {
    TransactionKind::Income => "income",
    TransactionKind::Expense => "expense",
});

impl_tag!(PaymentMedium, {
    PaymentMedium::Cash => "cash",
    PaymentMedium::BankTransfer => "bank_transfer",
    PaymentMedium::Card => "card",
    PaymentMedium::Other => "other",
});

/// Ledger entry with a signed amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub amount: Decimal,
    pub description: String,
    pub date: NaiveDate,
    pub kind: TransactionKind,
    pub medium: PaymentMedium,
}

impl Transaction {
    pub fn from_request(id: TransactionId, request: TransactionRequest) -> Self {
        Self {
            id,
            amount: request.amount,
            description: request.description,
            date: request.date,
            kind: request.kind,
            medium: request.medium,
        }
    }

    pub fn apply(&mut self, request: TransactionRequest) {
        self.amount = request.amount;
        self.description = request.description;
        self.date = request.date;
        self.kind = request.kind;
        self.medium = request.medium;
    }
}

impl Entity for Transaction {
    const KIND: &'static str = "transaction";
    type Id = TransactionId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// Create/update payload for a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub amount: Decimal,
    #[serde(default)]
    pub description: String,
    pub date: NaiveDate,
    pub kind: TransactionKind,
    pub medium: PaymentMedium,
}

impl TransactionRequest {
    pub fn normalized(self) -> Self {
        Self {
            description: self.description.trim().to_string(),
            ..self
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.description.trim().is_empty() {
            return Err(DomainError::validation(
                "transaction description must not be blank",
            ));
        }
        ensure_bounded("transaction amount", self.amount, MAX_PRICE)
    }
}

/// Sum of signed amounts.
pub fn balance<'a, I>(transactions: I) -> DomainResult<Decimal>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    sum_totals(transactions.into_iter().map(|t| t.amount))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn request(amount: &str) -> TransactionRequest {
        TransactionRequest {
            amount: amount.parse().unwrap(),
            description: " Office rent ".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            kind: TransactionKind::Expense,
            medium: PaymentMedium::BankTransfer,
        }
    }

    #[test]
    fn blank_description_is_rejected() {
        let req = TransactionRequest {
            description: "   ".to_string(),
            ..request("-10")
        };
        assert!(matches!(req.validate(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn amount_is_bounded_in_both_directions() {
        assert!(request("-1000000000000").validate().is_ok());
        assert!(request("1000000000001").validate().is_err());
        assert!(request("-1000000000001").validate().is_err());
        assert!(matches!(
            request("1.00001").validate(),
            Err(DomainError::Validation(msg)) if msg.contains("decimal places")
        ));
    }

    #[test]
    fn normalized_trims_description() {
        assert_eq!(request("1").normalized().description, "Office rent");
    }

    #[test]
    fn tags_parse_and_serialize() {
        assert_eq!("bank_transfer".parse::<PaymentMedium>().unwrap(), PaymentMedium::BankTransfer);
        assert!("wire".parse::<PaymentMedium>().is_err());
        assert_eq!(TransactionKind::Income.as_str(), "income");
        let json = serde_json::to_string(&PaymentMedium::BankTransfer).unwrap();
        assert_eq!(json, "\"bank_transfer\"");
    }

    #[test]
    fn apply_replaces_everything_but_id() {
        let mut tx = Transaction::from_request(TransactionId::new(4), request("-10"));
        tx.apply(TransactionRequest {
            kind: TransactionKind::Income,
            medium: PaymentMedium::Cash,
            ..request("250.00")
        });
        assert_eq!(tx.id, TransactionId::new(4));
        assert_eq!(tx.kind, TransactionKind::Income);
        assert_eq!(tx.amount, "250".parse::<Decimal>().unwrap());
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Signed amounts cancel out: booking x then -x leaves the balance unchanged.
        #[test]
        fn reversal_cancels(cents in prop::collection::vec(-1_000_000i64..1_000_000, 1..20)) {
            let mut txs = Vec::new();
            for (i, c) in cents.iter().enumerate() {
                let mut a = Transaction::from_request(TransactionId::new(2 * i as i64 + 1), request("0"));
                a.amount = Decimal::new(*c, 2);
                let mut b = a.clone();
                b.id = TransactionId::new(2 * i as i64 + 2);
                b.amount = -a.amount;
                txs.push(a);
                txs.push(b);
            }
            prop_assert_eq!(balance(&txs).unwrap(), Decimal::ZERO);
        }
    }
}
