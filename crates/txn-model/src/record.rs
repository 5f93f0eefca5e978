//! Canonical transaction record: the unified thirteen-column schema every
//! exchange export is normalized into.
//!
//! The column order is a wire contract with the CSV serializer and must not
//! vary by normalizer. Every column is always present; a value the source
//! could not supply is an empty string, never an omitted cell.

use serde::{Deserialize, Serialize};

/// Output columns in wire order.
pub const OUTPUT_COLUMNS: [&str; 13] = [
    "Id",
    "ExchangeId",
    "timeStamp",
    "Status",
    "Market",
    "Exchange",
    "Side",
    "TransactionType",
    "FilledQuantity",
    "FilledQuote",
    "FilledPrice",
    "Fee",
    "FeeCurrency",
];

/// Direction of a canonical transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
    Deposit,
    Withdraw,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
            Self::Deposit => "DEPOSIT",
            Self::Withdraw => "WITHDRAW",
        }
    }
}

/// Controlled transaction-type vocabulary with an uppercased passthrough for
/// labels outside the known set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionType {
    Trade,
    Order,
    Reward,
    StakingReward,
    Airdrop,
    Deposit,
    Withdrawal,
    Unknown,
    Other(String),
}

impl TransactionType {
    /// Looks up a source label, lower-cased. Unknown labels become
    /// `Other(UPPERCASED)` rather than an error.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "buy" | "sell" | "trade" => Self::Trade,
            "order" => Self::Order,
            "reward income" => Self::Reward,
            "staking income" | "staking reward" => Self::StakingReward,
            "airdrop" => Self::Airdrop,
            "deposit" => Self::Deposit,
            "withdrawal" => Self::Withdrawal,
            "" => Self::Unknown,
            _ => Self::Other(label.trim().to_uppercase()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Trade => "TRADE",
            Self::Order => "ORDER",
            Self::Reward => "REWARD",
            Self::StakingReward => "STAKING_REWARD",
            Self::Airdrop => "AIRDROP",
            Self::Deposit => "DEPOSIT",
            Self::Withdrawal => "WITHDRAWAL",
            Self::Unknown => "UNKNOWN",
            Self::Other(label) => label,
        }
    }
}

/// One normalized transaction, with every output column materialized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub id: String,
    pub exchange_id: String,
    pub time_stamp: String,
    pub status: String,
    pub market: String,
    pub exchange: String,
    pub side: String,
    pub transaction_type: String,
    pub filled_quantity: String,
    pub filled_quote: String,
    pub filled_price: String,
    pub fee: String,
    pub fee_currency: String,
}

impl CanonicalRecord {
    /// Returns the cell for an output column name, or `None` for a name
    /// outside the canonical set.
    pub fn get(&self, column: &str) -> Option<&str> {
        let value = match column {
            "Id" => &self.id,
            "ExchangeId" => &self.exchange_id,
            "timeStamp" => &self.time_stamp,
            "Status" => &self.status,
            "Market" => &self.market,
            "Exchange" => &self.exchange,
            "Side" => &self.side,
            "TransactionType" => &self.transaction_type,
            "FilledQuantity" => &self.filled_quantity,
            "FilledQuote" => &self.filled_quote,
            "FilledPrice" => &self.filled_price,
            "Fee" => &self.fee,
            "FeeCurrency" => &self.fee_currency,
            _ => return None,
        };
        Some(value.as_str())
    }

    /// Sets the cell for an output column name. Returns false for a name
    /// outside the canonical set.
    pub fn set(&mut self, column: &str, value: String) -> bool {
        let slot = match column {
            "Id" => &mut self.id,
            "ExchangeId" => &mut self.exchange_id,
            "timeStamp" => &mut self.time_stamp,
            "Status" => &mut self.status,
            "Market" => &mut self.market,
            "Exchange" => &mut self.exchange,
            "Side" => &mut self.side,
            "TransactionType" => &mut self.transaction_type,
            "FilledQuantity" => &mut self.filled_quantity,
            "FilledQuote" => &mut self.filled_quote,
            "FilledPrice" => &mut self.filled_price,
            "Fee" => &mut self.fee,
            "FeeCurrency" => &mut self.fee_currency,
            _ => return false,
        };
        *slot = value;
        true
    }

    /// Emits the thirteen cells in wire order.
    pub fn to_cells(&self) -> Vec<&str> {
        OUTPUT_COLUMNS
            .iter()
            .map(|column| self.get(column).unwrap_or_default())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_follow_wire_order() {
        let record = CanonicalRecord {
            id: "x-1".to_string(),
            exchange: "X".to_string(),
            side: Side::Buy.as_str().to_string(),
            ..CanonicalRecord::default()
        };
        let cells = record.to_cells();
        assert_eq!(cells.len(), OUTPUT_COLUMNS.len());
        assert_eq!(cells[0], "x-1");
        assert_eq!(cells[5], "X");
        assert_eq!(cells[6], "BUY");
    }

    #[test]
    fn transaction_type_lookup_falls_back_to_uppercase() {
        assert_eq!(TransactionType::from_label("Buy").as_str(), "TRADE");
        assert_eq!(
            TransactionType::from_label("Staking Income").as_str(),
            "STAKING_REWARD"
        );
        assert_eq!(
            TransactionType::from_label("Learning Reward").as_str(),
            "LEARNING REWARD"
        );
        assert_eq!(TransactionType::from_label("").as_str(), "UNKNOWN");
    }

    #[test]
    fn get_rejects_unknown_column() {
        let record = CanonicalRecord::default();
        assert!(record.get("NotAColumn").is_none());
        assert!(record.get("Fee").is_some());
    }
}
