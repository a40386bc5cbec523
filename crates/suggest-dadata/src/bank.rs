//! Bank suggestions.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use suggest_core::Suggestion;
use suggest_engine::SuggestionKind;

use crate::{insert_opt, Address, BANK_URL};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BankStatus {
    Active,
    Liquidating,
    Liquidated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BankType {
    Bank,
    BankBranch,
    Nko,
    NkoBranch,
    Rkc,
    Other,
}

/// Bank kind with its request filters.
#[derive(Debug, Clone, Default)]
pub struct BankKind {
    pub status: Option<Vec<BankStatus>>,
    pub bank_type: Option<Vec<BankType>>,
    pub locations: Option<Vec<Value>>,
    pub locations_boost: Option<Vec<Value>>,
}

impl BankKind {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SuggestionKind for BankKind {
    type Data = Bank;

    fn default_endpoint(&self) -> &str {
        BANK_URL
    }

    fn payload(&self, query: &str, count: usize) -> Value {
        let mut payload = json!({ "query": query, "count": count });
        insert_opt(&mut payload, "status", self.status.as_ref());
        insert_opt(&mut payload, "type", self.bank_type.as_ref());
        insert_opt(&mut payload, "locations", self.locations.as_ref());
        insert_opt(&mut payload, "locations_boost", self.locations_boost.as_ref());
        payload
    }

    /// Banks are keyed by BIC; entries without one fall back to the display value.
    fn suggestion_key(&self, suggestion: &Suggestion<Bank>) -> String {
        suggestion
            .data
            .bic
            .clone()
            .unwrap_or_else(|| suggestion.value.clone())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BankName {
    pub payment: Option<String>,
    pub short: Option<String>,
    pub full: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BankState {
    pub status: Option<BankStatus>,
    pub actuality_date: Option<i64>,
    pub registration_date: Option<i64>,
    pub liquidation_date: Option<i64>,
}

/// Bank payload of a suggestion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bank {
    pub bic: Option<String>,
    pub swift: Option<String>,
    pub inn: Option<String>,
    pub kpp: Option<String>,
    pub correspondent_account: Option<String>,
    pub payment_city: Option<String>,
    pub name: Option<BankName>,
    pub state: Option<BankState>,
    pub address: Option<Suggestion<Address>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Bank {
    pub fn status(&self) -> Option<BankStatus> {
        self.state.as_ref().and_then(|s| s.status)
    }

    pub fn is_liquidated(&self) -> bool {
        self.status() == Some(BankStatus::Liquidated)
    }

    /// Display address of the bank, if known.
    pub fn address_value(&self) -> Option<&str> {
        self.address
            .as_ref()
            .map(|a| a.value.as_str())
            .filter(|v| !v.is_empty())
    }
}
