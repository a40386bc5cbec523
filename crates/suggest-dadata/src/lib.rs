//! DaData suggestion kinds.
//!
//! This crate provides the concrete suggestion domains for the widget engine:
//! - Address suggestions with bound, language and location filters
//! - Bank suggestions keyed by BIC
//! - Person name (FIO) suggestions keyed by name parts
//! - An HTTP transport backed by reqwest

mod address;
mod bank;
mod fio;
mod http;

pub use address::{Address, AddressBound, AddressKind, Language};
pub use bank::{Bank, BankKind, BankName, BankState, BankStatus, BankType};
pub use fio::{Fio, FioKind, FioPart, Gender};
pub use http::HttpTransport;

pub const ADDRESS_URL: &str = "https://suggestions.dadata.ru/suggestions/api/4_1/rs/suggest/address";
pub const BANK_URL: &str = "https://suggestions.dadata.ru/suggestions/api/4_1/rs/suggest/bank";
pub const FIO_URL: &str = "https://suggestions.dadata.ru/suggestions/api/4_1/rs/suggest/fio";

/// Insert `value` into `payload` under `key` when present.
fn insert_opt<V: serde::Serialize>(
    payload: &mut serde_json::Value,
    key: &str,
    value: Option<&V>,
) {
    if let (Some(value), Some(map)) = (value, payload.as_object_mut()) {
        map.insert(key.to_string(), serde_json::json!(value));
    }
}
