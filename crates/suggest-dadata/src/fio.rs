//! Person name (surname, name, patronymic) suggestions.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use suggest_core::Suggestion;
use suggest_engine::SuggestionKind;

use crate::{insert_opt, FIO_URL};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    Male,
    Female,
    Unknown,
}

/// Name part to suggest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FioPart {
    Surname,
    Name,
    Patronymic,
}

#[derive(Debug, Clone, Default)]
pub struct FioKind {
    pub gender: Option<Vec<Gender>>,
    pub parts: Option<Vec<FioPart>>,
}

impl FioKind {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SuggestionKind for FioKind {
    type Data = Fio;

    fn default_endpoint(&self) -> &str {
        FIO_URL
    }

    fn payload(&self, query: &str, count: usize) -> Value {
        let mut payload = json!({ "query": query, "count": count });
        insert_opt(&mut payload, "gender", self.gender.as_ref());
        insert_opt(&mut payload, "parts", self.parts.as_ref());
        payload
    }

    fn suggestion_key(&self, suggestion: &Suggestion<Fio>) -> String {
        let data = &suggestion.data;
        format!(
            "name:{}surname:{}patronymic:{}",
            data.name.as_deref().unwrap_or_default(),
            data.surname.as_deref().unwrap_or_default(),
            data.patronymic.as_deref().unwrap_or_default(),
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Fio {
    pub surname: Option<String>,
    pub name: Option<String>,
    pub patronymic: Option<String>,
    pub gender: Option<Gender>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_filters() {
        let kind = FioKind {
            gender: Some(vec![Gender::Female]),
            parts: Some(vec![FioPart::Name]),
        };
        assert_eq!(
            kind.payload("Ан", 10),
            json!({"query": "Ан", "count": 10, "gender": ["FEMALE"], "parts": ["NAME"]})
        );
    }

    #[test]
    fn test_key_from_parts() {
        let kind = FioKind::new();
        let fio = Fio {
            surname: Some("Иванова".to_string()),
            name: Some("Анна".to_string()),
            ..Default::default()
        };
        let s = Suggestion::new("Иванова Анна", fio);
        assert_eq!(
            kind.suggestion_key(&s),
            "name:Аннаsurname:Ивановаpatronymic:"
        );
    }

    #[test]
    fn test_same_value_different_parts_differ() {
        let kind = FioKind::new();
        let as_name = Suggestion::new(
            "Александр",
            Fio {
                name: Some("Александр".to_string()),
                ..Default::default()
            },
        );
        let as_surname = Suggestion::new(
            "Александр",
            Fio {
                surname: Some("Александр".to_string()),
                ..Default::default()
            },
        );
        assert_ne!(kind.suggestion_key(&as_name), kind.suggestion_key(&as_surname));
    }

    #[test]
    fn test_decode() {
        let fio: Fio = serde_json::from_value(json!({
            "surname": null, "name": "Анна", "patronymic": null,
            "gender": "FEMALE", "qc": "0", "source": null
        }))
        .unwrap();
        assert_eq!(fio.gender, Some(Gender::Female));
        assert_eq!(fio.extra["qc"], "0");
    }
}
