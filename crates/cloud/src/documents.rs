//! Shapes of the documents stored remotely and their conversion from and to
//! the engine types.

use engine::{Day, Expense, InviteCode, Participants, TripConfig};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{CloudError, ResultCloud};

/// A stored document: its key within the collection and its JSON body.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub key: String,
    pub body: serde_json::Value,
}

impl Document {
    pub fn encode<T: Serialize>(key: &str, value: &T) -> ResultCloud<Self> {
        Ok(Self {
            key: key.to_string(),
            body: serde_json::to_value(value)?,
        })
    }

    pub fn decode<T: DeserializeOwned>(&self) -> ResultCloud<T> {
        serde_json::from_value(self.body.clone()).map_err(|err| CloudError::Malformed {
            key: self.key.clone(),
            reason: err.to_string(),
        })
    }
}

/// Remote shape of an expense. The payer is stored as `payerName`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseDocument {
    pub item: String,
    pub amount: f64,
    #[serde(default)]
    pub payer_name: String,
    #[serde(default)]
    pub order: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub split_participants: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

impl ExpenseDocument {
    /// Shared expenses are written with an explicit split: an empty one is
    /// filled with the current participants.
    pub fn shared(expense: &Expense, participants: &Participants) -> Self {
        let mut document = Self::from(expense);
        document.split_participants = expense.effective_split(participants).to_vec();
        document
    }

    /// Personal expenses carry no split at all.
    pub fn personal(expense: &Expense) -> Self {
        let mut document = Self::from(expense);
        document.split_participants.clear();
        document
    }
}

impl From<&Expense> for ExpenseDocument {
    fn from(expense: &Expense) -> Self {
        Self {
            item: expense.item.clone(),
            amount: expense.amount,
            payer_name: expense.payer.clone(),
            order: expense.order.clone(),
            split_participants: expense.split_participants.clone(),
            time: expense.time.clone(),
        }
    }
}

impl From<ExpenseDocument> for Expense {
    fn from(document: ExpenseDocument) -> Self {
        Self {
            item: document.item,
            amount: document.amount,
            payer: document.payer_name,
            order: document.order.filter(|order| !order.is_empty()),
            split_participants: document.split_participants,
            time: document.time,
        }
    }
}

/// Decode every document of an expense collection.
///
/// One malformed document fails the whole read, so a caller never merges a
/// partial view of the remote.
pub fn decode_expenses(documents: &[Document]) -> ResultCloud<Vec<Expense>> {
    documents
        .iter()
        .map(|document| document.decode::<ExpenseDocument>().map(Expense::from))
        .collect()
}

/// Decode a days collection, sorted by the stored position.
pub fn decode_days(documents: &[Document]) -> ResultCloud<Vec<Day>> {
    let mut days = documents
        .iter()
        .map(Document::decode::<Day>)
        .collect::<ResultCloud<Vec<_>>>()?;
    days.sort_by_key(|day| day.order.unwrap_or(0));
    Ok(days)
}

/// Key of the document holding the day at `index`.
pub fn day_key(index: usize) -> String {
    format!("day-{index:03}")
}

/// Settings part of the trip document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteTripConfig {
    pub currency: String,
    pub rate: f64,
    pub lang_code: String,
    pub lang_name: String,
}

/// The `trips/{id}` document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripDocument {
    pub title: String,
    pub destination: String,
    pub start_date: String,
    pub days_count: u32,
    pub invite_code: InviteCode,
    /// Comma-separated, as stored locally.
    pub participants: String,
    pub config: RemoteTripConfig,
}

impl TripDocument {
    pub fn new(
        config: &TripConfig,
        days_count: usize,
        participants: &Participants,
        invite_code: InviteCode,
    ) -> Self {
        Self {
            title: config.title.clone(),
            destination: config.display_title().to_string(),
            start_date: config.start_date.clone(),
            days_count: u32::try_from(days_count).unwrap_or(u32::MAX),
            invite_code,
            participants: participants.to_string(),
            config: RemoteTripConfig {
                currency: config.currency.clone(),
                rate: config.rate,
                lang_code: config.lang_code.clone(),
                lang_name: config.lang_name.clone(),
            },
        }
    }

    pub fn participants(&self) -> Participants {
        Participants::new(self.participants.split(','))
    }

    /// Overwrite the remote-owned settings of `config`.
    pub fn apply_to(&self, config: &mut TripConfig) {
        config.title = self.title.clone();
        if !self.start_date.is_empty() {
            config.start_date = self.start_date.clone();
        }
        if self.days_count > 0 {
            config.days = self.days_count;
        }
        config.currency = self.config.currency.clone();
        config.rate = self.config.rate;
        config.lang_code = self.config.lang_code.clone();
        config.lang_name = self.config.lang_name.clone();
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn expense_document_uses_payer_name() {
        let expense = Expense {
            item: "Taxi".to_string(),
            amount: 42.0,
            payer: "A".to_string(),
            order: Some("1_A".to_string()),
            split_participants: vec![],
            time: None,
        };
        let participants = Participants::new(["A", "B"]);
        let document = Document::encode("1_A", &ExpenseDocument::shared(&expense, &participants))
            .unwrap();

        assert_eq!(
            document.body,
            json!({
                "item": "Taxi",
                "amount": 42.0,
                "payerName": "A",
                "order": "1_A",
                "splitParticipants": ["A", "B"],
            })
        );
    }

    #[test]
    fn missing_fields_decode_as_key_less_record() {
        let document = Document {
            key: "x".to_string(),
            body: json!({ "item": "Snacks", "amount": 5, "payerName": "B", "order": "" }),
        };
        let expenses = decode_expenses(&[document]).unwrap();

        assert_eq!(expenses[0].payer, "B");
        assert_eq!(expenses[0].key(), None);
        assert!(expenses[0].split_participants.is_empty());
    }

    #[test]
    fn malformed_document_fails_the_read() {
        let good = Document {
            key: "a".to_string(),
            body: json!({ "item": "Tea", "amount": 3, "payerName": "A", "order": "a" }),
        };
        let bad = Document {
            key: "b".to_string(),
            body: json!({ "item": "Tea", "amount": "three" }),
        };

        let err = decode_expenses(&[good, bad]).unwrap_err();
        assert!(matches!(err, CloudError::Malformed { key, .. } if key == "b"));
    }

    #[test]
    fn days_sorted_by_stored_order() {
        let first = Day {
            title: "first".to_string(),
            order: Some(0),
            ..Day::default()
        };
        let second = Day {
            title: "second".to_string(),
            order: Some(1),
            ..Day::default()
        };
        let documents = vec![
            Document::encode(&day_key(1), &second).unwrap(),
            Document::encode(&day_key(0), &first).unwrap(),
        ];

        let days = decode_days(&documents).unwrap();
        assert_eq!(days[0].title, "first");
        assert_eq!(days[1].title, "second");
    }

    #[test]
    fn trip_document_round_trips_settings() {
        let config = TripConfig {
            title: "Kyoto".to_string(),
            start_date: "2026-04-01".to_string(),
            days: 3,
            rate: 0.2,
            ..TripConfig::default()
        };
        let code: InviteCode = "ABCDEF".parse().unwrap();
        let document = TripDocument::new(&config, 3, &Participants::new(["A", "B"]), code);

        let mut local = TripConfig::default();
        document.apply_to(&mut local);
        assert_eq!(local.title, "Kyoto");
        assert_eq!(local.start_date, "2026-04-01");
        assert_eq!(local.days, 3);
        assert_eq!(local.rate, 0.2);
        assert_eq!(document.participants().names(), ["A", "B"]);
    }
}
