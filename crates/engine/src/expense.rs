//! The module contains the `Expense` type, a single shared (or personal)
//! cost recorded during a trip.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{EngineError, Participants, ResultEngine};

/// Payer name (and key suffix) used by personal-mode expenses.
pub const PERSONAL_PAYER: &str = "personal";

/// A recorded cost.
///
/// `order` is the record identity: it is generated once when the expense is
/// created and never changes, so local and remote copies can be matched
/// regardless of their position. A record may come without one; see
/// [`Expense::key`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub item: String,
    pub amount: f64,
    pub payer: String,
    #[serde(default)]
    pub order: Option<String>,
    /// Who shares this cost. Empty means "everybody", resolved at read time.
    #[serde(default)]
    pub split_participants: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

impl Expense {
    pub fn new(item: String, amount: f64, payer: String, split_participants: Vec<String>) -> Self {
        let order = order_key(Utc::now().timestamp_millis(), &payer);
        Self {
            item,
            amount,
            payer,
            order: Some(order),
            split_participants,
            time: None,
        }
    }

    /// The matching key, `None` when the record has no usable `order`.
    pub fn key(&self) -> Option<&str> {
        self.order.as_deref().filter(|order| !order.is_empty())
    }

    /// The participants this expense is divided among: its own split when
    /// non-empty, the whole trip otherwise.
    pub fn effective_split<'a>(&'a self, participants: &'a Participants) -> &'a [String] {
        if self.split_participants.is_empty() {
            participants.names()
        } else {
            &self.split_participants
        }
    }

    /// Fill an empty split with the current participants.
    ///
    /// Only meant for in-memory copies (merge input, freshly pulled data);
    /// the default is not a stored fact.
    pub fn with_default_split(mut self, participants: &Participants) -> Self {
        if self.split_participants.is_empty() {
            self.split_participants = participants.names().to_vec();
        }
        self
    }

    /// Whether the fields a merge cares about are equal.
    ///
    /// The split is compared as an ordered list, so `[A, B]` and `[B, A]`
    /// differ.
    pub fn same_content(&self, other: &Expense) -> bool {
        self.item == other.item
            && self.amount == other.amount
            && self.payer == other.payer
            && self.split_participants == other.split_participants
    }
}

/// Build an `order` key from a millisecond timestamp and the payer.
///
/// An empty payer becomes `unknown`.
pub fn order_key(millis: i64, payer: &str) -> String {
    let payer = if payer.is_empty() { "unknown" } else { payer };
    format!("{millis}_{payer}")
}

/// Render a `YYYY-MM-DDTHH:MM` timestamp as the `YYYY-MM-DD HH:MM→` prefix put
/// in front of an expense item.
pub fn format_expense_time(time: &str) -> String {
    if time.is_empty() {
        return String::new();
    }
    format!("{}→", time.replace('T', " "))
}

/// Whether an expense belongs to the shared split or to the personal log.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ExpenseMode {
    #[default]
    Shared,
    Personal,
}

/// Raw user input for a new expense.
#[derive(Clone, Debug, Default)]
pub struct ExpenseDraft {
    pub item: String,
    /// Amount as typed; blank means 0.
    pub amount: String,
    pub payer: String,
    pub time: Option<String>,
    pub split_participants: Vec<String>,
}

impl ExpenseDraft {
    /// Validate the draft and turn it into an [`Expense`] with a fresh key.
    pub fn into_expense(
        self,
        mode: ExpenseMode,
        participants: &Participants,
    ) -> ResultEngine<Expense> {
        self.into_expense_at(mode, participants, Utc::now().timestamp_millis())
    }

    pub(crate) fn into_expense_at(
        self,
        mode: ExpenseMode,
        participants: &Participants,
        millis: i64,
    ) -> ResultEngine<Expense> {
        let item = self.item.trim();
        if item.is_empty() {
            return Err(EngineError::EmptyItem);
        }
        let amount = parse_amount(&self.amount)?;

        let (payer, split_participants) = match mode {
            ExpenseMode::Personal => (PERSONAL_PAYER.to_string(), Vec::new()),
            ExpenseMode::Shared => {
                let payer = match self.payer.trim() {
                    "" => "payer".to_string(),
                    payer => payer.to_string(),
                };
                let split = if self.split_participants.is_empty() {
                    participants.names().to_vec()
                } else {
                    self.split_participants
                };
                (payer, split)
            }
        };

        let time = self
            .time
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        let item = match &time {
            Some(time) => format!("{}{item}", format_expense_time(time)),
            None => item.to_string(),
        };

        Ok(Expense {
            item,
            amount,
            order: Some(order_key(millis, &payer)),
            payer,
            split_participants,
            time,
        })
    }
}

fn parse_amount(raw: &str) -> ResultEngine<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(0.0);
    }
    let amount: f64 = raw
        .replace(',', ".")
        .parse()
        .map_err(|_| EngineError::InvalidAmount(format!("\"{raw}\" is not a number")))?;
    if !amount.is_finite() || amount < 0.0 {
        return Err(EngineError::InvalidAmount(format!(
            "\"{raw}\" must be a non-negative number"
        )));
    }
    Ok(amount)
}

/// One participant's position on a single expense.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExpenseSplit {
    pub person: String,
    /// For the payer: what the others owe back. For everybody else: their
    /// share.
    pub amount: f64,
}

/// Break a single expense down per split member.
pub fn split_amounts(expense: &Expense, participants: &Participants) -> Vec<ExpenseSplit> {
    let split = expense.effective_split(participants);
    if split.is_empty() {
        return Vec::new();
    }
    let share = expense.amount / split.len() as f64;
    split
        .iter()
        .map(|person| ExpenseSplit {
            person: person.clone(),
            amount: if *person == expense.payer {
                expense.amount - share
            } else {
                share
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn participants() -> Participants {
        Participants::new(["Anna", "Bruno", "Carla"])
    }

    fn draft(item: &str, amount: &str, payer: &str) -> ExpenseDraft {
        ExpenseDraft {
            item: item.to_string(),
            amount: amount.to_string(),
            payer: payer.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn shared_draft_defaults_split_to_everybody() {
        let expense = draft("Taxi", "30", "Anna")
            .into_expense_at(ExpenseMode::Shared, &participants(), 1_700_000_000_000)
            .unwrap();

        assert_eq!(expense.order.as_deref(), Some("1700000000000_Anna"));
        assert_eq!(expense.split_participants, ["Anna", "Bruno", "Carla"]);
        assert_eq!(expense.amount, 30.0);
    }

    #[test]
    fn personal_draft_has_no_split() {
        let expense = draft("Souvenir", "12.5", "Anna")
            .into_expense_at(ExpenseMode::Personal, &participants(), 42)
            .unwrap();

        assert_eq!(expense.payer, PERSONAL_PAYER);
        assert_eq!(expense.order.as_deref(), Some("42_personal"));
        assert!(expense.split_participants.is_empty());
    }

    #[test]
    fn draft_time_prefixes_item() {
        let mut d = draft("Ramen", "", "Bruno");
        d.time = Some("2025-04-01T19:30".to_string());
        let expense = d
            .into_expense_at(ExpenseMode::Shared, &participants(), 1)
            .unwrap();

        assert_eq!(expense.item, "2025-04-01 19:30→Ramen");
        assert_eq!(expense.amount, 0.0);
        assert_eq!(expense.time.as_deref(), Some("2025-04-01T19:30"));
    }

    #[test]
    fn draft_rejects_bad_input() {
        assert_eq!(
            draft("  ", "1", "Anna").into_expense_at(ExpenseMode::Shared, &participants(), 1),
            Err(EngineError::EmptyItem)
        );
        assert!(matches!(
            draft("Bus", "abc", "Anna").into_expense_at(ExpenseMode::Shared, &participants(), 1),
            Err(EngineError::InvalidAmount(_))
        ));
        assert!(matches!(
            draft("Bus", "-3", "Anna").into_expense_at(ExpenseMode::Shared, &participants(), 1),
            Err(EngineError::InvalidAmount(_))
        ));
    }

    #[test]
    fn key_ignores_empty_order() {
        let mut expense = Expense::new("Tea".into(), 5.0, "Anna".into(), Vec::new());
        assert!(expense.key().is_some());
        expense.order = Some(String::new());
        assert_eq!(expense.key(), None);
        expense.order = None;
        assert_eq!(expense.key(), None);
    }

    #[test]
    fn order_key_falls_back_to_unknown() {
        assert_eq!(order_key(7, ""), "7_unknown");
        assert_eq!(order_key(7, "Bruno"), "7_Bruno");
    }

    #[test]
    fn deserializes_legacy_record_without_split_or_order() {
        let expense: Expense =
            serde_json::from_str(r#"{"item":"Dinner","amount":300,"payer":"A","order":null}"#)
                .unwrap();
        assert_eq!(expense.key(), None);
        assert!(expense.split_participants.is_empty());
    }

    #[test]
    fn split_amounts_from_payer_point_of_view() {
        let expense = Expense::new(
            "Hotel".into(),
            300.0,
            "Anna".into(),
            vec!["Anna".into(), "Bruno".into()],
        );
        let splits = split_amounts(&expense, &participants());

        assert_eq!(
            splits,
            vec![
                ExpenseSplit {
                    person: "Anna".into(),
                    amount: 150.0
                },
                ExpenseSplit {
                    person: "Bruno".into(),
                    amount: 150.0
                },
            ]
        );
    }

    #[test]
    fn split_amounts_empty_without_participants() {
        let expense = Expense::new("Hotel".into(), 300.0, "Anna".into(), Vec::new());
        assert!(split_amounts(&expense, &Participants::default()).is_empty());
    }
}
