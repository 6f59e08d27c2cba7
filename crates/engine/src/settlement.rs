//! Expense settlement.
//!
//! Turns the shared expenses of a trip into who paid what, who owes what and
//! a short list of transfers that evens everybody out.
//!
//! The transfer plan is a greedy heuristic: the largest debtor pays the
//! largest creditor until one of them is settled, then the next pair is
//! matched. It keeps the number of transfers low for the balance sets a trip
//! produces, but it is not guaranteed to be minimal.

use serde::Serialize;

use crate::{Expense, Participants};

/// Balances within this many currency units of zero are considered settled.
pub const SETTLEMENT_THRESHOLD: f64 = 1.0;

/// Per-person amounts, in first-seen order.
///
/// Trip participants come first (so they always appear, possibly with 0),
/// then any other name met while scanning the expenses.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PersonTotals(Vec<(String, f64)>);

impl PersonTotals {
    fn seeded(participants: &Participants) -> Self {
        Self(participants.iter().map(|p| (p.clone(), 0.0)).collect())
    }

    fn add(&mut self, name: &str, amount: f64) {
        match self.0.iter_mut().find(|(n, _)| n == name) {
            Some((_, total)) => *total += amount,
            None => self.0.push((name.to_string(), amount)),
        }
    }

    /// Amount for `name`, 0 when the name was never seen.
    pub fn get(&self, name: &str) -> f64 {
        self.0
            .iter()
            .find_map(|(n, total)| (n == name).then_some(*total))
            .unwrap_or(0.0)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|(n, _)| n == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(n, total)| (n.as_str(), *total))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A single payment of the settlement plan.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Transfer {
    pub from: String,
    pub to: String,
    /// Whole currency units, always positive.
    pub amount: i64,
}

/// Sum of every expense amount.
pub fn total_expense(expenses: &[Expense]) -> f64 {
    expenses.iter().map(|e| e.amount).sum()
}

/// How much each person paid out of pocket.
///
/// A payer missing from `participants` is still tracked.
pub fn paid_by_person(expenses: &[Expense], participants: &Participants) -> PersonTotals {
    let mut paid = PersonTotals::seeded(participants);
    for expense in expenses {
        paid.add(&expense.payer, expense.amount);
    }
    paid
}

/// How much of the total each person is responsible for.
///
/// Each expense is divided evenly across its effective split. An expense
/// whose effective split is empty is skipped.
pub fn owed_by_person(expenses: &[Expense], participants: &Participants) -> PersonTotals {
    let mut owed = PersonTotals::seeded(participants);
    for expense in expenses {
        let split = expense.effective_split(participants);
        if split.is_empty() {
            continue;
        }
        let share = expense.amount / split.len() as f64;
        for person in split {
            owed.add(person, share);
        }
    }
    owed
}

/// `paid - owed` for every participant, in participant order.
pub fn balances(
    paid: &PersonTotals,
    owed: &PersonTotals,
    participants: &Participants,
) -> Vec<(String, f64)> {
    participants
        .iter()
        .map(|p| (p.clone(), paid.get(p) - owed.get(p)))
        .collect()
}

/// Compute the transfers that settle every participant's balance.
pub fn settlement_plan(
    paid: &PersonTotals,
    owed: &PersonTotals,
    participants: &Participants,
) -> Vec<Transfer> {
    let all = balances(paid, owed, participants);

    let mut debtors: Vec<(String, f64)> = all
        .iter()
        .filter(|(_, val)| *val < -SETTLEMENT_THRESHOLD)
        .cloned()
        .collect();
    debtors.sort_by(|a, b| a.1.total_cmp(&b.1));

    let mut creditors: Vec<(String, f64)> = all
        .into_iter()
        .filter(|(_, val)| *val > SETTLEMENT_THRESHOLD)
        .collect();
    creditors.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut transfers = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < debtors.len() && j < creditors.len() {
        let amount = debtors[i].1.abs().min(creditors[j].1).round();
        if !amount.is_finite() {
            break;
        }
        if amount > 0.0 {
            transfers.push(Transfer {
                from: debtors[i].0.clone(),
                to: creditors[j].0.clone(),
                amount: amount as i64,
            });
        }
        debtors[i].1 += amount;
        creditors[j].1 -= amount;
        if debtors[i].1.abs() < SETTLEMENT_THRESHOLD {
            i += 1;
        }
        if creditors[j].1 < SETTLEMENT_THRESHOLD {
            j += 1;
        }
    }
    transfers
}

/// Everything the settlement view shows.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Settlement {
    pub total: f64,
    pub paid: PersonTotals,
    pub owed: PersonTotals,
    pub transfers: Vec<Transfer>,
}

/// Compute totals and the transfer plan in one go.
///
/// No transfers are proposed when nothing was spent.
pub fn settle(expenses: &[Expense], participants: &Participants) -> Settlement {
    let total = total_expense(expenses);
    let paid = paid_by_person(expenses, participants);
    let owed = owed_by_person(expenses, participants);
    let transfers = if total == 0.0 {
        Vec::new()
    } else {
        settlement_plan(&paid, &owed, participants)
    };
    Settlement {
        total,
        paid,
        owed,
        transfers,
    }
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng, rngs::StdRng};

    use super::*;

    fn expense(item: &str, amount: f64, payer: &str, split: &[&str]) -> Expense {
        Expense::new(
            item.to_string(),
            amount,
            payer.to_string(),
            split.iter().map(|s| s.to_string()).collect(),
        )
    }

    fn transfer(from: &str, to: &str, amount: i64) -> Transfer {
        Transfer {
            from: from.to_string(),
            to: to.to_string(),
            amount,
        }
    }

    /// Apply the plan to the balances and return what is left.
    fn residual(expenses: &[Expense], participants: &Participants) -> Vec<(String, f64)> {
        let settlement = settle(expenses, participants);
        let mut left = balances(&settlement.paid, &settlement.owed, participants);
        for t in &settlement.transfers {
            for (name, val) in left.iter_mut() {
                if *name == t.from {
                    *val += t.amount as f64;
                }
                if *name == t.to {
                    *val -= t.amount as f64;
                }
            }
        }
        left
    }

    #[test]
    fn dinner_for_two() {
        let participants = Participants::new(["A", "B"]);
        let expenses = vec![expense("Dinner", 300.0, "A", &["A", "B"])];

        let paid = paid_by_person(&expenses, &participants);
        let owed = owed_by_person(&expenses, &participants);

        assert_eq!(paid.get("A"), 300.0);
        assert_eq!(paid.get("B"), 0.0);
        assert_eq!(owed.get("A"), 150.0);
        assert_eq!(owed.get("B"), 150.0);
        assert_eq!(
            settlement_plan(&paid, &owed, &participants),
            vec![transfer("B", "A", 150)]
        );
    }

    #[test]
    fn one_creditor_many_debtors() {
        let participants = Participants::new(["A", "B", "C", "D"]);
        let expenses = vec![
            expense("Hotel", 400.0, "A", &[]),
            expense("Museum", 120.0, "B", &["A", "B", "C"]),
            expense("Train", 80.0, "C", &["C", "D"]),
        ];

        let settlement = settle(&expenses, &participants);

        assert_eq!(settlement.total, 600.0);
        assert_eq!(
            settlement.transfers,
            vec![
                transfer("D", "A", 140),
                transfer("C", "A", 100),
                transfer("B", "A", 20),
            ]
        );
    }

    #[test]
    fn one_debtor_many_creditors() {
        let participants = Participants::new(["A", "B", "C"]);
        let expenses = vec![
            expense("Car", 90.0, "A", &[]),
            expense("Fuel", 60.0, "B", &[]),
        ];

        let settlement = settle(&expenses, &participants);

        assert_eq!(
            settlement.transfers,
            vec![transfer("C", "A", 40), transfer("C", "B", 10)]
        );
        for (_, left) in residual(&expenses, &participants) {
            assert!(left.abs() < SETTLEMENT_THRESHOLD);
        }
    }

    #[test]
    fn uneven_shares_are_rounded() {
        let participants = Participants::new(["A", "B", "C"]);
        let expenses = vec![expense("Boat", 100.0, "A", &[])];

        let settlement = settle(&expenses, &participants);

        assert_eq!(
            settlement.transfers,
            vec![transfer("B", "A", 33), transfer("C", "A", 33)]
        );
        let positive: f64 = balances(&settlement.paid, &settlement.owed, &participants)
            .iter()
            .map(|(_, v)| v.max(0.0))
            .sum();
        let sent: i64 = settlement.transfers.iter().map(|t| t.amount).sum();
        assert!((positive - sent as f64).abs() < SETTLEMENT_THRESHOLD);
        for (_, left) in residual(&expenses, &participants) {
            assert!(left.abs() < SETTLEMENT_THRESHOLD);
        }
    }

    #[test]
    fn noise_below_threshold_is_ignored() {
        let participants = Participants::new(["A", "B"]);
        let expenses = vec![expense("Gum", 1.5, "A", &[])];

        assert!(settle(&expenses, &participants).transfers.is_empty());
    }

    #[test]
    fn nothing_spent_means_no_plan() {
        let participants = Participants::new(["A", "B"]);
        let settlement = settle(&[], &participants);

        assert!(settlement.transfers.is_empty());
        assert_eq!(settlement.paid.len(), 2);
        assert_eq!(settlement.paid.get("B"), 0.0);
    }

    #[test]
    fn unknown_payer_is_tracked() {
        let participants = Participants::new(["A", "B"]);
        let expenses = vec![expense("Tip", 10.0, "Zed", &["A", "B"])];

        let paid = paid_by_person(&expenses, &participants);
        assert!(paid.contains("Zed"));
        assert_eq!(paid.get("Zed"), 10.0);
        assert_eq!(
            paid.iter().map(|(n, _)| n).collect::<Vec<_>>(),
            ["A", "B", "Zed"]
        );
    }

    #[test]
    fn empty_split_without_participants_contributes_nothing() {
        let participants = Participants::default();
        let expenses = vec![expense("Snack", 8.0, "A", &[])];

        let owed = owed_by_person(&expenses, &participants);
        assert!(owed.is_empty());
    }

    #[test]
    fn nan_amount_propagates_without_transfers() {
        let participants = Participants::new(["A", "B"]);
        let expenses = vec![expense("Broken", f64::NAN, "A", &[])];

        let settlement = settle(&expenses, &participants);
        assert!(settlement.paid.get("A").is_nan());
        assert!(settlement.transfers.is_empty());
    }

    #[test]
    fn plan_is_deterministic() {
        let participants = Participants::new(["A", "B", "C", "D", "E"]);
        let mut rng = StdRng::seed_from_u64(7);
        let names = ["A", "B", "C", "D", "E"];

        for _ in 0..50 {
            let expenses: Vec<Expense> = (0..rng.random_range(1..12))
                .map(|n| {
                    let payer = names[rng.random_range(0..names.len())];
                    let split: Vec<&str> = names
                        .iter()
                        .copied()
                        .filter(|_| rng.random_bool(0.6))
                        .collect();
                    expense(
                        &format!("item {n}"),
                        rng.random_range(0..500) as f64,
                        payer,
                        &split,
                    )
                })
                .collect();

            let first = settle(&expenses, &participants);
            let second = settle(&expenses, &participants);
            assert_eq!(first.transfers, second.transfers);

            let all = balances(&first.paid, &first.owed, &participants);
            for t in &first.transfers {
                assert!(t.amount > 0);
                let from = all.iter().find(|(n, _)| *n == t.from).map(|(_, v)| *v);
                let to = all.iter().find(|(n, _)| *n == t.to).map(|(_, v)| *v);
                assert!(from.is_some_and(|v| v < -SETTLEMENT_THRESHOLD));
                assert!(to.is_some_and(|v| v > SETTLEMENT_THRESHOLD));
            }
        }
    }
}
