//! Command handlers. Everything the user sees counts from 1.

use std::sync::Arc;

use cloud::{
    DocumentStore, LocalCache, TripSession, TripState, UploadOutcome, create_trip,
    current_trip, delete_trip, join_trip, list_trips, select_trip,
};
use engine::{
    DayItem, ExpenseDraft, InviteCode, Participants, Settlement, TripConfig, split_amounts,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
    cli::{
        Command, DayCommand, ExpenseAddArgs, ExpenseCommand, ItemAddArgs, ParticipantsCommand,
        TripCommand, TripNewArgs,
    },
    error::{AppError, Result},
    settings::Settings,
};

pub struct Context {
    pub settings: Settings,
    pub cache: LocalCache,
    pub remote: Arc<dyn DocumentStore>,
    /// `--trip`, taking precedence over the selected trip.
    pub trip: Option<String>,
}

impl Context {
    fn trip_id(&self) -> Result<String> {
        if let Some(id) = &self.trip {
            return Ok(id.clone());
        }
        current_trip(&self.cache)?
            .map(|meta| meta.id)
            .ok_or(AppError::NoTrip)
    }

    fn open(&self) -> Result<Arc<TripSession>> {
        let trip_id = self.trip_id()?;
        Ok(TripSession::open(
            &trip_id,
            self.cache.clone(),
            Arc::clone(&self.remote),
            self.settings.sync.debounce(),
        )?)
    }
}

/// Run `command`. The returned session, if any, may still hold a pending
/// upload.
pub async fn run(ctx: &Context, command: Command) -> Result<Option<Arc<TripSession>>> {
    match command {
        Command::Trip(trip) => {
            trip_command(ctx, trip.command).await?;
            Ok(None)
        }
        Command::Day(day) => {
            let session = ctx.open()?;
            day_command(&session, day.command).await?;
            Ok(Some(session))
        }
        Command::Expense(expense) => {
            let session = ctx.open()?;
            expense_command(&session, expense.command).await?;
            Ok(Some(session))
        }
        Command::Participants(participants) => {
            let session = ctx.open()?;
            match participants.command {
                ParticipantsCommand::Set { names } => {
                    let participants: Participants = names.parse()?;
                    if participants.is_empty() {
                        return Err(AppError::Usage("at least one participant".to_string()));
                    }
                    session.set_participants(participants.clone()).await?;
                    println!("participants: {participants}");
                }
            }
            Ok(Some(session))
        }
        Command::Settle => {
            let session = ctx.open()?;
            let state = session.snapshot().await;
            print_settlement(&state, &session.settle().await);
            Ok(None)
        }
        Command::Upload => {
            let session = ctx.open()?;
            match session.upload(CancellationToken::new()).await? {
                UploadOutcome::Completed => {
                    let state = session.snapshot().await;
                    if let Some(code) = &state.cloud.invite_code {
                        println!("uploaded; invite code {code}");
                    }
                }
                outcome => println!("upload {outcome:?}"),
            }
            Ok(None)
        }
        Command::Pull => {
            let session = ctx.open()?;
            session.pull().await?;
            print_trip(&session.snapshot().await);
            Ok(None)
        }
        Command::Join(args) => {
            let code: InviteCode = args.code.parse()?;
            let session = join_trip(
                &ctx.cache,
                Arc::clone(&ctx.remote),
                &code,
                ctx.settings.sync.debounce(),
            )
            .await?;
            print_trip(&session.snapshot().await);
            Ok(None)
        }
        Command::Watch => {
            let session = ctx.open()?;
            let shutdown = CancellationToken::new();
            let interrupt = shutdown.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    interrupt.cancel();
                }
            });
            debug!(trip = session.trip_id(), "waiting for ctrl-c");
            println!("watching {}; ctrl-c to stop", session.trip_id());
            session.watch(shutdown).await?;
            let state = session.snapshot().await;
            print_expenses(&state, false);
            Ok(Some(session))
        }
        Command::Invite => {
            let session = ctx.open()?;
            let state = session.snapshot().await;
            match &state.cloud.invite_code {
                Some(code) if state.cloud.active_trip_id().is_some() => println!("{code}"),
                _ => println!("not shared yet; run `tripmate upload`"),
            }
            Ok(None)
        }
    }
}

async fn trip_command(ctx: &Context, command: TripCommand) -> Result<()> {
    match command {
        TripCommand::New(args) => {
            let participants = match &args.participants {
                Some(names) => names.parse()?,
                None => ctx.settings.trip.participants(),
            };
            let meta = create_trip(&ctx.cache, trip_config(args), participants)?;
            println!("created {} ({})", meta.destination, meta.id);
        }
        TripCommand::List => {
            let index = list_trips(&ctx.cache)?;
            if index.trips.is_empty() {
                println!("no trips");
            }
            for meta in &index.trips {
                let marker = if index.last_selected.as_deref() == Some(meta.id.as_str()) {
                    "*"
                } else {
                    " "
                };
                let cloud = if meta.is_cloud_trip { " [shared]" } else { "" };
                println!(
                    "{marker} {}  {}  {} ({} days){cloud}",
                    meta.id, meta.destination, meta.start_date, meta.days_count
                );
            }
        }
        TripCommand::Use { id } => {
            let meta = select_trip(&ctx.cache, &id)?;
            println!("selected {}", meta.destination);
        }
        TripCommand::Rm { id } => {
            let meta = delete_trip(&ctx.cache, &id)?;
            println!("deleted {}", meta.destination);
        }
        TripCommand::Show => {
            let session = ctx.open()?;
            print_trip(&session.snapshot().await);
        }
    }
    Ok(())
}

fn trip_config(args: TripNewArgs) -> TripConfig {
    let defaults = TripConfig::default();
    TripConfig {
        title: args.title,
        start_date: args.start.unwrap_or(defaults.start_date),
        days: args.days.unwrap_or(defaults.days),
        rate: args.rate.unwrap_or(defaults.rate),
        currency: args.currency.unwrap_or(defaults.currency),
        ..defaults
    }
}

async fn day_command(session: &Arc<TripSession>, command: DayCommand) -> Result<()> {
    match command {
        DayCommand::Add => {
            let date = session
                .edit_itinerary(|itinerary| Ok(itinerary.add_day().date.clone()))
                .await?;
            println!("added {date}");
        }
        DayCommand::Rm { day } => {
            let day = position(day)?;
            let removed = session
                .edit_itinerary(|itinerary| itinerary.remove_day(day))
                .await?;
            println!("removed {}", removed.date);
        }
        DayCommand::ItemAdd(ItemAddArgs {
            day,
            activity,
            time,
            kind,
            location,
            note,
        }) => {
            let day = position(day)?;
            let mut item = DayItem::new(&time, kind.into(), &activity, &location);
            item.note = note;
            session
                .edit_itinerary(|itinerary| itinerary.add_item(day, item))
                .await?;
            println!("added {activity}");
        }
        DayCommand::ItemRm { day, item } => {
            let (day, item) = (position(day)?, position(item)?);
            let removed = session
                .edit_itinerary(|itinerary| itinerary.remove_item(day, item))
                .await?;
            println!("removed {}", removed.activity);
        }
        DayCommand::ItemUp { day, item } => {
            let (day, item) = (position(day)?, position(item)?);
            session
                .edit_itinerary(|itinerary| itinerary.move_item_up(day, item))
                .await?;
        }
        DayCommand::ItemDown { day, item } => {
            let (day, item) = (position(day)?, position(item)?);
            session
                .edit_itinerary(|itinerary| itinerary.move_item_down(day, item))
                .await?;
        }
        DayCommand::Divider {
            day,
            before,
            country,
            code,
        } => {
            let (day, before) = (position(day)?, position(before)?);
            session
                .edit_itinerary(|itinerary| {
                    itinerary.insert_country_divider(day, before, &country, &code)
                })
                .await?;
            println!("divider {country} added");
        }
    }
    Ok(())
}

async fn expense_command(session: &Arc<TripSession>, command: ExpenseCommand) -> Result<()> {
    match command {
        ExpenseCommand::Add(args) => {
            let personal = args.personal;
            let draft = expense_draft(args);
            let expense = if personal {
                session.add_personal_expense(draft).await?
            } else {
                session.add_expense(draft).await?
            };
            info!(item = %expense.item, amount = expense.amount, personal, "expense recorded");
            println!("added {} ({})", expense.item, expense.amount);
        }
        ExpenseCommand::Rm { number, personal } => {
            let index = position(number)?;
            let removed = if personal {
                session.remove_personal_expense(index).await?
            } else {
                session.remove_expense(index).await?
            };
            println!("removed {}", removed.item);
        }
        ExpenseCommand::List { personal } => {
            print_expenses(&session.snapshot().await, personal);
        }
    }
    Ok(())
}

fn expense_draft(args: ExpenseAddArgs) -> ExpenseDraft {
    ExpenseDraft {
        item: args.item,
        amount: args.amount,
        payer: args.payer,
        time: args.time,
        split_participants: args
            .split
            .map(|names| Participants::new(names.split(',')).names().to_vec())
            .unwrap_or_default(),
    }
}

/// 1-based user input to a 0-based index.
fn position(number: usize) -> Result<usize> {
    number
        .checked_sub(1)
        .ok_or_else(|| AppError::Usage("numbers start at 1".to_string()))
}

fn print_trip(state: &TripState) {
    println!(
        "{}  from {} ({} days)",
        state.config.display_title(),
        state.config.start_date,
        state.itinerary.len()
    );
    println!("participants: {}", state.participants);
    println!("currency: {} (rate {})", state.config.currency, state.config.rate);
    match (state.cloud.active_trip_id(), &state.cloud.invite_code) {
        (Some(remote), Some(code)) => {
            let synced = state
                .cloud
                .last_synced_at
                .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "never".to_string());
            println!("shared as {remote}, invite code {code}, last synced {synced}");
        }
        _ => println!("local only"),
    }
    for (number, day) in state.itinerary.days().iter().enumerate() {
        println!();
        println!("Day {}  {}  {}", number + 1, day.date, day.title);
        for (item_number, item) in day.items.iter().enumerate() {
            if item.is_divider() {
                println!(
                    "  {:>2}. ---- {} ----",
                    item_number + 1,
                    item.country.as_deref().unwrap_or_default()
                );
                continue;
            }
            println!(
                "  {:>2}. {:<5} {:?} {}  {}",
                item_number + 1,
                item.time,
                item.kind,
                item.activity,
                item.location
            );
        }
    }
}

fn print_expenses(state: &TripState, personal: bool) {
    let expenses = if personal {
        &state.personal_expenses
    } else {
        &state.expenses
    };
    if expenses.is_empty() {
        println!("no expenses");
        return;
    }
    for (number, expense) in expenses.iter().enumerate() {
        let home = expense.amount * state.config.rate;
        println!(
            "{:>3}. {}  {:.0} {} (~{home:.0})  paid by {}",
            number + 1,
            expense.item,
            expense.amount,
            state.config.currency,
            expense.payer
        );
        if personal {
            continue;
        }
        for split in split_amounts(expense, &state.participants) {
            let role = if split.person == expense.payer {
                "gets back"
            } else {
                "owes"
            };
            println!("       {} {role} {:.0}", split.person, split.amount);
        }
    }
}

fn print_settlement(state: &TripState, settlement: &Settlement) {
    println!("total {:.0} {}", settlement.total, state.config.currency);
    for person in state.participants.iter() {
        println!(
            "  {person}: paid {:.0}, share {:.0}",
            settlement.paid.get(person),
            settlement.owed.get(person)
        );
    }
    if settlement.transfers.is_empty() {
        println!("all settled");
    }
    for transfer in &settlement.transfers {
        println!("{} -> {}: {}", transfer.from, transfer.to, transfer.amount);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_start_at_one() {
        assert_eq!(position(1).unwrap(), 0);
        assert_eq!(position(3).unwrap(), 2);
        assert!(matches!(position(0), Err(AppError::Usage(_))));
    }

    #[test]
    fn split_option_is_trimmed() {
        let draft = expense_draft(ExpenseAddArgs {
            item: "Ramen".to_string(),
            amount: "1200".to_string(),
            payer: "Me".to_string(),
            time: None,
            split: Some(" Me , Buddy A,".to_string()),
            personal: false,
        });

        assert_eq!(draft.split_participants, ["Me", "Buddy A"]);
    }

    #[test]
    fn new_trip_keeps_defaults() {
        let config = trip_config(TripNewArgs {
            title: "Kyoto".to_string(),
            start: Some("2026-04-01".to_string()),
            days: None,
            currency: None,
            rate: Some(0.2),
            participants: None,
        });

        assert_eq!(config.title, "Kyoto");
        assert_eq!(config.start_date, "2026-04-01");
        assert_eq!(config.days, TripConfig::default().days);
        assert_eq!(config.currency, "JPY");
        assert_eq!(config.rate, 0.2);
    }
}
