use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use engine::ItemKind;

#[derive(Parser, Debug)]
#[command(name = "tripmate")]
#[command(about = "Plan a trip, split its costs and share it with the group")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Default, Clone)]
pub struct GlobalArgs {
    /// Optional config file path (TOML).
    #[arg(long, global = true)]
    pub config: Option<String>,
    /// Override the log level (e.g. debug).
    #[arg(long, global = true)]
    pub level: Option<String>,
    /// Override the local cache directory.
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,
    /// Override the remote database (`memory` or a SQLite path).
    #[arg(long, global = true)]
    pub database: Option<String>,
    /// Override the upload debounce, in milliseconds.
    #[arg(long, global = true)]
    pub debounce_ms: Option<u64>,
    /// Work on this trip instead of the selected one.
    #[arg(long, global = true)]
    pub trip: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create, list, select and delete trips.
    Trip(Trip),
    /// Edit the itinerary.
    Day(Day),
    /// Record, delete and list expenses.
    Expense(Expense),
    /// Manage who shares the costs.
    Participants(ParticipantsCmd),
    /// Show who owes whom.
    Settle,
    /// Push the trip to the remote, linking it on first use.
    Upload,
    /// Replace the local trip with its remote copy.
    Pull,
    /// Join a shared trip with its invite code.
    Join(JoinArgs),
    /// Follow the shared expenses of the trip until interrupted.
    Watch,
    /// Print the invite code of the trip.
    Invite,
}

#[derive(Args, Debug)]
pub struct Trip {
    #[command(subcommand)]
    pub command: TripCommand,
}

#[derive(Subcommand, Debug)]
pub enum TripCommand {
    New(TripNewArgs),
    List,
    Use { id: String },
    Rm { id: String },
    Show,
}

#[derive(Args, Debug)]
pub struct TripNewArgs {
    #[arg(long, default_value = "")]
    pub title: String,
    /// First day, YYYY-MM-DD. Defaults to today.
    #[arg(long)]
    pub start: Option<String>,
    #[arg(long)]
    pub days: Option<u32>,
    #[arg(long)]
    pub currency: Option<String>,
    /// Local currency to home currency rate.
    #[arg(long)]
    pub rate: Option<f64>,
    /// Comma-separated names; defaults to `trip.participants`.
    #[arg(long)]
    pub participants: Option<String>,
}

#[derive(Args, Debug)]
pub struct Day {
    #[command(subcommand)]
    pub command: DayCommand,
}

/// Days and items are numbered from 1.
#[derive(Subcommand, Debug)]
pub enum DayCommand {
    Add,
    Rm {
        day: usize,
    },
    ItemAdd(ItemAddArgs),
    ItemRm {
        day: usize,
        item: usize,
    },
    ItemUp {
        day: usize,
        item: usize,
    },
    ItemDown {
        day: usize,
        item: usize,
    },
    /// Insert a country divider before an item.
    Divider {
        day: usize,
        before: usize,
        country: String,
        #[arg(long, default_value = "")]
        code: String,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ItemKindArg {
    Spot,
    Food,
    Shop,
    Transport,
    Flight,
}

impl From<ItemKindArg> for ItemKind {
    fn from(kind: ItemKindArg) -> Self {
        match kind {
            ItemKindArg::Spot => ItemKind::Spot,
            ItemKindArg::Food => ItemKind::Food,
            ItemKindArg::Shop => ItemKind::Shop,
            ItemKindArg::Transport => ItemKind::Transport,
            ItemKindArg::Flight => ItemKind::Flight,
        }
    }
}

#[derive(Args, Debug)]
pub struct ItemAddArgs {
    pub day: usize,
    pub activity: String,
    #[arg(long, default_value = "")]
    pub time: String,
    #[arg(long, value_enum, default_value = "spot")]
    pub kind: ItemKindArg,
    #[arg(long, default_value = "")]
    pub location: String,
    #[arg(long, default_value = "")]
    pub note: String,
}

#[derive(Args, Debug)]
pub struct Expense {
    #[command(subcommand)]
    pub command: ExpenseCommand,
}

#[derive(Subcommand, Debug)]
pub enum ExpenseCommand {
    Add(ExpenseAddArgs),
    Rm {
        /// Position in `expense list`, from 1.
        number: usize,
        #[arg(long)]
        personal: bool,
    },
    List {
        #[arg(long)]
        personal: bool,
    },
}

#[derive(Args, Debug)]
pub struct ExpenseAddArgs {
    pub item: String,
    pub amount: String,
    #[arg(long, default_value = "")]
    pub payer: String,
    /// When it happened, YYYY-MM-DDTHH:MM.
    #[arg(long)]
    pub time: Option<String>,
    /// Comma-separated names sharing the cost; everybody when omitted.
    #[arg(long)]
    pub split: Option<String>,
    #[arg(long)]
    pub personal: bool,
}

#[derive(Args, Debug)]
pub struct ParticipantsCmd {
    #[command(subcommand)]
    pub command: ParticipantsCommand,
}

#[derive(Subcommand, Debug)]
pub enum ParticipantsCommand {
    /// Replace the participants, e.g. `participants set "Me, Buddy A"`.
    Set { names: String },
}

#[derive(Args, Debug)]
pub struct JoinArgs {
    pub code: String,
}
