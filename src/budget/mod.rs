//! Monthly spend guard for budget-metered backends.

pub mod clock;
mod cost;
mod guard;

pub use clock::{Clock, ManualClock, SystemClock, month_key, month_start};
pub use cost::{CostSource, CostSourceError, OpenAiCostSource};
pub use guard::{BudgetConfig, BudgetGuard, BudgetStatus};
