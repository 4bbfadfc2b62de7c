mod cleanup;
mod list;
mod restart;
mod start;
mod stop;

pub use cleanup::cleanup;
pub use list::list;
pub use restart::restart;
pub use start::start;
pub use stop::stop;

use brew_services::manager::Outcome;
use brew_services::{KegRegistry, Launchctl, Manager, TokioClock};

pub type BrewManager = Manager<KegRegistry, Launchctl, TokioClock>;

/// Print each outcome; fail if any service failed
fn report(outcomes: &[Outcome], verb: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut failed = 0;
    for outcome in outcomes {
        match &outcome.result {
            Ok(()) => println!(
                "==> Successfully {} `{}` (label: {})",
                verb, outcome.name, outcome.label
            ),
            Err(e) => {
                eprintln!("Error: {}", e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(format!("{} of {} services failed", failed, outcomes.len()).into());
    }
    Ok(())
}
