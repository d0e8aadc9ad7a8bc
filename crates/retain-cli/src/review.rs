//! Line-oriented review loop over a [`SessionManager`].

use std::io::{BufRead, Write};

use anyhow::Result;
use retain_core::{Catalog, CatalogItem, Phase, Rating, format_interval, now_unix_millis};
use retain_store::{SessionManager, SessionSummary, StoreError};

const QUIT: &str = "q";

/// Drive one session until the queue empties, the learner quits, or input ends.
pub fn run<R: BufRead, W: Write>(
    session: &mut SessionManager<'_>,
    deck: Option<String>,
    catalog: Option<&Catalog>,
    mut input: R,
    mut out: W,
) -> Result<()> {
    session.select_deck(deck)?;
    if !session.start_review(now_unix_millis())? {
        writeln!(out, "nothing due in {}", session.deck().unwrap_or("any deck"))?;
        return Ok(());
    }

    let summary = loop {
        let Some(card) = session.current().cloned() else {
            break session.summary();
        };
        let item = catalog.and_then(|c| c.find(&card.id));

        match session.phase() {
            Phase::Front => {
                let left = session.summary().remaining;
                writeln!(out)?;
                let front = item.map_or(card.id.as_str(), |i| i.front.as_str());
                writeln!(out, "[{left} left] {front}")?;
                write!(out, "enter to flip, q to quit > ")?;
                out.flush()?;

                match read_line(&mut input)? {
                    Some(line) if line != QUIT => session.flip()?,
                    _ => break session.abandon(),
                }
            }
            Phase::Back => {
                show_back(&mut out, item)?;
                if let Some(p) = session.preview(now_unix_millis()) {
                    writeln!(
                        out,
                        "0 again ({})  1 hard ({})  2 good ({})  3 easy ({})",
                        format_interval(p.again),
                        format_interval(p.hard),
                        format_interval(p.good),
                        format_interval(p.easy)
                    )?;
                }
                write!(out, "rating > ")?;
                out.flush()?;

                let line = match read_line(&mut input)? {
                    Some(line) if line != QUIT => line,
                    _ => break session.abandon(),
                };
                let rating = match line.parse::<Rating>() {
                    Ok(rating) => rating,
                    Err(e) => {
                        writeln!(out, "{e}")?;
                        continue;
                    }
                };
                match session.rate(rating, now_unix_millis()) {
                    Ok(outcome) => {
                        writeln!(out, "next review in {}", format_interval(outcome.interval_days))?
                    }
                    Err(StoreError::VersionConflict { .. }) => {
                        writeln!(out, "this card was changed elsewhere; rating discarded")?
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            Phase::DeckSelection | Phase::Dashboard => break session.summary(),
        }
    };

    write_summary(&mut out, &summary)?;
    Ok(())
}

fn show_back<W: Write>(out: &mut W, item: Option<&CatalogItem>) -> Result<()> {
    let Some(item) = item else {
        writeln!(out, "(no catalog entry)")?;
        return Ok(());
    };
    writeln!(out, "  = {}", item.back)?;
    if let Some(note) = &item.note {
        writeln!(out, "  note: {note}")?;
    }
    if let Some(example) = &item.example {
        writeln!(out, "  e.g. {example}")?;
    }
    Ok(())
}

fn write_summary<W: Write>(out: &mut W, summary: &SessionSummary) -> Result<()> {
    let t = summary.tally;
    writeln!(out)?;
    writeln!(
        out,
        "reviewed {} (again {}, hard {}, good {}, easy {}), {} left",
        summary.reviewed, t.again, t.hard, t.good, t.easy, summary.remaining
    )?;
    Ok(())
}

/// Next trimmed line, or `None` at end of input.
fn read_line<R: BufRead>(input: &mut R) -> Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}
