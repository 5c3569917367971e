//! Human-readable rendering of a send attempt.

use std::fmt::Display;
use std::io::{self, Write};

use pushover::{NotificationError, Sent};

/// e.g. Mar 1, 2014 at 6:00am (UTC)
const RESET_FORMAT: &str = "%b %-d, %Y at %-I:%M%P (UTC)";

fn or_unknown<T: Display>(v: Option<T>) -> String {
    v.map_or_else(|| "?".to_string(), |v| v.to_string())
}

pub(crate) fn success<W: Write>(out: &mut W, sent: &Sent, verbose: bool) -> io::Result<()> {
    writeln!(out, "Success")?;
    if !verbose {
        return Ok(());
    }

    let quota = sent.quota.as_ref();
    let reset_at = quota
        .and_then(|q| q.reset_at)
        .map(|t| t.format(RESET_FORMAT));
    writeln!(out, "Request id: {}", sent.request)?;
    writeln!(out, "Message limit: {}", or_unknown(quota.map(|q| q.limit)))?;
    writeln!(
        out,
        "Remaining Messages: {}",
        or_unknown(quota.map(|q| q.remaining))
    )?;
    writeln!(out, "Message limit resets on: {}", or_unknown(reset_at))?;
    Ok(())
}

pub(crate) fn failure<W: Write>(out: &mut W, err: &NotificationError) -> io::Result<()> {
    match err {
        NotificationError::Client { errors, .. } if !errors.is_empty() => {
            for e in errors {
                writeln!(out, "Fail: {e}")?;
            }
        }
        NotificationError::Server { reason, .. } => writeln!(out, "{reason}")?,
        e => writeln!(out, "Fail: {e}")?,
    }
    Ok(())
}
