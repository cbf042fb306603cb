//! `query`, `paginate` and `show-query` commands.
//!
//! Both install a Ctrl-C watcher that cancels the in-flight job; `query`
//! reports the cancellation as an outcome, `paginate` surfaces it as an error
//! from the cursor.

use crate::exit_codes;
use crate::output::{self, OutputFormat, RowSet};
use anyhow::Result;
use owo_colors::OwoColorize;
use redash_common::models::Dialect;
use redash_core::remote::ResultPayload;
use redash_core::{CancelHandle, Outcome, QuerySession, RowCursor};
use tokio::task::JoinHandle;

/// Every Ctrl-C until the command returns requests a cancel; installing the
/// handler replaces the default SIGINT exit for the rest of the process.
fn cancel_on_ctrl_c(handle: CancelHandle) -> JoinHandle<()> {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, cancelling query");
            handle.cancel();
        }
    })
}

pub async fn query(session: &QuerySession, sql: &str, format: OutputFormat) -> Result<i32> {
    let watcher = cancel_on_ctrl_c(session.cancel_handle());
    let outcome = session.execute_and_wait(sql).await;
    watcher.abort();

    let payload = match outcome? {
        Outcome::Completed(payload) => payload,
        Outcome::Cancelled => {
            if format.is_machine_readable() {
                output::print_error(format, "Query cancelled", exit_codes::CANCELLED)?;
            } else {
                eprintln!("{}", "Query cancelled".yellow());
            }
            return Ok(exit_codes::CANCELLED);
        }
    };

    print_payload(session, payload, format)
}

/// Print the stored result of a saved query or result id.
pub async fn show_query(session: &QuerySession, id: i64, format: OutputFormat) -> Result<i32> {
    let payload = session.show_query(id).await?;
    print_payload(session, payload, format)
}

fn print_payload(
    session: &QuerySession,
    payload: ResultPayload,
    format: OutputFormat,
) -> Result<i32> {
    let mut page = session.materialize(payload);
    let mut rows = RowSet::for_page(&page);
    let human = !format.is_machine_readable();
    if human {
        output::print_header(&rows.columns);
    }
    while page.advance() {
        let values = page.values()?;
        if human {
            output::print_row(&values);
        }
        rows.push(values);
    }

    if human {
        println!("{}", format!("({} rows)", rows.row_count).dimmed());
    } else {
        output::print_success(format, &rows)?;
    }
    Ok(0)
}

pub async fn paginate(
    session: &QuerySession,
    sql: &str,
    cursor: Option<&str>,
    dialect: Option<Dialect>,
    format: OutputFormat,
) -> Result<i32> {
    let watcher = cancel_on_ctrl_c(session.cancel_handle());
    let result = stream(session, sql, cursor, dialect, format).await;
    watcher.abort();
    result
}

async fn stream(
    session: &QuerySession,
    sql: &str,
    cursor: Option<&str>,
    dialect: Option<Dialect>,
    format: OutputFormat,
) -> Result<i32> {
    let dialect = dialect.unwrap_or_else(|| session.dialect());
    let mut pager = session.open_paginated(sql, cursor, dialect).await?;
    if cursor.is_none() {
        tracing::warn!("No cursor column given, pages after the first are not ordered");
    }

    let human = !format.is_machine_readable();
    let mut rows = RowSet::for_page(pager.current());
    if human {
        output::print_header(&rows.columns);
    }

    while pager.advance().await? {
        let values = pager.current().values()?;
        if human {
            output::print_row(&values);
            rows.row_count += 1;
        } else {
            rows.push(values);
        }
    }

    if human {
        println!(
            "{}",
            format!("({} rows, {} pages)", rows.row_count, pager.fetches()).dimmed()
        );
    } else {
        output::print_success(format, &rows)?;
    }
    Ok(0)
}
