use crate::output::{self, OutputFormat};
use anyhow::Result;
use owo_colors::OwoColorize;
use redash_core::remote::UserRecord;
use redash_core::{QueryScope, QuerySession, QuerySummary};
use serde::Serialize;

#[derive(Serialize)]
struct QueryList {
    queries: Vec<QuerySummary>,
}

#[derive(Serialize)]
struct UserList {
    users: Vec<UserRecord>,
}

pub async fn queries(
    session: &QuerySession,
    scope: QueryScope,
    format: OutputFormat,
) -> Result<i32> {
    let queries = session.queries(scope).await?;

    if format.is_machine_readable() {
        output::print_success(format, QueryList { queries })?;
        return Ok(0);
    }

    if queries.is_empty() {
        println!("No saved queries.");
        return Ok(0);
    }
    for query in &queries {
        println!(
            "{} {} ({}, {})",
            format!("#{}", query.id).dimmed(),
            query.query_name.bold(),
            query.user_email.as_deref().unwrap_or("unknown owner"),
            query
                .data_source
                .as_deref()
                .unwrap_or("unknown data source")
                .cyan()
        );
        if let Some(sql) = query.query.as_deref().filter(|q| !q.is_empty()) {
            let first_line = sql.lines().next().unwrap_or_default();
            println!("    {}", first_line.dimmed());
        }
    }
    Ok(0)
}

pub async fn users(session: &QuerySession, format: OutputFormat) -> Result<i32> {
    let users = session.users().await?;

    if format.is_machine_readable() {
        output::print_success(format, UserList { users })?;
        return Ok(0);
    }

    for user in &users {
        let status = if user.is_disabled {
            "disabled".red().to_string()
        } else {
            "active".green().to_string()
        };
        println!(
            "{} {} <{}> {}",
            format!("#{}", user.id).dimmed(),
            user.name.bold(),
            user.email.as_deref().unwrap_or_default(),
            status
        );
    }
    Ok(0)
}
