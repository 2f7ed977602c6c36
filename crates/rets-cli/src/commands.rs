//! Subcommand handlers
//!
//! Every command runs inside one session: login, the transaction, logout.

use crate::args::{Command, ConnectionArgs};
use crate::output::{ObjectSummary, transaction_json, write_object};
use anyhow::{Context, Result};
use rets_client::{ObjectRequest, RetsClient, SearchRequest};
use serde_json::{Value, json};
use std::fs;
use tracing::{debug, info};

/// Run `command` against the server described by `connection`
pub async fn run(connection: &ConnectionArgs, command: Command) -> Result<Value> {
    let config = connection.to_config()?;
    let client = RetsClient::new(config).context("failed to create RETS client")?;
    let (username, password) = (connection.username.as_str(), connection.password.as_str());

    match command {
        Command::Login => {
            let transaction = client
                .with_session(username, password, |login| async move { Ok(login) })
                .await?;
            Ok(transaction_json(&transaction))
        }

        Command::Metadata { metadata_type, id } => {
            let transaction = client
                .with_session(username, password, |_| {
                    client.get_metadata(&metadata_type, &id)
                })
                .await?;
            Ok(transaction_json(&transaction))
        }

        Command::Search {
            resource,
            class,
            query,
            select,
            limit,
            params,
        } => {
            let mut request = SearchRequest::new(resource, class, query);
            if let Some(select) = select {
                request = request.select(select.split(',').map(str::trim));
            }
            if let Some(limit) = limit {
                request = request.limit(limit);
            }
            for (name, value) in params {
                request = request.with_option(name, value);
            }

            let transaction = client
                .with_session(username, password, |_| client.search(&request))
                .await?;
            if let Some(table) = transaction.table() {
                info!("Search returned {} rows", table.len());
            }
            Ok(transaction_json(&transaction))
        }

        Command::Object {
            resource,
            object_type,
            id,
            location,
            output_dir,
        } => {
            let request = ObjectRequest::new(resource, object_type, id).with_location(location);
            let objects = client
                .with_session(username, password, |_| client.get_object(&request))
                .await?;
            info!("Retrieved {} objects", objects.len());

            if let Some(dir) = &output_dir {
                fs::create_dir_all(dir)
                    .with_context(|| format!("failed to create {}", dir.display()))?;
            }

            let mut summaries = Vec::with_capacity(objects.len());
            for (index, object) in objects.iter().enumerate() {
                let path = match &output_dir {
                    Some(dir) if !object.data().is_empty() => {
                        let path = write_object(dir, object, index)
                            .with_context(|| format!("failed to write object {index}"))?;
                        debug!("Wrote {}", path.display());
                        Some(path)
                    }
                    _ => None,
                };
                summaries.push(ObjectSummary::new(object, path));
            }
            Ok(json!({ "objects": summaries }))
        }
    }
}
