//! Standing-document commands.

use anyhow::{bail, Context};
use chrono::Utc;
use keepsake_store::DocStore;
use keepsake_types::observation::AgentId;
use std::io::Read;

pub fn get(docs: &DocStore, agent: &str, key: &str) -> anyhow::Result<()> {
    let agent = AgentId::parse(agent)?;
    match docs.get(&agent, key)? {
        Some(doc) => println!("{}", doc.content),
        None => bail!("doc '{key}' not found for {agent}"),
    }
    Ok(())
}

pub fn set(docs: &DocStore, agent: &str, key: &str, content: &str) -> anyhow::Result<()> {
    let agent = AgentId::parse(agent)?;
    let content = if content == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("reading doc from stdin")?;
        buffer
    } else {
        content.to_string()
    };
    docs.put(&agent, key, &content, Utc::now())?;
    println!("Stored doc '{key}' for {agent}");
    Ok(())
}

pub fn delete(docs: &DocStore, agent: &str, key: &str) -> anyhow::Result<()> {
    let agent = AgentId::parse(agent)?;
    if !docs.delete(&agent, key)? {
        bail!("doc '{key}' not found for {agent}");
    }
    println!("Deleted doc '{key}' for {agent}");
    Ok(())
}

pub fn list(docs: &DocStore, agent: &str) -> anyhow::Result<()> {
    let agent = AgentId::parse(agent)?;
    let rows = docs.list(&agent)?;
    if rows.is_empty() {
        println!("(no docs)");
        return Ok(());
    }
    for doc in rows {
        println!("{}  updated {}", doc.key, doc.updated_at.to_rfc3339());
    }
    Ok(())
}
