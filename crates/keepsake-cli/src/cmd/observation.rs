//! Observation management commands: list, show, pin, delete, supersede.

use anyhow::bail;
use chrono::Utc;
use keepsake_types::observation::{AgentId, Observation, ObservationId};
use keepsake_types::store::RecordStore;

fn print_rows(rows: &[Observation]) {
    if rows.is_empty() {
        println!("(no observations)");
        return;
    }
    for obs in rows {
        let pin = if obs.pinned { " [pinned]" } else { "" };
        println!(
            "{}  {:<12} s={:<3} {}{}",
            obs.id,
            obs.kind.as_str(),
            obs.salience,
            obs.content.lines().next().unwrap_or(""),
            pin
        );
    }
}

pub fn list(store: &dyn RecordStore, agent: &str, limit: usize) -> anyhow::Result<()> {
    let agent = AgentId::parse(agent)?;
    print_rows(&store.recent_for_agent(&agent, limit)?);
    Ok(())
}

pub fn superseded(store: &dyn RecordStore, agent: &str, limit: usize) -> anyhow::Result<()> {
    let agent = AgentId::parse(agent)?;
    let rows = store.superseded_for_agent(&agent, limit)?;
    if rows.is_empty() {
        println!("(no superseded observations)");
        return Ok(());
    }
    for obs in rows {
        let successor = obs
            .superseded_by
            .as_ref()
            .map(|id| id.as_str().to_string())
            .unwrap_or_default();
        println!("{}  superseded by {}  {}", obs.id, successor, obs.content);
    }
    Ok(())
}

pub fn show(store: &dyn RecordStore, id: &str) -> anyhow::Result<()> {
    let id = ObservationId::parse(id)?;
    match store.get(&id)? {
        Some(obs) => println!("{}", serde_json::to_string_pretty(&obs)?),
        None => bail!("observation {id} not found"),
    }
    Ok(())
}

pub fn pin(store: &dyn RecordStore, id: &str, pinned: bool) -> anyhow::Result<()> {
    let id = ObservationId::parse(id)?;
    if !store.set_pinned(&id, pinned, Utc::now())? {
        bail!("observation {id} not found");
    }
    println!("{} {}", if pinned { "Pinned" } else { "Unpinned" }, id);
    Ok(())
}

pub fn delete(store: &dyn RecordStore, id: &str, hard: bool) -> anyhow::Result<()> {
    let id = ObservationId::parse(id)?;
    let removed = if hard {
        store.hard_delete(&id)?
    } else {
        store.soft_delete(&id, Utc::now())?
    };
    if !removed {
        bail!("observation {id} not found");
    }
    println!(
        "{} {}",
        if hard { "Hard-deleted" } else { "Deleted" },
        id
    );
    Ok(())
}

pub fn supersede(store: &dyn RecordStore, target: &str, superseding: &str) -> anyhow::Result<()> {
    let target = ObservationId::parse(target)?;
    let superseding = ObservationId::parse(superseding)?;
    keepsake_engine::supersede(store, &target, &superseding, Utc::now())?;
    println!("Superseded {target} with {superseding}");
    Ok(())
}
