//! `keepsake wake` and `keepsake remember` — the single-shot retrieval
//! and recording commands, run against an in-process store.

use chrono::Utc;
use keepsake_engine::present::{context_view, digest_view, Shape};
use keepsake_types::config::KeepsakeConfig;
use keepsake_types::observation::{
    AgentId, EmotionVector, NewObservation, ObservationKind,
};
use keepsake_types::retrieval::WakeRequest;
use keepsake_types::store::RecordStore;

#[allow(clippy::too_many_arguments)]
pub fn wake(
    store: &dyn RecordStore,
    config: &KeepsakeConfig,
    agent: &str,
    limit: Option<usize>,
    no_hot: bool,
    explain: bool,
    lens: Option<String>,
    shape: &str,
) -> anyhow::Result<()> {
    let request = WakeRequest {
        agent_id: AgentId::from(agent),
        limit,
        hot: !no_hot,
        explain,
        lens,
    };
    let result = keepsake_engine::wake(store, &config.wake, &request, Utc::now())?;
    let rendered = match Shape::parse(shape) {
        Shape::Full => serde_json::to_string_pretty(&result)?,
        Shape::Context => serde_json::to_string_pretty(&context_view(&result))?,
        Shape::Digest => serde_json::to_string_pretty(&digest_view(&result))?,
    };
    println!("{rendered}");
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn remember(
    store: &dyn RecordStore,
    agent: &str,
    content: &str,
    author: &str,
    kind: &str,
    salience: i64,
    pinned: bool,
    perspective: &str,
    platform: Option<String>,
) -> anyhow::Result<()> {
    let new = NewObservation {
        agent_id: AgentId::from(agent),
        author: author.to_string(),
        perspective: perspective.to_string(),
        kind: ObservationKind::from(kind),
        content: content.to_string(),
        salience,
        emotions: EmotionVector::default(),
        pinned,
        source_platform: platform,
        source_ref: None,
    };
    new.validate()?;
    let obs = new.into_observation(Utc::now());
    store.insert(&obs)?;
    println!("Remembered {} for {}", obs.id, obs.agent_id);
    Ok(())
}
