use async_trait::async_trait;
use std::collections::BTreeMap;

use super::{Faults, MemoryHandle};
use crate::domain::*;
use crate::error::Result;

#[derive(Default)]
struct Collections {
    referee_panels: Vec<RefereePanel>,
    team_scorers: BTreeMap<(String, String), TeamScorersDoc>,
}

/// Document-store double holding both collections in memory
pub struct InMemoryDocuments {
    handle: MemoryHandle<Collections>,
}

impl Default for InMemoryDocuments {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDocuments {
    pub fn new() -> Self {
        Self {
            handle: MemoryHandle::new(StoreKind::Document, Collections::default()),
        }
    }

    pub fn reopen(&self) -> Self {
        Self {
            handle: self.handle.reopen(),
        }
    }

    pub fn faults(&self) -> &Faults {
        self.handle.faults()
    }

    /// Total stored referee documents across editions
    pub fn referee_panel_count(&self) -> usize {
        self.handle.admin(|c| c.referee_panels.len())
    }
}

#[async_trait]
impl BackingStore for InMemoryDocuments {
    fn kind(&self) -> StoreKind {
        StoreKind::Document
    }

    async fn ping(&self) -> Result<()> {
        self.handle.ping()
    }

    async fn close(&self) -> Result<()> {
        self.handle.close()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocuments {
    async fn delete_referee_panels(&self, edition: &str) -> Result<u64> {
        self.handle.write(|c| {
            let before = c.referee_panels.len();
            c.referee_panels.retain(|p| p.edition != edition);
            Ok((before - c.referee_panels.len()) as u64)
        })
    }

    async fn insert_referee_panels(&self, panels: &[RefereePanel]) -> Result<u64> {
        self.handle.write(|c| {
            c.referee_panels.extend_from_slice(panels);
            Ok(panels.len() as u64)
        })
    }

    async fn read_referee_panels(&self, edition: &str) -> Result<Vec<RefereePanel>> {
        self.handle.read(|c| {
            let mut panels: Vec<RefereePanel> = c
                .referee_panels
                .iter()
                .filter(|p| p.edition == edition)
                .cloned()
                .collect();
            panels.sort_by(|a, b| (&a.phase, a.match_id).cmp(&(&b.phase, b.match_id)));
            Ok(panels)
        })
    }

    async fn replace_team_scorers(&self, doc: &TeamScorersDoc) -> Result<()> {
        self.handle.write(|c| {
            let key = (doc.edition.clone(), doc.country.clone());
            c.team_scorers.insert(key, doc.clone());
            Ok(())
        })
    }

    async fn read_team_scorers(
        &self,
        edition: &str,
        country: &str,
    ) -> Result<Option<TeamScorersDoc>> {
        let key = (edition.to_string(), country.to_string());
        self.handle.read(|c| Ok(c.team_scorers.get(&key).cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn panel(edition: &str, phase: &str, match_id: i32) -> RefereePanel {
        RefereePanel {
            edition: edition.to_string(),
            phase: phase.to_string(),
            match_id,
            local_team: "L".to_string(),
            visitor_team: "V".to_string(),
            referees: vec![],
        }
    }

    #[tokio::test]
    async fn test_referee_panels_sorted_by_phase_then_match() {
        let docs = InMemoryDocuments::new();
        docs.insert_referee_panels(&[
            panel("Mundial 2030", "semifinal", 62),
            panel("Mundial 2030", "final", 64),
            panel("Mundial 2030", "semifinal", 61),
        ])
        .await
        .unwrap();

        let view = docs.read_referee_panels("Mundial 2030").await.unwrap();
        let keys: Vec<(&str, i32)> = view.iter().map(|p| (p.phase.as_str(), p.match_id)).collect();
        assert_eq!(keys, vec![("final", 64), ("semifinal", 61), ("semifinal", 62)]);
    }

    #[tokio::test]
    async fn test_delete_panels_scoped_to_edition() {
        let docs = InMemoryDocuments::new();
        docs.insert_referee_panels(&[panel("Mundial 2026", "final", 1), panel("Mundial 2030", "final", 1)])
            .await
            .unwrap();

        assert_eq!(docs.delete_referee_panels("Mundial 2030").await.unwrap(), 1);
        assert_eq!(docs.referee_panel_count(), 1);
    }

    #[tokio::test]
    async fn test_replace_team_scorers_upserts() {
        let docs = InMemoryDocuments::new();
        let mut doc = TeamScorersDoc {
            edition: "Mundial 2030".to_string(),
            country: "Ghana".to_string(),
            players: vec![],
            updated_at: Utc::now(),
        };
        docs.replace_team_scorers(&doc).await.unwrap();

        doc.players.push(ScorerEntry {
            id: 4,
            first_name: "A".to_string(),
            last_name: "B".to_string(),
            goals_total: 2,
        });
        docs.replace_team_scorers(&doc).await.unwrap();

        let stored = docs
            .read_team_scorers("Mundial 2030", "Ghana")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.players.len(), 1);
        assert!(docs.read_team_scorers("Mundial 2030", "Togo").await.unwrap().is_none());
    }
}
