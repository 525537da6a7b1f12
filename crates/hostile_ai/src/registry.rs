//! Registry (AIManager): каталог живых агентов по id и по типу.
//!
//! Явный Bevy Resource (не global). Хранит `Weak` ссылки: владеет агентом
//! ECS компонент `AgentHandle`, registry только находит.
//!
//! Bulk операции сначала снимают snapshot подходящих handle'ов, потом итерируют:
//! агенты, исчезнувшие за это время, пропускаются.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, Weak};

use bevy::prelude::*;

use crate::agent::{lock_agent, AgentController, AgentId, AgentKind, SharedAgent};

#[cfg(test)]
#[path = "registry_tests.rs"]
mod registry_tests;

/// Кого затрагивает enable/disable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    All,
    Id(AgentId),
}

struct Entry {
    agent: Weak<Mutex<dyn AgentController>>,
    kind: AgentKind,
    entity: Option<Entity>,
}

#[derive(Resource, Default)]
pub struct Registry {
    entries: HashMap<AgentId, Entry>,
    by_kind: BTreeMap<AgentKind, BTreeSet<AgentId>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Регистрация. Повторная регистрация того же id заменяет запись.
    pub fn register(&mut self, agent: &SharedAgent) -> AgentId {
        self.insert(agent, None)
    }

    pub fn register_entity(&mut self, agent: &SharedAgent, entity: Entity) -> AgentId {
        self.insert(agent, Some(entity))
    }

    fn insert(&mut self, agent: &SharedAgent, entity: Option<Entity>) -> AgentId {
        let (id, kind) = {
            let guard = lock_agent(agent);
            (guard.id(), guard.kind())
        };

        if let Some(previous) = self.entries.remove(&id) {
            self.forget_kind(previous.kind, id);
            crate::logger::log(&format!("📇 Registry: {:?} re-registered (replaced)", id));
        } else {
            crate::logger::log(&format!("📇 Registry: {:?} {:?} registered", kind, id));
        }

        self.entries.insert(
            id,
            Entry {
                agent: Arc::downgrade(agent),
                kind,
                entity,
            },
        );
        self.by_kind.entry(kind).or_default().insert(id);
        id
    }

    pub fn unregister(&mut self, id: AgentId) -> bool {
        let Some(entry) = self.entries.remove(&id) else {
            return false;
        };
        self.forget_kind(entry.kind, id);
        crate::logger::log(&format!("📇 Registry: {:?} unregistered", id));
        true
    }

    /// Despawn ECS entity → снимаем его агента.
    pub fn unregister_entity(&mut self, entity: Entity) -> Option<AgentId> {
        let id = self
            .entries
            .iter()
            .find(|(_, entry)| entry.entity == Some(entity))
            .map(|(id, _)| *id)?;
        self.unregister(id);
        Some(id)
    }

    fn forget_kind(&mut self, kind: AgentKind, id: AgentId) {
        if let Some(ids) = self.by_kind.get_mut(&kind) {
            ids.remove(&id);
            if ids.is_empty() {
                self.by_kind.remove(&kind);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: AgentId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn find_by_id(&self, id: AgentId) -> Option<SharedAgent> {
        self.entries.get(&id).and_then(|entry| entry.agent.upgrade())
    }

    /// Snapshot живых агентов типа (порядок по id).
    pub fn find_by_type(&self, kind: AgentKind) -> Vec<SharedAgent> {
        self.ids_of(kind)
            .into_iter()
            .filter_map(|id| self.find_by_id(id))
            .collect()
    }

    pub fn ids_of(&self, kind: AgentKind) -> Vec<AgentId> {
        self.by_kind
            .get(&kind)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    fn select(&self, kind: AgentKind, selector: Selector) -> Vec<SharedAgent> {
        match selector {
            Selector::All => self.find_by_type(kind),
            Selector::Id(id) => self
                .entries
                .get(&id)
                .filter(|entry| entry.kind == kind)
                .and_then(|entry| entry.agent.upgrade())
                .into_iter()
                .collect(),
        }
    }

    /// Возвращает число агентов, у которых флаг реально изменился.
    pub fn enable(&self, kind: AgentKind, selector: Selector) -> usize {
        self.set_enabled(kind, selector, true)
    }

    /// Идемпотентно: уже отключённый агент не трогается.
    pub fn disable(&self, kind: AgentKind, selector: Selector) -> usize {
        self.set_enabled(kind, selector, false)
    }

    fn set_enabled(&self, kind: AgentKind, selector: Selector, enabled: bool) -> usize {
        let targets = self.select(kind, selector);
        let changed = targets
            .iter()
            .filter(|agent| lock_agent(agent).set_enabled(enabled))
            .count();

        crate::logger::log(&format!(
            "📇 Registry: {} {:?} {:?} → {} changed",
            if enabled { "enable" } else { "disable" },
            kind,
            selector,
            changed
        ));
        changed
    }

    /// Административный forced stun.
    pub fn force_into_stun(&self, id: AgentId) -> bool {
        match self.find_by_id(id) {
            Some(agent) => lock_agent(&agent).force_into_stun(),
            None => {
                crate::logger::log_warning(&format!("Registry: force_into_stun for unknown {:?}", id));
                false
            }
        }
    }

    pub fn warp_to(&self, id: AgentId, destination: Vec3) -> bool {
        match self.find_by_id(id) {
            Some(agent) => lock_agent(&agent).warp_to(destination),
            None => {
                crate::logger::log_warning(&format!("Registry: warp_to for unknown {:?}", id));
                false
            }
        }
    }

    /// Убирает записи, чьи агенты уже уничтожены.
    pub fn prune(&mut self) -> usize {
        let dead: Vec<AgentId> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.agent.strong_count() == 0)
            .map(|(id, _)| *id)
            .collect();
        for id in &dead {
            self.unregister(*id);
        }
        dead.len()
    }
}
