//! Transform/Agent desync-avoidance protocol.
//!
//! Пока играет атака, NavigationAgent не пишет позицию: Transform двигает
//! root motion, а `SyncTask` каждый кадр записывает позицию Transform во
//! внутреннюю позицию агента. Drift² больше порога → hard warp.
//! Когда authority возвращается агенту, он уже стоит там же, где Transform,
//! и визуального скачка нет.
//!
//! Authority держит ровно один владелец (token состояния). Чужой release игнорируется.

use crate::fsm::{StateKey, StateToken};
use crate::sequence::{Sequence, Step, TaskEnd};

use super::{BossBody, BossState};

impl BossBody {
    /// Transform становится ведущим. false если authority уже у другого владельца.
    pub fn hand_position_to_transform(&mut self, owner: StateToken<BossState>) -> bool {
        if let Some(holder) = self.authority_holder {
            if holder != owner {
                crate::logger::log_warning(&format!(
                    "Boss {:?}: position authority held by {} (gen {}), {} refused",
                    self.core.id,
                    holder.state.name(),
                    holder.generation,
                    owner.state.name()
                ));
                return false;
            }
        }

        self.authority_holder = Some(owner);
        if let Some(nav) = self.core.nav() {
            nav.stop();
            nav.set_position_authority(false);
            nav.set_rotation_authority(false);
        }
        true
    }

    /// Финальная синхронизация + authority обратно агенту.
    ///
    /// `owner == None`: административный release (disable/restore).
    pub fn return_position_to_agent(&mut self, owner: Option<StateToken<BossState>>) -> bool {
        let Some(holder) = self.authority_holder else {
            return false;
        };
        if let Some(owner) = owner {
            if owner != holder {
                crate::logger::log_warning(&format!(
                    "Boss {:?}: {} tried to release authority held by {}",
                    self.core.id,
                    owner.state.name(),
                    holder.state.name()
                ));
                return false;
            }
        }

        self.sync_agent_to_transform();
        self.authority_holder = None;
        if let Some(nav) = self.core.nav() {
            nav.set_position_authority(true);
            nav.set_rotation_authority(true);
        }
        true
    }

    /// Один шаг sync. Возвращает true если понадобился warp.
    pub fn sync_agent_to_transform(&mut self) -> bool {
        let visual = self.core.transform.translation;
        let threshold = self.config.desync_warp_threshold_sq;
        let id = self.core.id;

        let Some(nav) = self.core.nav() else {
            return false;
        };

        let drift_sq = nav.position().distance_squared(visual);
        if drift_sq > threshold {
            crate::logger::log_warning(&format!(
                "Boss {:?}: agent drifted {:.2}m² from transform, warping",
                id, drift_sq
            ));
            if !nav.warp(visual) {
                nav.set_internal_position(visual);
            }
            return true;
        }

        nav.set_internal_position(visual);
        false
    }
}

/// Per-frame sync, параллельно с attack sequence.
pub struct SyncTask;

impl Sequence<BossBody> for SyncTask {
    fn label(&self) -> &'static str {
        "boss_agent_sync"
    }

    fn resume(&mut self, ctx: &mut BossBody, _dt: f32) -> Step {
        ctx.sync_agent_to_transform();
        Step::frame()
    }

    /// Attack exit уже сделал финальный sync и вернул authority агенту.
    /// Досинхронизируем только если authority всё ещё у Transform (disable).
    fn finalize(&mut self, ctx: &mut BossBody, end: TaskEnd) {
        if end == TaskEnd::Cancelled && ctx.authority_holder.is_some() {
            ctx.sync_agent_to_transform();
        }
    }
}
