//! Resolving the top of the chase.

use std::sync::Arc;

use tracing::{debug, info};

use super::engine::Game;
use crate::chase::{ChaseItem, ChaseItemId, ChaseItemKind, ChasePayload};
use crate::core::{CardId, PlayerId, RulesError, RulesResult, TargetList, Zone};
use crate::effects::ResolveContext;
use crate::targeting::TargetingManager;
use crate::triggers::{TriggerKind, TriggerManager};

impl Game {
    /// Resolve the top item, then hand priority back and settle.
    pub(crate) fn resolve_top(&mut self) -> RulesResult<ChaseItemId> {
        let item = self
            .chase
            .pop()
            .ok_or_else(|| RulesError::illegal("the chase is empty"))?;
        let id = item.id;
        self.resolve_item(item);
        self.restore_priority();
        self.settle();
        self.maybe_run_battle_damage();
        Ok(id)
    }

    fn resolve_item(&mut self, item: ChaseItem) {
        debug!(item = %item.id, source = %item.source, kind = ?item.kind, "resolving");

        if let ChasePayload::Trigger(pending) = &item.payload {
            let scripts = Arc::clone(&self.scripts);
            if pending.ability.kind == TriggerKind::InterveningIf
                && !TriggerManager::condition_holds(pending, &self.state, scripts.as_ref())
            {
                debug!(item = %item.id, name = %pending.ability.name, "condition no longer holds");
                return;
            }
        }

        let Some(targets) = self.legal_targets(&item) else {
            debug!(item = %item.id, "every target is gone, fizzled");
            self.place_spell(&item, false);
            return;
        };

        let ctx = ResolveContext::new(item.source, item.controller).with_targets(&targets);
        match &item.payload {
            ChasePayload::Judgment => self.resolve_judgment(item.source, item.controller),
            ChasePayload::Ops(ops) => {
                self.run_ops(ops, &ctx);
            }
            ChasePayload::Trigger(pending) => {
                let ctx = ctx.with_event(pending.event.clone());
                self.run_ops(&pending.ability.ops, &ctx);
            }
        }
        self.place_spell(&item, true);
    }

    /// Take countered spells off the chase. Each goes to the graveyard, or
    /// is removed when it was played from there.
    pub(crate) fn counter_spells(&mut self, cards: &[CardId]) {
        for card in cards {
            let Some(item) = self.chase.remove_spell(*card) else { continue };
            info!(item = %item.id, %card, "countered");
            self.place_spell(&item, false);
        }
    }

    /// Targets still legal on resolution. `None` when the item had targets
    /// and all of them became illegal.
    fn legal_targets(&self, item: &ChaseItem) -> Option<TargetList> {
        let Some(requirement) = &item.requirement else {
            return Some(item.targets.clone());
        };
        if item.targets.is_empty() {
            return Some(TargetList::new());
        }
        let valid = TargetingManager::valid_targets(
            requirement,
            item.source,
            item.controller,
            &self.state,
            self.scripts.as_ref(),
        );
        let still: TargetList = item.targets.iter().copied().filter(|t| valid.contains(t)).collect();
        (!still.is_empty()).then_some(still)
    }

    /// Move a spell card off the chase. A resolved permanent enters the
    /// field; anything else goes to the graveyard, or is removed when it was
    /// played from there.
    fn place_spell(&mut self, item: &ChaseItem, resolved: bool) {
        if item.kind != ChaseItemKind::Spell {
            return;
        }
        let Some(card) = self.state.card(item.source).filter(|c| c.zone == Zone::Chase) else {
            return;
        };
        let to = if resolved && card.card_type.is_permanent() {
            Zone::Field
        } else if item.from_graveyard {
            Zone::Removed
        } else {
            Zone::Graveyard
        };
        if let Err(err) = self.state.move_card(item.source, to) {
            debug!(card = %item.source, %err, "spell could not leave the chase");
        }
    }

    /// Flip a ruler into its J-ruler on the field. The J-ruler may attack
    /// the turn it arrives.
    fn resolve_judgment(&mut self, ruler: CardId, player: PlayerId) {
        let Some(card) = self.state.card(ruler) else { return };
        if card.zone != Zone::RulerArea {
            debug!(card = %ruler, "ruler left the ruler area, Judgment fizzled");
            return;
        }
        let Some(j_ruler) = card.template.j_ruler.as_deref().cloned() else { return };

        self.deactivate_scripts(ruler);
        if let Some(card) = self.state.card_mut(ruler) {
            card.transform(j_ruler);
        }
        if self.state.move_card(ruler, Zone::Field).is_ok() {
            if let Some(card) = self.state.card_mut(ruler) {
                card.entered_turn = None;
            }
        }
        info!(%player, card = %ruler, "judgment");
    }
}
