//! Faction relations: a table-driven oracle and the hostility rule.

use std::collections::HashMap;

use starfray_core::components::RelationOverrides;
use starfray_core::enums::FactionRelation;
use starfray_core::interfaces::FactionOracle;
use starfray_core::types::FactionId;

/// Directed relation table. Members of the same faction are allies;
/// unlisted pairs fall back to `default_relation`.
#[derive(Debug, Clone, Default)]
pub struct FactionTable {
    relations: HashMap<(FactionId, FactionId), FactionRelation>,
    default_relation: FactionRelation,
}

impl FactionTable {
    pub fn new(default_relation: FactionRelation) -> Self {
        Self {
            relations: HashMap::new(),
            default_relation,
        }
    }

    /// Set how `from` regards `to`.
    pub fn set(&mut self, from: &FactionId, to: &FactionId, relation: FactionRelation) {
        self.relations.insert((from.clone(), to.clone()), relation);
    }

    /// Set the same relation in both directions.
    pub fn set_mutual(&mut self, a: &FactionId, b: &FactionId, relation: FactionRelation) {
        self.set(a, b, relation);
        self.set(b, a, relation);
    }

    /// Builder form of [`FactionTable::set_mutual`].
    pub fn with_mutual(mut self, a: &str, b: &str, relation: FactionRelation) -> Self {
        self.set_mutual(&FactionId::from(a), &FactionId::from(b), relation);
        self
    }
}

impl FactionOracle for FactionTable {
    fn relation(
        &self,
        from: &FactionId,
        to: &FactionId,
        overrides: Option<&RelationOverrides>,
    ) -> FactionRelation {
        if let Some(ovr) = overrides.and_then(|o| o.by_faction.get(to)) {
            return ovr.relation;
        }
        if from == to {
            return FactionRelation::Ally;
        }
        self.relations
            .get(&(from.clone(), to.clone()))
            .copied()
            .unwrap_or(self.default_relation)
    }
}

/// Confrontation-rated in either direction, each side with its own overrides.
pub fn is_confrontational(
    oracle: &dyn FactionOracle,
    a: &FactionId,
    a_overrides: Option<&RelationOverrides>,
    b: &FactionId,
    b_overrides: Option<&RelationOverrides>,
) -> bool {
    oracle.relation(a, b, a_overrides) == FactionRelation::Confrontation
        || oracle.relation(b, a, b_overrides) == FactionRelation::Confrontation
}
