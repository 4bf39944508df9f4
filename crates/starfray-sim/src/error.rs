use starfray_ai::error::TransitionError;
use starfray_core::error::CatalogError;
use starfray_core::types::EntityHandle;

/// Errors returned by engine operations. The tick loop itself never fails.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("no live combatant with handle {0}")]
    UnknownEntity(EntityHandle),

    #[error("combatant {0} cannot target itself")]
    SelfTarget(EntityHandle),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("entity {entity}: {source}")]
    Transition {
        entity: EntityHandle,
        #[source]
        source: TransitionError,
    },
}

pub type EngineResult<T> = Result<T, EngineError>;
