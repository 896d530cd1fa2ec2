//! Wiring of every engine service over one shared store.

use std::sync::Arc;

use crate::{
    actions::{ActionLogger, ActionSink},
    deck::{CardDealer, DeckManager, Shuffler},
    game::GameRepository,
    monitor::{EngineConfig, LifecycleController, RoomMonitor},
    store::{KeyBuilder, KeyValueStore},
};

/// All engine services, built from a store, a key layout, and a config
pub struct Engine {
    pub repository: GameRepository,
    pub decks: DeckManager,
    pub dealer: CardDealer,
    pub actions: ActionLogger,
    pub controller: LifecycleController,
    pub monitor: RoomMonitor,
}

impl Engine {
    /// Build the services with a shuffler seeded from OS entropy
    pub fn new(store: Arc<dyn KeyValueStore>, keys: KeyBuilder, config: EngineConfig) -> Self {
        Self::with_shuffler(store, keys, config, Arc::new(Shuffler::from_entropy()))
    }

    /// Build the services with an explicit random source
    pub fn with_shuffler(
        store: Arc<dyn KeyValueStore>,
        keys: KeyBuilder,
        config: EngineConfig,
        shuffler: Arc<Shuffler>,
    ) -> Self {
        let actions = ActionLogger::new(Arc::clone(&store), keys.clone());
        Self::with_sink(store, keys, config, shuffler, actions.clone(), Arc::new(actions))
    }

    /// Build the services with a custom action sink for lifecycle events
    pub fn with_sink(
        store: Arc<dyn KeyValueStore>,
        keys: KeyBuilder,
        config: EngineConfig,
        shuffler: Arc<Shuffler>,
        actions: ActionLogger,
        sink: Arc<dyn ActionSink>,
    ) -> Self {
        let repository = GameRepository::new(Arc::clone(&store), keys.clone());
        let decks = DeckManager::new(store, keys);
        let dealer = CardDealer::new(
            repository.clone(),
            decks.clone(),
            shuffler,
            Arc::clone(&sink),
        );
        let controller = LifecycleController::new(
            repository.clone(),
            dealer.clone(),
            sink,
            config.deal_on_start,
        );
        let monitor = RoomMonitor::new(controller.clone(), config);

        Self {
            repository,
            decks,
            dealer,
            actions,
            controller,
            monitor,
        }
    }
}
