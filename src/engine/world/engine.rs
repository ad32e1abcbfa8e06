// Engine: running game instances and the instance-started event

use super::{World, WorldId};
use crate::core::ObjectId;
use crate::engine::assets::{AssetManager, SharedAssets};
use log::info;
use std::cell::RefCell;
use std::rc::Rc;

/// Callback for a game instance starting, with its world
pub type InstanceListener = Rc<dyn Fn(&mut World)>;

/// Process-wide host: every running world plus shared content
pub struct Engine {
    worlds: Vec<World>,
    instance_listeners: Vec<(ObjectId, InstanceListener)>,
    assets: SharedAssets,
}

impl Engine {
    pub fn new() -> Self {
        Self::with_assets(Rc::new(RefCell::new(AssetManager::new())))
    }

    pub fn with_assets(assets: SharedAssets) -> Self {
        Self {
            worlds: Vec::new(),
            instance_listeners: Vec::new(),
            assets,
        }
    }

    pub fn assets(&self) -> SharedAssets {
        self.assets.clone()
    }

    /// Start a game instance in `world` and notify listeners
    pub fn start_instance(&mut self, world: World) -> WorldId {
        let id = world.id();
        info!("Starting instance {:?} ({:?})", id, world.kind());
        self.worlds.push(world);

        let listeners: Vec<InstanceListener> = self
            .instance_listeners
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        if let Some(world) = self.world_mut(id) {
            for listener in listeners {
                listener(world);
            }
        }
        id
    }

    /// End play in a world and hand it back
    pub fn stop_instance(&mut self, id: WorldId) -> Option<World> {
        let index = self.worlds.iter().position(|w| w.id() == id)?;
        let mut world = self.worlds.remove(index);
        world.shutdown();
        info!("Stopped instance {:?}", id);
        Some(world)
    }

    pub fn world(&self, id: WorldId) -> Option<&World> {
        self.worlds.iter().find(|w| w.id() == id)
    }

    pub fn world_mut(&mut self, id: WorldId) -> Option<&mut World> {
        self.worlds.iter_mut().find(|w| w.id() == id)
    }

    pub fn world_ids(&self) -> Vec<WorldId> {
        self.worlds.iter().map(World::id).collect()
    }

    pub fn worlds_mut(&mut self) -> impl Iterator<Item = &mut World> {
        self.worlds.iter_mut()
    }

    pub fn on_instance_started(&mut self, owner: ObjectId, listener: InstanceListener) {
        self.instance_listeners.push((owner, listener));
    }

    pub fn is_bound_to_instance_started(&self, owner: ObjectId) -> bool {
        self.instance_listeners.iter().any(|(o, _)| *o == owner)
    }

    /// Drop every instance-started listener registered by `owner`
    pub fn remove_instance_listeners(&mut self, owner: ObjectId) -> usize {
        let before = self.instance_listeners.len();
        self.instance_listeners.retain(|(o, _)| *o != owner);
        before - self.instance_listeners.len()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
