// Central asset registry: loaded assets plus synchronous loaders

use super::{AssetError, AssetId, SoftRef};
use log::debug;
use std::any::Any;
use std::collections::HashMap;
use std::rc::Rc;

type Loader = Box<dyn Fn() -> Rc<dyn Any>>;

/// Registry of content assets
///
/// Assets are either already in memory or have a loader that produces them on
/// first use. Resolution is synchronous, matching how content is pulled in when a
/// feature is activated mid-game.
#[derive(Default)]
pub struct AssetManager {
    /// Assets currently in memory
    loaded: HashMap<AssetId, Rc<dyn Any>>,

    /// Loaders for assets that can be brought in on demand
    loaders: HashMap<AssetId, Loader>,

    /// Path for each known ID, for diagnostics
    paths: HashMap<AssetId, String>,
}

impl AssetManager {
    /// Create an empty asset manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an asset that is already in memory
    pub fn add_loaded<T: Any>(&mut self, path: &str, asset: Rc<T>) -> SoftRef<T> {
        let id = AssetId::from_path(path);
        self.loaded.insert(id, asset);
        self.paths.insert(id, path.to_string());
        SoftRef::new(path)
    }

    /// Register a loader for an asset that is not in memory yet
    pub fn add_loadable<T, F>(&mut self, path: &str, load: F) -> SoftRef<T>
    where
        T: Any,
        F: Fn() -> T + 'static,
    {
        let id = AssetId::from_path(path);
        self.loaders
            .insert(id, Box::new(move || Rc::new(load()) as Rc<dyn Any>));
        self.paths.insert(id, path.to_string());
        SoftRef::new(path)
    }

    /// Drop the in-memory instance; a registered loader can bring it back
    pub fn unload(&mut self, path: &str) {
        self.loaded.remove(&AssetId::from_path(path));
    }

    /// Check if the referenced asset is in memory
    pub fn is_loaded<T>(&self, reference: &SoftRef<T>) -> bool {
        reference
            .id()
            .is_some_and(|id| self.loaded.contains_key(&id))
    }

    /// Get the referenced asset only if it is already in memory
    pub fn get<T: Any>(&self, reference: &SoftRef<T>) -> Option<Rc<T>> {
        let id = reference.id()?;
        self.loaded.get(&id).cloned()?.downcast::<T>().ok()
    }

    /// Get the referenced asset, loading it synchronously if needed
    pub fn resolve<T: Any>(&mut self, reference: &SoftRef<T>) -> Result<Rc<T>, AssetError> {
        let path = reference.path().ok_or(AssetError::NullReference)?;
        let id = AssetId::from_path(path);

        let asset = match self.loaded.get(&id) {
            Some(asset) => asset.clone(),
            None => {
                let loader = self
                    .loaders
                    .get(&id)
                    .ok_or_else(|| AssetError::NotFound(path.to_string()))?;
                debug!("Loading asset synchronously: {}", path);
                let asset = loader();
                self.loaded.insert(id, asset.clone());
                asset
            }
        };

        asset.downcast::<T>().map_err(|_| AssetError::InvalidType {
            path: path.to_string(),
            expected: std::any::type_name::<T>(),
        })
    }

    /// Get statistics about known assets
    pub fn stats(&self) -> AssetStats {
        AssetStats {
            loaded_count: self.loaded.len(),
            known_count: self.paths.len(),
        }
    }
}

/// Statistics about registered assets
#[derive(Debug, Clone, Copy)]
pub struct AssetStats {
    pub loaded_count: usize,
    pub known_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Context(&'static str);

    #[test]
    fn test_resolve_loaded_asset() {
        let mut assets = AssetManager::new();
        let reference = assets.add_loaded("Input/IMC_Default", Rc::new(Context("default")));

        let resolved = assets.resolve(&reference).unwrap();
        assert_eq!(*resolved, Context("default"));
    }

    #[test]
    fn test_resolve_loads_synchronously() {
        let mut assets = AssetManager::new();
        let reference = assets.add_loadable("Input/IMC_Vehicle", || Context("vehicle"));

        assert!(!assets.is_loaded(&reference));
        assert!(assets.get(&reference).is_none());

        let resolved = assets.resolve(&reference).unwrap();
        assert_eq!(*resolved, Context("vehicle"));
        assert!(assets.is_loaded(&reference));

        // Second resolve hands back the same instance
        let again = assets.resolve(&reference).unwrap();
        assert!(Rc::ptr_eq(&resolved, &again));
    }

    #[test]
    fn test_unload_then_reload() {
        let mut assets = AssetManager::new();
        let reference = assets.add_loadable("Input/IMC_Vehicle", || Context("vehicle"));
        assets.resolve(&reference).unwrap();

        assets.unload("Input/IMC_Vehicle");
        assert!(!assets.is_loaded(&reference));
        assert!(assets.resolve(&reference).is_ok());
    }

    #[test]
    fn test_resolve_failures() {
        let mut assets = AssetManager::new();

        let null: SoftRef<Context> = SoftRef::null();
        assert!(matches!(assets.resolve(&null), Err(AssetError::NullReference)));

        let missing: SoftRef<Context> = SoftRef::new("Input/Missing");
        assert!(matches!(assets.resolve(&missing), Err(AssetError::NotFound(_))));

        assets.add_loaded("Input/Number", Rc::new(7_u32));
        let wrong: SoftRef<Context> = SoftRef::new("Input/Number");
        assert!(matches!(
            assets.resolve(&wrong),
            Err(AssetError::InvalidType { .. })
        ));
    }

    #[test]
    fn test_asset_stats() {
        let mut assets = AssetManager::new();
        assets.add_loaded("a", Rc::new(Context("a")));
        assets.add_loadable("b", || Context("b"));

        let stats = assets.stats();
        assert_eq!(stats.loaded_count, 1);
        assert_eq!(stats.known_count, 2);
    }
}
