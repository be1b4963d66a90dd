//! The process-wide descriptor registry.
//!
//! Property sources are registered once per type; merged
//! [`DescriptorSet`]s are resolved lazily per `(type, mode)` pair and
//! cached behind `Arc`, so concurrent path walks share one immutable
//! descriptor surface. Types defined through
//! [`define_properties!`](crate::define_properties) register
//! themselves at startup when the `auto_register` feature is on.

use std::any::TypeId;
use std::sync::{Arc, LazyLock};

use dashmap::DashMap;

use crate::descriptor::{self, DescriptorSet, PropertySource, ResolutionMode, TypeProperties};
use crate::spec::TypeIdent;

// -----------------------------------------------------------------------------
// Registry

struct ProviderEntry {
    ty: TypeIdent,
    provider: fn() -> TypeProperties,
}

/// Maps types to their declared property surfaces and caches the
/// resolved descriptor sets.
///
/// All methods take `&self`; the registry is safe to share across
/// threads. Most callers use [`DescriptorRegistry::global`].
pub struct DescriptorRegistry {
    providers: DashMap<TypeId, ProviderEntry>,
    resolved: DashMap<(TypeId, ResolutionMode), Arc<DescriptorSet>>,
}

static GLOBAL: LazyLock<DescriptorRegistry> = LazyLock::new(|| {
    let registry = DescriptorRegistry::new();
    #[cfg(feature = "auto_register")]
    for registration in inventory::iter::<ProviderRegistration> {
        registry.register_entry((registration.ty)(), registration.provider);
    }
    registry
});

impl DescriptorRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            providers: DashMap::new(),
            resolved: DashMap::new(),
        }
    }

    /// Returns the process-wide registry, seeded with every
    /// auto-registered property source on first use.
    pub fn global() -> &'static DescriptorRegistry {
        &GLOBAL
    }

    /// Registers (or replaces) the property source for `T`.
    pub fn register<T: PropertySource>(&self) {
        self.register_entry(TypeIdent::of::<T>(), T::type_properties);
    }

    fn register_entry(&self, ty: TypeIdent, provider: fn() -> TypeProperties) {
        log::debug!("registering property source for `{}`", ty.name());
        self.providers.insert(ty.id(), ProviderEntry { ty, provider });
        // A new source can change any set that inherits from it.
        self.resolved.clear();
    }

    /// Returns `true` if a property source is registered for `T`.
    pub fn is_registered<T: 'static>(&self) -> bool {
        self.providers.contains_key(&TypeId::of::<T>())
    }

    /// Drops the property source and cached descriptor sets for `T`.
    pub fn evict<T: 'static>(&self) {
        if self.providers.remove(&TypeId::of::<T>()).is_some() {
            self.resolved.clear();
        }
    }

    /// Returns the resolved descriptor set for `ty` under `mode`, or
    /// `None` if no property source is registered for `ty`.
    ///
    /// Resolution runs outside the cache map, so two threads racing on
    /// a cold entry may both resolve; the first insert wins and both
    /// see a fully built set.
    pub fn descriptor_set(
        &self,
        ty: TypeIdent,
        mode: ResolutionMode,
    ) -> Option<Arc<DescriptorSet>> {
        let key = (ty.id(), mode);
        if let Some(cached) = self.resolved.get(&key) {
            return Some(Arc::clone(&cached));
        }

        let source = {
            let entry = self.providers.get(&ty.id())?;
            (entry.provider)()
        };
        let lookup = |id: TypeId| {
            self.providers
                .get(&id)
                .map(|entry| (entry.provider)())
        };
        let set = Arc::new(descriptor::resolve(source, mode, &lookup));
        log::debug!(
            "resolved {} properties for `{}` ({mode:?})",
            set.len(),
            ty.name()
        );
        let published = self
            .resolved
            .entry(key)
            .or_insert_with(|| Arc::clone(&set));
        Some(Arc::clone(&published))
    }
}

impl Default for DescriptorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// -----------------------------------------------------------------------------
// Startup registration

/// One auto-registration record, submitted by
/// [`define_properties!`](crate::define_properties).
#[cfg(feature = "auto_register")]
pub struct ProviderRegistration {
    ty: fn() -> TypeIdent,
    provider: fn() -> TypeProperties,
}

#[cfg(feature = "auto_register")]
impl ProviderRegistration {
    #[doc(hidden)]
    pub const fn new<T: PropertySource>() -> Self {
        Self {
            ty: TypeIdent::of::<T>,
            provider: T::type_properties,
        }
    }
}

#[cfg(feature = "auto_register")]
inventory::collect!(ProviderRegistration);

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Account {
        owner: String,
        balance: i64,
    }

    crate::define_properties! {
        Account {
            owner: String => get set,
            balance: i64 => get set,
        }
    }

    #[test]
    fn resolves_and_caches_per_mode() {
        let registry = DescriptorRegistry::new();
        registry.register::<Account>();

        let ty = TypeIdent::of::<Account>();
        let strict = registry.descriptor_set(ty, ResolutionMode::Strict).unwrap();
        assert_eq!(strict.names(), &["balance", "owner"]);

        let again = registry.descriptor_set(ty, ResolutionMode::Strict).unwrap();
        assert!(Arc::ptr_eq(&strict, &again));

        let basic = registry.descriptor_set(ty, ResolutionMode::Basic).unwrap();
        assert!(!Arc::ptr_eq(&strict, &basic));
    }

    #[test]
    fn cold_resolution_races_see_complete_sets() {
        let registry = DescriptorRegistry::new();
        registry.register::<Account>();
        let ty = TypeIdent::of::<Account>();

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let registry = &registry;
                    scope.spawn(move || {
                        let set = registry.descriptor_set(ty, ResolutionMode::Strict).unwrap();
                        assert_eq!(set.names(), &["balance", "owner"]);
                        assert!(set.get("owner").unwrap().read().is_some());
                        set
                    })
                })
                .collect();

            // Whoever lost the insert race still holds the winning set.
            let first = handles
                .into_iter()
                .map(|handle| handle.join().unwrap())
                .reduce(|left, right| {
                    assert!(Arc::ptr_eq(&left, &right));
                    left
                });
            assert!(first.is_some());
        });
    }

    #[test]
    fn unknown_type_yields_none() {
        let registry = DescriptorRegistry::new();
        assert!(
            registry
                .descriptor_set(TypeIdent::of::<String>(), ResolutionMode::Strict)
                .is_none()
        );
    }

    #[test]
    fn evict_forgets_the_source() {
        let registry = DescriptorRegistry::new();
        registry.register::<Account>();
        assert!(registry.is_registered::<Account>());

        registry.evict::<Account>();
        assert!(!registry.is_registered::<Account>());
        assert!(
            registry
                .descriptor_set(TypeIdent::of::<Account>(), ResolutionMode::Strict)
                .is_none()
        );
    }

    #[cfg(feature = "auto_register")]
    #[test]
    fn global_registry_sees_defined_types() {
        let set = DescriptorRegistry::global()
            .descriptor_set(TypeIdent::of::<Account>(), ResolutionMode::Strict)
            .unwrap();
        assert!(set.get("owner").is_some());
    }
}
