//! Per-run transformation state

use crate::names::{RenameRegistry, ReservedNameSet, PYTHON_RESERVED};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Random generator and rename registry for one file.
///
/// Created at the start of a transformation and dropped at its end; nothing
/// carries over between files.
pub struct TransformContext<'a> {
    rng: StdRng,
    registry: RenameRegistry<'a>,
}

impl<'a> TransformContext<'a> {
    /// Seeded from entropy unless `seed` is given
    pub fn new(reserved: &'a ReservedNameSet, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            registry: RenameRegistry::new(reserved),
        }
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    pub fn registry(&self) -> &RenameRegistry<'a> {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut RenameRegistry<'a> {
        &mut self.registry
    }

    /// Rename `original` through the registry using this context's generator
    pub fn rename(&mut self, original: &str) -> String {
        self.registry.resolve(original, &mut self.rng)
    }
}

impl TransformContext<'static> {
    /// Context using the shared Python reserved names
    pub fn python(seed: Option<u64>) -> Self {
        Self::new(&PYTHON_RESERVED, seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_seeded_contexts_agree() {
        let mut a = TransformContext::python(Some(9));
        let mut b = TransformContext::python(Some(9));
        assert_eq!(a.rename("value"), b.rename("value"));
        assert_eq!(a.rng().gen::<u64>(), b.rng().gen::<u64>());
    }

    #[test]
    fn test_contexts_are_independent() {
        let mut a = TransformContext::python(Some(1));
        let renamed = a.rename("value");
        let b = TransformContext::python(Some(1));
        assert_eq!(a.registry().get("value"), Some(renamed.as_str()));
        assert!(b.registry().get("value").is_none());
    }
}
