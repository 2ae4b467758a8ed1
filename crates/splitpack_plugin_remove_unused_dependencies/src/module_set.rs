use indexmap::IndexSet;
use splitpack_core::types::ModuleId;

/// Insertion-ordered set of module handles.
///
/// Membership is by handle, so two distinct modules built from identical sources never
/// compare equal.
pub type ModuleSet = IndexSet<ModuleId>;

/// Two sets are equal when they have the same size and every member of `a` is in `b`
pub fn sets_equal(a: &ModuleSet, b: &ModuleSet) -> bool {
  a.len() == b.len() && a.iter().all(|module_id| b.contains(module_id))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn set(ids: &[ModuleId]) -> ModuleSet {
    ids.iter().copied().collect()
  }

  #[test]
  fn equal_sets_in_any_order() {
    assert!(sets_equal(&set(&[1, 2, 3]), &set(&[3, 1, 2])));
    assert!(sets_equal(&set(&[]), &set(&[])));
  }

  #[test]
  fn subsets_are_not_equal() {
    assert!(!sets_equal(&set(&[1, 2]), &set(&[1, 2, 3])));
    assert!(!sets_equal(&set(&[1, 2, 3]), &set(&[1, 2])));
  }

  #[test]
  fn same_size_different_members_are_not_equal() {
    assert!(!sets_equal(&set(&[1, 2]), &set(&[1, 4])));
  }
}
