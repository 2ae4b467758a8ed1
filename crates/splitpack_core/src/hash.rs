use xxhash_rust::xxh3::Xxh3;

/// Order-insensitive fingerprint of a set of node handles.
///
/// Equal sets always produce equal fingerprints; the converse does not hold, so callers must
/// confirm a fingerprint match with a real set comparison.
pub fn fingerprint_handles<I>(handles: I) -> u64
where
  I: IntoIterator<Item = usize>,
{
  let mut sorted = handles.into_iter().collect::<Vec<_>>();
  sorted.sort_unstable();

  let mut hasher = Xxh3::new();
  for handle in sorted {
    hasher.update(&(handle as u64).to_le_bytes());
  }
  hasher.digest()
}
