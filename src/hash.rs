use std::hash::Hash;

use siphasher::sip128::{Hasher128, SipHasher13};

/// Produce a 128-bit fingerprint of a value.
///
/// Used to recognize a repeated override choice context without keeping the
/// context itself around.
#[inline]
pub fn fingerprint<T: Hash + ?Sized>(value: &T) -> u128 {
    let mut state = SipHasher13::new();
    value.hash(&mut state);
    state.finish128().as_u128()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path;

    #[test]
    fn test_fingerprint_distinguishes_paths() {
        assert_eq!(fingerprint(&path![1, 2]), fingerprint(&path![1, 2]));
        assert_ne!(fingerprint(&path![1, 2]), fingerprint(&path![2, 1]));
    }
}
