use crate::StableStore;

use pretty_assertions::assert_eq;

/// test_stable_store_trait runs the checks every StableStore impl must pass.
pub fn test_stable_store_trait(eng: &mut dyn StableStore) {
    let base = eng.appended();

    eng.append(b"").unwrap();
    assert_eq!(base, eng.appended());

    eng.append(&[1, 2, 3]).unwrap();
    assert_eq!(base + 3, eng.appended());

    eng.sync().unwrap();
    eng.sync().unwrap();

    eng.append(&[4; 100]).unwrap();
    assert_eq!(base + 103, eng.appended());
    eng.sync().unwrap();
}
