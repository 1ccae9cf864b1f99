#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use valtrack_core::path;

#[derive(Arbitrary, Debug)]
struct Input {
    child: String,
    rest: String,
    prefixes: Vec<String>,
}

fuzz_target!(|input: Input| {
    if input.child.is_empty()
        || input.rest.is_empty()
        || input.child.contains(path::SEPARATOR)
        || input.prefixes.len() > 16
    {
        return;
    }

    let parent_path = path::join(&input.child, &input.rest);
    let at_parent = path::matches_any(&parent_path, &input.prefixes);
    let at_child = path::for_child(&input.child, Some(&input.prefixes[..]))
        .is_some_and(|translated| path::matches_any(&input.rest, &translated));
    assert_eq!(at_parent, at_child, "for_child disagrees for {parent_path:?}");

    let translated = path::for_parent(&input.child, &input.prefixes);
    assert_eq!(
        path::matches_any(&input.rest, &input.prefixes),
        path::matches_any(&parent_path, &translated),
        "for_parent disagrees for {parent_path:?}"
    );
});
