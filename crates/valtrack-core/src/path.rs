#![forbid(unsafe_code)]

//! Bean paths and the prefix algebra.
//!
//! A bean path is a dot-separated property chain relative to some node, e.g.
//! `"inner.value"`. Dirty-state queries and mutations take a list of path
//! *prefixes*; an empty list means "everything".
//!
//! Every node stores its dirty paths in its own coordinate space, so a prefix
//! list has to be translated whenever a change crosses a parent/child edge:
//!
//! - [`for_parent`] prepends the path by which an ancestor reaches the node.
//! - [`for_child`] strips the child's property name, or reports that the
//!   prefixes cannot apply to that child at all.
//!
//! # Invariants
//!
//! 1. For every prefix list `P` and child property `c`, a parent path
//!    `c.x` matches `P` iff the child path `x` matches `for_child(c, P)`
//!    (when `for_child` returns `None`, no `c.x` matches `P`).
//! 2. A child path `x` matches `P` iff the parent path `s.x` matches
//!    `for_parent(s, P)`.
//! 3. Both functions are pure.

/// Separator between property names in a bean path.
pub const SEPARATOR: char = '.';

/// Join a parent path and a property name.
///
/// The empty path denotes the node itself, so `join("", "a") == "a"`.
#[must_use]
pub fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_owned()
    } else {
        let mut out = String::with_capacity(parent.len() + 1 + name.len());
        out.push_str(parent);
        out.push(SEPARATOR);
        out.push_str(name);
        out
    }
}

/// Whether `path` falls under any of `prefixes`.
///
/// An empty prefix list matches every path. Matching is a plain string prefix
/// test, so `"inner"` matches both `"inner"` and `"inner.value"`.
#[must_use]
pub fn matches_any<S: AsRef<str>>(path: &str, prefixes: &[S]) -> bool {
    prefixes.is_empty() || prefixes.iter().any(|p| path.starts_with(p.as_ref()))
}

/// Translate prefixes from a node into the coordinate space of an ancestor
/// that reaches the node through `source_path`.
///
/// "Everything here" narrows to "everything under this node" from the
/// ancestor's point of view.
#[must_use]
pub fn for_parent<S: AsRef<str>>(source_path: &str, prefixes: &[S]) -> Vec<String> {
    let mut base = String::with_capacity(source_path.len() + 1);
    base.push_str(source_path);
    base.push(SEPARATOR);
    if prefixes.is_empty() {
        return vec![base];
    }
    prefixes
        .iter()
        .map(|p| {
            let mut out = base.clone();
            out.push_str(p.as_ref());
            out
        })
        .collect()
}

/// Translate prefixes from a node into the coordinate space of its child
/// reached through the property `child_path`.
///
/// `None` input and an empty list both mean "everything" and come back as an
/// empty list. Returns `None` when no prefix can apply to the child, in which
/// case the caller skips the child's whole subtree.
///
/// A prefix that carries no separator after the child property but is a
/// string prefix of it (`"inner"`, `"in"` or `""` for `inner`) is not
/// skipped: it already matches every parent path `inner.x`, so it selects the
/// child's whole subtree. Skipping it would let `mark_clean(["inner"])` clean
/// the parent and leave the child dirty, breaking invariant 1.
#[must_use]
pub fn for_child<S: AsRef<str>>(child_path: &str, prefixes: Option<&[S]>) -> Option<Vec<String>> {
    let Some(prefixes) = prefixes else {
        return Some(Vec::new());
    };
    if prefixes.is_empty() {
        return Some(Vec::new());
    }

    let mut translated = Vec::with_capacity(prefixes.len());
    let mut everything = false;
    for prefix in prefixes {
        let prefix = prefix.as_ref();
        if let Some(rest) = prefix.strip_prefix(child_path)
            && let Some(rest) = rest.strip_prefix(SEPARATOR)
        {
            if rest.is_empty() {
                everything = true;
            } else {
                translated.push(rest.to_owned());
            }
        } else if child_path.starts_with(prefix) {
            // The prefix already covers the child property itself.
            everything = true;
        }
    }

    if everything {
        Some(Vec::new())
    } else if translated.is_empty() {
        None
    } else {
        Some(translated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn join_handles_root() {
        assert_eq!(join("", "inner"), "inner");
        assert_eq!(join("inner", "value"), "inner.value");
    }

    #[test]
    fn empty_prefixes_match_everything() {
        let none: [&str; 0] = [];
        assert!(matches_any("anything.at.all", &none));
    }

    #[test]
    fn prefix_matching_is_string_prefix() {
        assert!(matches_any("inner.value", &["inner"]));
        assert!(matches_any("inner", &["inner"]));
        assert!(matches_any("inner.value", &["other", "inner.va"]));
        assert!(!matches_any("value", &["inner"]));
    }

    #[test]
    fn for_parent_narrows_everything_to_subtree() {
        let none: [&str; 0] = [];
        assert_eq!(for_parent("inner", &none), strings(&["inner."]));
    }

    #[test]
    fn for_parent_prepends_source_path() {
        assert_eq!(
            for_parent("a.b", &["value", "other"]),
            strings(&["a.b.value", "a.b.other"])
        );
    }

    #[test]
    fn for_child_none_means_everything() {
        assert_eq!(for_child::<String>("inner", None), Some(Vec::new()));
        let none: [&str; 0] = [];
        assert_eq!(for_child("inner", Some(&none[..])), Some(Vec::new()));
    }

    #[test]
    fn for_child_strips_child_property() {
        assert_eq!(
            for_child("inner", Some(&["inner.value", "inner.deep.x"][..])),
            Some(strings(&["value", "deep.x"]))
        );
    }

    #[test]
    fn for_child_skips_unrelated_child() {
        assert_eq!(for_child("inner", Some(&["other.value", "value"][..])), None);
    }

    #[test]
    fn for_child_requires_separator_boundary() {
        assert_eq!(for_child("inner", Some(&["innerX.value"][..])), None);
    }

    #[test]
    fn for_child_drops_unmatched_slots() {
        assert_eq!(
            for_child("inner", Some(&["other", "inner.value"][..])),
            Some(strings(&["value"]))
        );
    }

    #[test]
    fn prefix_covering_child_property_means_everything() {
        assert_eq!(for_child("inner", Some(&["inner"][..])), Some(Vec::new()));
        assert_eq!(for_child("inner", Some(&["in"][..])), Some(Vec::new()));
        assert_eq!(for_child("inner", Some(&["inner."][..])), Some(Vec::new()));
        assert_eq!(for_child("inner", Some(&[""][..])), Some(Vec::new()));
    }

    #[test]
    fn parent_then_child_is_identity_for_specific_prefixes() {
        let prefixes = strings(&["value", "deep.x"]);
        let up = for_parent("inner", &prefixes);
        assert_eq!(for_child("inner", Some(&up[..])), Some(prefixes));
    }
}
