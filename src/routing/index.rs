//! Root route index for coarse, longest-prefix-first dispatch.

use crate::routing::route::RouteGroup;

/// Root path of one route group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootRoute {
    /// Host plus static prefix before the first parameter.
    pub path: String,
    /// Byte length of `path`.
    pub length: usize,
    /// Position of the group in the route table.
    pub index: usize,
}

/// Derive root entries from `groups`, longest first.
///
/// The sort is stable: equal lengths keep group order.
pub fn build_index(groups: &[RouteGroup]) -> Vec<RootRoute> {
    let mut index: Vec<RootRoute> = groups
        .iter()
        .enumerate()
        .map(|(index, group)| {
            let path = group.root_path();
            RootRoute {
                length: path.len(),
                path,
                index,
            }
        })
        .collect();
    index.sort_by(|a, b| b.length.cmp(&a.length));
    index
}

/// Find the group whose root prefixes `url`.
///
/// One extra byte past the root is compared so that root `posts` does not
/// claim `posts-other/1`: the URL must either end at the root or continue
/// with `/`.
pub fn find_group_index(index: &[RootRoute], url: &str) -> Option<usize> {
    let url = url.as_bytes();
    index
        .iter()
        .find(|entry| {
            let end = (entry.length + 1).min(url.len());
            let prefix = &url[..end];
            let root = entry.path.as_bytes();
            prefix == root || (prefix.len() == root.len() + 1 && prefix.starts_with(root) && prefix[root.len()] == b'/')
        })
        .map(|entry| entry.index)
}
