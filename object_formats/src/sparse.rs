//! Sparse index lists such as `headIndex=0,3` or `useVanishIndex=-1`.

use crate::scan::Scan;

/// Formats the set indices of `flags` as `name=i,j,...`, or `name=-1` when
/// nothing is set.
pub fn encode_sparse<I>(name: &str, flags: I) -> String
where
    I: IntoIterator<Item = bool>,
{
    let indices: Vec<String> = flags
        .into_iter()
        .enumerate()
        .filter(|(_, set)| *set)
        .map(|(index, _)| index.to_string())
        .collect();

    if indices.is_empty() {
        format!("{name}=-1")
    } else {
        format!("{name}={}", indices.join(","))
    }
}

/// Decodes a sparse index line into a flag vector of length `len`.
///
/// Indices outside `0..len` are ignored. A line that does not carry `name`
/// or has no `=` yields all-false flags.
pub fn decode_sparse(name: &str, line: &str, len: usize) -> Vec<bool> {
    let mut flags = vec![false; len];
    if !line.contains(name) {
        log::debug!("expected sparse list {name} in line {line:?}");
        return flags;
    }
    let Some((_, list)) = line.split_once('=') else {
        log::debug!("sparse list {name} missing '=' in line {line:?}");
        return flags;
    };

    for part in list.split(',') {
        let index = Scan::new(part).int().unwrap_or(-1);
        if index >= 0 && (index as usize) < len {
            flags[index as usize] = true;
        }
    }
    flags
}
