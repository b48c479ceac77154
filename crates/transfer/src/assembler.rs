/// Concatenates fragments in the order given.
///
/// No deduplication and no gap detection: the output is exactly the
/// fragments laid end to end.
pub fn assemble(fragments: Vec<Vec<u8>>) -> Vec<u8> {
    if fragments.len() == 1 {
        return fragments.into_iter().next().unwrap_or_default();
    }

    let total: usize = fragments.iter().map(Vec::len).sum();
    let mut out = Vec::with_capacity(total);
    for fragment in &fragments {
        out.extend_from_slice(fragment);
    }
    out
}
