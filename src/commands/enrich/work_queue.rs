use super::*;

/// Sums weights per repository across every input row, drops identifiers
/// without an owner separator, and orders by weight descending then
/// repository ascending.
pub(super) fn build_work_queue(rows: impl IntoIterator<Item = CountRow>) -> Vec<WorkItem> {
    let mut totals: BTreeMap<RepoRef, u64> = BTreeMap::new();
    for row in rows {
        let weight = totals.entry(RepoRef::new(row.repo)).or_default();
        *weight = weight.saturating_add(row.count);
    }

    let mut items: Vec<WorkItem> = totals
        .into_iter()
        .filter(|(repo, _)| repo.has_owner_separator())
        .map(|(repo, weight)| WorkItem { repo, weight })
        .collect();

    items.sort_by(|a, b| b.weight.cmp(&a.weight).then_with(|| a.repo.cmp(&b.repo)));
    items
}

pub(super) fn load_count_tables(paths: &[PathBuf]) -> Result<Vec<CountRow>> {
    let mut rows = Vec::new();
    for path in paths {
        let table = read_count_rows(path)?;
        info!(path = %path.display(), rows = table.len(), "loaded count table");
        rows.extend(table);
    }
    Ok(rows)
}

/// Membership filter; order of `items` is preserved.
pub(super) fn remove_done(items: Vec<WorkItem>, done: &HashSet<RepoRef>) -> Vec<WorkItem> {
    items
        .into_iter()
        .filter(|item| !done.contains(&item.repo))
        .collect()
}
