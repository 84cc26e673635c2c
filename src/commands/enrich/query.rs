use super::*;

const REPOSITORY_FIELDS: &str = "nameWithOwner isFork primaryLanguage {name}";

/// One aliased `repository` lookup per well-formed item. The alias is the
/// item's position in the chunk, so skipped items leave alias gaps.
pub(super) fn build_query(chunk: &Chunk<'_>) -> String {
    let mut lines = vec!["query {".to_string()];
    for (index, item) in chunk.items.iter().enumerate() {
        let Some((owner, name)) = item.repo.owner_and_name() else {
            continue;
        };
        lines.push(format!(
            "  r{index}: repository(owner: {}, name: {}) {{{REPOSITORY_FIELDS}}}",
            graphql_string(owner),
            graphql_string(name),
        ));
    }
    lines.push("}".to_string());
    lines.join("\n")
}

pub(super) fn query_repo_count(chunk: &Chunk<'_>) -> usize {
    chunk
        .items
        .iter()
        .filter(|item| item.repo.owner_and_name().is_some())
        .count()
}

/// JSON string literals are valid GraphQL string literals.
fn graphql_string(value: &str) -> String {
    Value::String(value.to_string()).to_string()
}
