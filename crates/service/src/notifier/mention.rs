/// Gitea usernames `@mentioned` in a comment body, first occurrence order.
/// Quoted lines (starting with `>`) are skipped so replies do not re-notify.
pub fn mentioned_usernames(body: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let words = body
        .lines()
        .map(str::trim_start)
        .filter(|line| !line.starts_with('>'))
        .flat_map(str::split_whitespace);

    for word in words {
        if !word.starts_with('@') {
            continue;
        }
        let name = word
            .trim_start_matches('@')
            .trim_end_matches(|c| matches!(c, ',' | '.' | ':' | ';' | '!' | '?' | ')'));
        if !name.is_empty() && !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}
