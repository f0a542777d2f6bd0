//! Splitting of free-text creator fields into individual names.

/// Split a creator field into the names it refers to.
///
/// The field is split on commas. Two tokens without inner whitespace are a
/// single `"Last, First"` name; two tokens where either has whitespace are
/// two full names. More than two whitespace-free tokens of even count are
/// grouped pairwise into `"Last, First"` names. Anything else is one name
/// per token.
///
/// An odd number of whitespace-free tokens (`"A, B, C"`) falls into the
/// last case, which may not be what the submitter meant.
///
/// Exact repeats are dropped, keeping first occurrence order.
pub fn split_creator_names(raw: &str) -> Vec<String> {
    let tokens: Vec<&str> = raw
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect();

    let has_space = |t: &&str| t.contains(char::is_whitespace);

    let names: Vec<String> = match tokens.len() {
        0 => Vec::new(),
        1 => vec![tokens[0].to_string()],
        2 if !tokens.iter().any(has_space) => vec![format!("{}, {}", tokens[0], tokens[1])],
        n if n > 2 && n % 2 == 0 && !tokens.iter().any(has_space) => tokens
            .chunks(2)
            .map(|pair| format!("{}, {}", pair[0], pair[1]))
            .collect(),
        _ => tokens.iter().map(|t| t.to_string()).collect(),
    };

    let mut unique: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        if !unique.contains(&name) {
            unique.push(name);
        }
    }
    unique
}
