// Profile derivation - pure functions, no side effects

/// Fixed avatar palette; a name always hashes to the same slot.
const AVATAR_PALETTE: [&str; 12] = [
    "#FF6B9D", "#C44569", "#FFC312", "#F79F1F", "#12CBC4", "#0652DD",
    "#9980FA", "#FDA7DF", "#ED4C67", "#B53471", "#EE5A6F", "#5F27CD",
];

/// Derive display initials from a name.
///
/// Two or more words yield first letter of the first and last word;
/// a single word yields its first two characters. Always uppercase.
pub fn initials(name: &str) -> String {
    let words: Vec<&str> = name.split_whitespace().collect();
    if words.len() >= 2 {
        let first = words[0].chars().next();
        let last = words[words.len() - 1].chars().next();
        first
            .into_iter()
            .chain(last)
            .collect::<String>()
            .to_uppercase()
    } else {
        name.trim().chars().take(2).collect::<String>().to_uppercase()
    }
}

/// Pick an avatar color for a name. Deterministic: the same name
/// always lands on the same palette entry.
pub fn avatar_color(name: &str) -> &'static str {
    let hash = name
        .bytes()
        .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(u32::from(b)));
    AVATAR_PALETTE[(hash % AVATAR_PALETTE.len() as u32) as usize]
}

/// Minimal shape check for email addresses: one '@', a non-empty local
/// part, and a dotted domain. Not an RFC validator.
pub fn is_valid_email(email: &str) -> bool {
    if email.is_empty() || email.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty()
                && domain.len() >= 3
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        _ => false,
    }
}
