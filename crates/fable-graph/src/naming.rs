//! Next-id suggestions for scenes created after an existing one.

/// Suggest the id following `parent_id` by incrementing its trailing number.
///
/// `w_009` becomes `w_010`, keeping the digit width. Ids for which `taken`
/// returns `true` are skipped. Returns `None` when `parent_id` has no
/// trailing digits or nothing before them.
///
/// ```
/// use fable_graph::naming::suggest_next_id;
///
/// assert_eq!(suggest_next_id("w_009", |_| false).as_deref(), Some("w_010"));
/// assert_eq!(suggest_next_id("w_001", |id| id == "w_002").as_deref(), Some("w_003"));
/// assert_eq!(suggest_next_id("intro", |_| false), None);
/// ```
pub fn suggest_next_id(parent_id: &str, taken: impl Fn(&str) -> bool) -> Option<String> {
    let digits_at = parent_id
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)?;
    let (prefix, digits) = parent_id.split_at(digits_at);
    if prefix.is_empty() {
        return None;
    }

    let width = digits.len();
    let mut n: u64 = digits.parse().ok()?;
    loop {
        n = n.checked_add(1)?;
        let candidate = format!("{prefix}{n:0width$}");
        if !taken(&candidate) {
            return Some(candidate);
        }
    }
}
