/// Lenient numeric coercion for dataset cells.
///
/// Returns `None` for anything that is not a finite number: empty cells,
/// `NaN`, World Bank style `..` placeholders. A lone comma is accepted as the
/// decimal separator (`"3,5"`), matching semicolon-delimited exports.
pub fn parse_number(cell: &str) -> Option<f64> {
    let s = cell.trim().trim_matches('"').trim();
    if s.is_empty() {
        return None;
    }
    let s = s.strip_suffix('%').unwrap_or(s).trim_end();

    let parsed = if !s.contains('.') && s.matches(',').count() == 1 {
        s.replace(',', ".").parse::<f64>().ok()
    } else {
        s.parse::<f64>().ok()
    };
    parsed.filter(|v| v.is_finite())
}

pub fn json_number(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        serde_json::Value::String(s) => parse_number(s),
        _ => None,
    }
}
