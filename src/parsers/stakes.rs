/// Stakes for a poker session, split from user input like "1/2" or "0.5/1".
///
/// Parsing is deliberately lenient: whatever was typed is preserved verbatim
/// in `raw`, and the small/big numerics are only populated for the halves
/// that actually parse. A malformed stakes string never fails the command.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Stakes {
    pub small: Option<f64>,
    pub big: Option<f64>,
    pub raw: Option<String>,
}

pub fn parse_stakes(input: &str) -> Stakes {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Stakes::default();
    }

    let mut parts = trimmed.split('/');
    let small = parts.next().and_then(|p| p.trim().parse::<f64>().ok());
    let big = parts.next().and_then(|p| p.trim().parse::<f64>().ok());

    Stakes {
        small,
        big,
        raw: Some(trimmed.to_string()),
    }
}
