/// Display names for the most traded BVMT listings, keyed by ISIN.
pub const STOCK_NAMES: &[(&str, &str)] = &[
    ("TN0001600154", "ATTIJARI BANK"),
    ("TN0001800457", "BIAT"),
    ("TN0001900604", "BH BANK"),
    ("TN0002200053", "BT"),
    ("TN0002600955", "STB"),
    ("TN0003100609", "BNA"),
    ("TN0003400058", "AMEN BANK"),
    ("TN0003600350", "ATB"),
    ("TN0005700018", "POULINA GP HOLDING"),
    ("TN0001100254", "SFBT"),
    ("TN0003200755", "ICF"),
    ("TN0009400151", "TUNIS RE"),
    ("TN0004800056", "SOTUVER"),
    ("TN0005800057", "TUNISIE LEASING"),
];

pub fn known_stock_name(code: &str) -> Option<&'static str> {
    STOCK_NAMES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_names() {
        assert_eq!(known_stock_name("TN0001800457"), Some("BIAT"));
        assert_eq!(known_stock_name("TN0000000000"), None);
    }
}
