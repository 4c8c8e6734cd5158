/// How an aircraft type input was resolved to an ICAO designator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeResolution {
    /// Input was already ICAO-shaped and is passed through as-is.
    Authoritative(String),
    /// Matched a fragment in the lookup table.
    Inferred(String),
    /// Nothing matched. Callers decide whether to ask the pilot.
    Unknown,
}

impl TypeResolution {
    pub fn code(&self) -> Option<&str> {
        match self {
            TypeResolution::Authoritative(code) | TypeResolution::Inferred(code) => Some(code),
            TypeResolution::Unknown => None,
        }
    }
}

/// Maps free-text aircraft names ("Boeing 737-800 Zibo") to ICAO type
/// designators. Entries are ordered and the first matching fragment wins,
/// so more specific fragments must come before their prefixes ("a320neo"
/// before "a320"). The table is replaceable at construction time.
pub struct AircraftTypeTable {
    entries: Vec<(String, String)>,
}

impl AircraftTypeTable {
    pub fn new(entries: Vec<(String, String)>) -> Self {
        let entries = entries
            .into_iter()
            .map(|(fragment, code)| (fragment.to_lowercase(), code.to_uppercase()))
            .collect();
        Self { entries }
    }

    pub fn with_defaults() -> Self {
        Self::new(
            [
                ("a320neo", "A20N"),
                ("a321neo", "A21N"),
                ("a318", "A318"),
                ("a319", "A319"),
                ("a320", "A320"),
                ("a321", "A321"),
                ("a330-300", "A333"),
                ("a330", "A332"),
                ("a350", "A359"),
                ("a380", "A388"),
                ("737 max 8", "B38M"),
                ("737-700", "B737"),
                ("737-800", "B738"),
                ("737-900", "B739"),
                ("747-8", "B748"),
                ("747", "B744"),
                ("757", "B752"),
                ("767", "B763"),
                ("777-300", "B77W"),
                ("777", "B772"),
                ("787-9", "B789"),
                ("787", "B788"),
                ("crj-900", "CRJ9"),
                ("crj", "CRJ7"),
                ("e190", "E190"),
                ("e175", "E75L"),
                ("dash 8", "DH8D"),
                ("q400", "DH8D"),
                ("atr 72", "AT76"),
                ("king air 350", "B350"),
                ("caravan", "C208"),
                ("cessna 208", "C208"),
                ("cessna 172", "C172"),
                ("skyhawk", "C172"),
                ("sr22", "SR22"),
                ("tbm 9", "TBM9"),
            ]
            .into_iter()
            .map(|(f, c)| (f.to_string(), c.to_string()))
            .collect(),
        )
    }

    pub fn resolve(&self, input: &str) -> TypeResolution {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return TypeResolution::Unknown;
        }
        if is_icao_shaped(trimmed) {
            return TypeResolution::Authoritative(trimmed.to_uppercase());
        }
        let haystack = trimmed.to_lowercase();
        for (fragment, code) in &self.entries {
            if haystack.contains(fragment.as_str()) {
                return TypeResolution::Inferred(code.clone());
            }
        }
        TypeResolution::Unknown
    }
}

impl Default for AircraftTypeTable {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// 3-4 chars, leading letter, rest alphanumeric, e.g. "B738", "C172", "PC12".
fn is_icao_shaped(s: &str) -> bool {
    (3..=4).contains(&s.len())
        && s.chars()
            .next()
            .map(|c| c.is_ascii_alphabetic())
            .unwrap_or(false)
        && s.chars().skip(1).all(|c| c.is_ascii_alphanumeric())
}
