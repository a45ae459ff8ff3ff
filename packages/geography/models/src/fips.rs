//! US state FIPS code utilities.
//!
//! One table of (FIPS, abbreviation, name) for the 50 states + DC, with
//! lookups in both directions. Filter parsing accepts either form, so
//! callers can say `--state CA` or `--state 06` interchangeably.

/// (FIPS code, postal abbreviation, full name) for the 50 states + DC.
pub const STATES: &[(&str, &str, &str)] = &[
    ("01", "AL", "Alabama"),
    ("02", "AK", "Alaska"),
    ("04", "AZ", "Arizona"),
    ("05", "AR", "Arkansas"),
    ("06", "CA", "California"),
    ("08", "CO", "Colorado"),
    ("09", "CT", "Connecticut"),
    ("10", "DE", "Delaware"),
    ("11", "DC", "District of Columbia"),
    ("12", "FL", "Florida"),
    ("13", "GA", "Georgia"),
    ("15", "HI", "Hawaii"),
    ("16", "ID", "Idaho"),
    ("17", "IL", "Illinois"),
    ("18", "IN", "Indiana"),
    ("19", "IA", "Iowa"),
    ("20", "KS", "Kansas"),
    ("21", "KY", "Kentucky"),
    ("22", "LA", "Louisiana"),
    ("23", "ME", "Maine"),
    ("24", "MD", "Maryland"),
    ("25", "MA", "Massachusetts"),
    ("26", "MI", "Michigan"),
    ("27", "MN", "Minnesota"),
    ("28", "MS", "Mississippi"),
    ("29", "MO", "Missouri"),
    ("30", "MT", "Montana"),
    ("31", "NE", "Nebraska"),
    ("32", "NV", "Nevada"),
    ("33", "NH", "New Hampshire"),
    ("34", "NJ", "New Jersey"),
    ("35", "NM", "New Mexico"),
    ("36", "NY", "New York"),
    ("37", "NC", "North Carolina"),
    ("38", "ND", "North Dakota"),
    ("39", "OH", "Ohio"),
    ("40", "OK", "Oklahoma"),
    ("41", "OR", "Oregon"),
    ("42", "PA", "Pennsylvania"),
    ("44", "RI", "Rhode Island"),
    ("45", "SC", "South Carolina"),
    ("46", "SD", "South Dakota"),
    ("47", "TN", "Tennessee"),
    ("48", "TX", "Texas"),
    ("49", "UT", "Utah"),
    ("50", "VT", "Vermont"),
    ("51", "VA", "Virginia"),
    ("53", "WA", "Washington"),
    ("54", "WV", "West Virginia"),
    ("55", "WI", "Wisconsin"),
    ("56", "WY", "Wyoming"),
];

/// Maps a two-digit FIPS code to the postal abbreviation.
#[must_use]
pub fn state_abbr(fips: &str) -> Option<&'static str> {
    STATES
        .iter()
        .find(|(code, _, _)| *code == fips)
        .map(|(_, abbr, _)| *abbr)
}

/// Maps a two-digit FIPS code to the full state name.
#[must_use]
pub fn state_name(fips: &str) -> Option<&'static str> {
    STATES
        .iter()
        .find(|(code, _, _)| *code == fips)
        .map(|(_, _, name)| *name)
}

/// Resolves a state given as either a FIPS code ("06") or a postal
/// abbreviation ("CA", case-insensitive) to its FIPS code.
#[must_use]
pub fn state_fips(state: &str) -> Option<&'static str> {
    let upper = state.to_ascii_uppercase();
    STATES
        .iter()
        .find(|(code, abbr, _)| *code == upper || *abbr == upper)
        .map(|(code, _, _)| *code)
}

/// Derives the state FIPS from any GEOID (first 2 characters).
#[must_use]
pub fn state_fips_of_geoid(geoid: &str) -> Option<&str> {
    geoid.get(..2)
}

/// Derives the county GEOID from a tract or finer GEOID (first 5
/// characters).
#[must_use]
pub fn county_geoid_of(geoid: &str) -> Option<&str> {
    geoid.get(..5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_by_fips() {
        assert_eq!(state_abbr("11"), Some("DC"));
        assert_eq!(state_name("06"), Some("California"));
        assert_eq!(state_abbr("03"), None);
    }

    #[test]
    fn resolves_abbr_or_fips() {
        assert_eq!(state_fips("CA"), Some("06"));
        assert_eq!(state_fips("ca"), Some("06"));
        assert_eq!(state_fips("06"), Some("06"));
        assert_eq!(state_fips("ZZ"), None);
    }

    #[test]
    fn geoid_prefixes() {
        assert_eq!(state_fips_of_geoid("11001000100"), Some("11"));
        assert_eq!(county_geoid_of("11001000100"), Some("11001"));
        assert_eq!(county_geoid_of("1"), None);
    }
}
