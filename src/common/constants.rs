/// Spider name constants to ensure consistency across the codebase
// Spider names (used in CLI, ids and feed file names)
pub const CHI_BUILDINGS_SPIDER: &str = "chi_buildings";

// Agency names
pub const CHI_BUILDINGS_AGENCY_NAME: &str = "Public Building Commission of Chicago";

// Timezones
pub const CHICAGO_TIMEZONE: &str = "America/Chicago";

/// Placeholder used in record ids when the agency publishes no meeting id
pub const MISSING_AGENCY_ID: &str = "x";

/// Meetings starting within this many days are considered confirmed
pub const CONFIRMED_WINDOW_DAYS: i64 = 7;

/// Get all supported spider names
pub fn get_supported_spiders() -> Vec<&'static str> {
    vec![CHI_BUILDINGS_SPIDER]
}
