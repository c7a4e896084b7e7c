/// Column-name constants for the enrollment dataset.
/// Single source of truth - shared by the pipeline, the metric frames and the
/// Python bindings.

// ── Raw roster columns ──────────────────────────────────────────────────────
pub mod record {
    pub const DANCER_ID: &str = "DancerID";
    pub const FIRST_NAME: &str = "FirstName";
    pub const LAST_NAME: &str = "LastName";
    pub const PHONE: &str = "Phone";
    pub const EMAIL: &str = "Email";
    pub const ADDRESS: &str = "Address";
    pub const BIRTH_DATE: &str = "BirthDate";
    pub const YEAR: &str = "Year";
    pub const SEASON: &str = "Season";
    pub const SESSION: &str = "Session";
    pub const CLASS: &str = "Class";
    pub const LOCATION: &str = "Location";
    pub const TEACHER: &str = "Teacher";
    pub const CITY: &str = "City";
    pub const DAY: &str = "Day";
    pub const TIME: &str = "Time";
    pub const REG_NONREG: &str = "Reg/NonReg";
    pub const SOURCE: &str = "Source";

    /// Opaque string columns; added as all-null when a source omits them.
    pub const OPTIONAL: [&str; 13] = [
        FIRST_NAME, LAST_NAME, PHONE, EMAIL, ADDRESS, CLASS, LOCATION, TEACHER, CITY, DAY, TIME,
        REG_NONREG, SOURCE,
    ];

    /// Columns every source must provide.
    pub const REQUIRED: [&str; 4] = [BIRTH_DATE, YEAR, SEASON, SESSION];
}

// ── Derived columns ─────────────────────────────────────────────────────────
pub mod derived {
    pub const ROW_ID: &str = "row_id";
    pub const SCHOOL_YEAR: &str = "School Year";
    pub const SCHOOL_YEAR_STRING: &str = "School Year String";
    pub const AGE: &str = "Age";
    pub const SEASON_ORDER: &str = "Season_Order";
    pub const SORT_KEY_CANONICAL: &str = "SortKey";
    pub const X_AXIS_LABEL: &str = "x_axisLabel";
    pub const SORT_KEY: &str = "Sort_Key";
    pub const SESSION_INDEX: &str = "Session_Index";
}

// ── Metric columns ──────────────────────────────────────────────────────────
pub mod metrics {
    pub const GROUP: &str = "Group";
    pub const NUMBER_OF_DANCERS: &str = "Number of Dancers";
    pub const NUMBER_OF_UNIQUE_DANCERS: &str = "Number of Unique Dancers";
    pub const NUMBER_OF_NEW_STUDENTS: &str = "Number of New Students";
    pub const NEW_STUDENT_PCT: &str = "New Student %";
    pub const RETAINED_STUDENTS: &str = "Retained Students";
    pub const RETENTION_PCT: &str = "Retention %";
    pub const NUMBER_OF_CLASSES: &str = "Number of Classes";
    pub const ENROLLMENT_PCT: &str = "Enrollment %";
}

// ── Camp report columns ─────────────────────────────────────────────────────
pub mod camps {
    pub const APPEARING_EARLIER: &str = "Dancers Appearing Earlier";
    pub const FROM_PREVIOUS_CAMP: &str = "Dancers from Y-1 in Y";
}

// ── Display mode values ─────────────────────────────────────────────────────
pub mod mode {
    pub const ALL_TIME: &str = "All Time";
    pub const INTRA_YEAR: &str = "Intra Year";
    pub const SESSION_CONSECUTIVE: &str = "Session (Consecutive)";
}
