//! Column names used across the pipeline.
//!
//! Raw names follow the IPUMS CPS variable names of the Basic Monthly extract.
//! Derived names are the columns each stage appends.

pub const YEAR: &str = "YEAR";
pub const MONTH: &str = "MONTH";
pub const STATE: &str = "STATEFIP";
pub const AGE: &str = "AGE";
pub const SEX: &str = "SEX";
pub const EDUCATION: &str = "EDUC";
pub const EMPLOYMENT_STATUS: &str = "EMPSTAT";
pub const ABSENT: &str = "ABSENT";
pub const ABSENCE_REASON: &str = "WHYABSNT";
pub const WEEKLY_HOURS: &str = "UHRSWORKT";
pub const WORKER_CLASS: &str = "CLASSWKR";
pub const INDUSTRY: &str = "IND";
pub const OCCUPATION: &str = "OCC";
pub const NUM_CHILDREN: &str = "NCHILD";
pub const NUM_CHILDREN_UNDER5: &str = "NCHLT5";
pub const MOTHER_LINK: &str = "MOMLOC";
pub const FATHER_LINK: &str = "POPLOC";

pub const OWN_ILL_ABSENT: &str = "own_ill_absent";
pub const IS_PARENT: &str = "is_parent";
pub const HAS_CHILD_UNDER5: &str = "has_child_under5";
pub const RATE: &str = "rate";
pub const N_OBS: &str = "n_obs";
pub const MONTH_ID: &str = "month_id";
pub const P1: &str = "P1";
pub const P2: &str = "P2";
pub const P3: &str = "P3";
pub const PARENT_RATE: &str = "parent_rate";
pub const NON_PARENT_RATE: &str = "non_parent_rate";
pub const GAP: &str = "gap";

/// Raw fields the recoder coerces to nullable integers when present.
pub const RECODED_FIELDS: &[&str] = &[
    YEAR,
    MONTH,
    STATE,
    AGE,
    SEX,
    EDUCATION,
    EMPLOYMENT_STATUS,
    ABSENT,
    ABSENCE_REASON,
    WEEKLY_HOURS,
    WORKER_CLASS,
    INDUSTRY,
    OCCUPATION,
    NUM_CHILDREN,
    NUM_CHILDREN_UNDER5,
    MOTHER_LINK,
    FATHER_LINK,
];

/// Fields the own-illness flag cannot be derived without.
pub const RECODE_REQUIRED: &[&str] = &[YEAR, ABSENT, ABSENCE_REASON];

/// Household-composition fields behind the parent flags.
pub const PARENT_REQUIRED: &[&str] = &[NUM_CHILDREN, NUM_CHILDREN_UNDER5, MOTHER_LINK, FATHER_LINK];
