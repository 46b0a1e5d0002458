//! # Fault Options
//!
//! The set of independent fault toggles of the `buggy` pass and the parser for
//! the compact `name;no-name;...` parameter syntax.

use itertools::Itertools;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error for a parameter list containing an unknown option name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid buggy pass parameter '{token}'")]
pub struct ParseError {
    /// Segment which matched no option name (including a `no-` prefix if present)
    pub token: String,
    /// Unparsed tail of the input, starting with the offending segment
    pub remainder: String,
}

/// Accessor pair for one toggle of [`BuggyOptions`]
pub struct OptionField {
    pub name: &'static str,
    pub get: fn(&BuggyOptions) -> bool,
    pub set: fn(&mut BuggyOptions, bool),
}

macro_rules! buggy_options {
    ($($(#[$doc:meta])* $field:ident => $name:literal,)*) => {
        /// Armed fault behaviors of the `buggy` pass. All disabled by default.
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
        pub struct BuggyOptions {
            $($(#[$doc])* pub $field: bool,)*
        }

        /// Option name to field mapping, in canonical order
        pub const OPTION_FIELDS: &[OptionField] = &[
            $(OptionField {
                name: $name,
                get: |options| options.$field,
                set: |options, value| options.$field = value,
            },)*
        ];
    };
}

buggy_options! {
    /// Crash on any vector typed instruction
    crash_on_vector => "crash-on-vector",
    crash_on_shufflevector => "crash-on-shufflevector",
    /// Crash on phi nodes of struct or array type
    crash_on_aggregate_phi => "crash-on-aggregate-phi",
    /// Crash on phi nodes naming the same incoming block twice
    crash_on_repeated_phi_predecessor => "crash-on-repeated-phi-predecessor",
    crash_on_phi_self_reference => "crash-on-phi-self-reference",
    /// Crash on loads whose address is an inttoptr instruction
    crash_load_of_inttoptr => "crash-load-of-inttoptr",
    /// Crash on stores whose address is a constant expression
    crash_store_to_constantexpr => "crash-store-to-constantexpr",
    crash_switch_odd_number_cases => "crash-switch-odd-number-cases",
    crash_on_i1_select => "crash-on-i1-select",
    crash_if_weak_global_exists => "crash-if-weak-global-exists",
    /// Spin forever on calls without a statically known target
    infloop_on_indirect_call => "infloop-on-indirect-call",
    /// Only fire on functions with an odd number of instructions
    bug_only_if_odd_number_insts => "bug-only-if-odd-number-insts",
    bug_only_if_internal_func => "bug-only-if-internal-func",
    bug_only_if_external_func => "bug-only-if-external-func",
    /// Insert a call to unparseable inline asm into the entry block
    insert_unparseable_asm => "insert-unparseable-asm",
    /// Rewrite `icmp slt` into `icmp sle`
    miscompile_icmp_slt_to_sle => "miscompile-icmp-slt-to-sle",
    /// Crash on functions carrying the `buggy` attribute
    crash_on_buggy_attr => "crash-on-buggy-attr",
}

/// One `;` separated segment split into option name and polarity
struct Token<'a> {
    name: &'a str,
    enabled: bool,
}

impl<'a> Token<'a> {
    fn from_segment(segment: &'a str) -> Self {
        match segment.strip_prefix("no-") {
            Some(name) => Token {
                name,
                enabled: false,
            },
            None => Token {
                name: segment,
                enabled: true,
            },
        }
    }
}

impl BuggyOptions {
    /// Parse a `;` separated list of option names.
    ///
    /// A `no-` prefix disables the named option. Later segments override earlier
    /// ones, empty segments are skipped and the empty string yields the default.
    ///
    /// # Arguments
    ///
    /// * `raw` - The parameter list, e.g. `crash-on-vector;no-crash-on-i1-select`.
    ///
    /// # Returns
    ///
    /// * `Result<BuggyOptions, ParseError>` - The options, or the first unknown segment.
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        let mut options = Self::default();
        let mut rest = raw;
        while !rest.is_empty() {
            let (segment, tail) = rest.split_once(';').unwrap_or((rest, ""));
            if !segment.is_empty() {
                let token = Token::from_segment(segment);
                let field = OPTION_FIELDS
                    .iter()
                    .find(|field| field.name == token.name)
                    .ok_or_else(|| ParseError {
                        token: segment.to_string(),
                        remainder: rest.to_string(),
                    })?;
                (field.set)(&mut options, token.enabled);
            }
            rest = tail;
        }
        Ok(options)
    }

    /// Names of all armed options in canonical order
    pub fn enabled_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        OPTION_FIELDS
            .iter()
            .filter(|field| (field.get)(self))
            .map(|field| field.name)
    }

    /// All known option names
    pub fn names() -> impl Iterator<Item = &'static str> {
        OPTION_FIELDS.iter().map(|field| field.name)
    }

    pub fn any_enabled(&self) -> bool {
        self.enabled_names().next().is_some()
    }
}

impl FromStr for BuggyOptions {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Canonical parameter list of the armed options, parseable by [`BuggyOptions::parse`]
impl fmt::Display for BuggyOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.enabled_names().join(";"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_default() {
        assert_eq!(BuggyOptions::default(), BuggyOptions::parse("").unwrap());
        assert!(!BuggyOptions::default().any_enabled());
    }

    #[test]
    fn every_name_sets_exactly_its_field() {
        assert_eq!(17, OPTION_FIELDS.len());
        for field in OPTION_FIELDS {
            let options = BuggyOptions::parse(field.name).unwrap();
            assert!((field.get)(&options), "{} not set", field.name);
            assert_eq!(vec![field.name], options.enabled_names().collect::<Vec<_>>());
        }
    }

    #[test]
    fn last_occurrence_wins() {
        let options =
            BuggyOptions::parse("crash-on-vector;no-crash-on-vector;crash-on-i1-select").unwrap();
        assert!(!options.crash_on_vector);
        assert!(options.crash_on_i1_select);

        let options = BuggyOptions::parse("no-crash-on-vector;crash-on-vector").unwrap();
        assert!(options.crash_on_vector);
    }

    #[test]
    fn empty_segments_are_skipped() {
        let options = BuggyOptions::parse(";crash-on-vector;;insert-unparseable-asm;").unwrap();
        assert!(options.crash_on_vector);
        assert!(options.insert_unparseable_asm);
    }

    #[test]
    fn unknown_segment_reports_token_and_remainder() {
        let err = BuggyOptions::parse("crash-on-vector;crash-on-everything;no-crash-on-vector")
            .unwrap_err();
        assert_eq!("crash-on-everything", err.token);
        assert_eq!("crash-on-everything;no-crash-on-vector", err.remainder);
        assert_eq!(
            "invalid buggy pass parameter 'crash-on-everything'",
            err.to_string()
        );
    }

    #[test]
    fn names_are_case_sensitive() {
        assert!(BuggyOptions::parse("Crash-On-Vector").is_err());
        assert_eq!("no-bogus", BuggyOptions::parse("no-bogus").unwrap_err().token);
    }

    #[test]
    fn display_is_parseable() {
        let options: BuggyOptions = "crash-on-buggy-attr;miscompile-icmp-slt-to-sle"
            .parse()
            .unwrap();
        assert_eq!(
            "miscompile-icmp-slt-to-sle;crash-on-buggy-attr",
            options.to_string()
        );
        assert_eq!(options, options.to_string().parse().unwrap());
    }
}
