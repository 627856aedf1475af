//! Macro for implementing Display and FromStr for wire-name enums
//!
//! Several small enums (token states, grant types, filter styles) travel as
//! lowercase strings in configuration files and request bodies. This macro
//! provides both conversions from a single mapping table with
//! case-insensitive parsing.
//!
//! # Example
//!
//! ```rust
//! use ledgerbridge_domain::impl_wire_name_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Scheme {
//!     Http,
//!     Https,
//! }
//!
//! impl_wire_name_conversions!(Scheme {
//!     Http => "http",
//!     Https => "https",
//! });
//!
//! assert_eq!(Scheme::Https.to_string(), "https");
//! assert_eq!("HTTP".parse::<Scheme>().unwrap(), Scheme::Http);
//! ```

/// Implements Display and FromStr traits for wire-name enums
///
/// * `$enum_name` - The name of the enum type
/// * `$variant => $str` - Mapping of enum variants to their lowercase wire
///   names
#[macro_export]
macro_rules! impl_wire_name_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl ::std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($str),)+
                }
            }
        }

        impl ::std::str::FromStr for $enum_name {
            type Err = ::std::string::String;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($str => ::std::result::Result::Ok(Self::$variant),)+
                    _ => ::std::result::Result::Err(::std::format!(
                        "Invalid {}: {}",
                        ::std::stringify!($enum_name),
                        s
                    )),
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Grant {
        AuthorizationCode,
        RefreshToken,
    }

    impl_wire_name_conversions!(Grant {
        AuthorizationCode => "authorization_code",
        RefreshToken => "refresh_token",
    });

    #[test]
    fn displays_wire_names() {
        assert_eq!(Grant::AuthorizationCode.to_string(), "authorization_code");
        assert_eq!(Grant::RefreshToken.to_string(), "refresh_token");
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!(Grant::from_str("REFRESH_TOKEN").unwrap(), Grant::RefreshToken);
        assert_eq!(Grant::from_str("Authorization_Code").unwrap(), Grant::AuthorizationCode);
    }

    #[test]
    fn rejects_unknown_names() {
        let result = Grant::from_str("password");
        assert!(result.unwrap_err().contains("Invalid Grant: password"));
        assert!(Grant::from_str("").is_err());
    }

    mod with_local_result_alias {
        use std::str::FromStr;

        #[allow(dead_code)]
        type Result<T> = std::result::Result<T, ()>;

        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        enum Style {
            Nested,
            Flat,
        }

        impl_wire_name_conversions!(Style {
            Nested => "nested",
            Flat => "flat",
        });

        #[test]
        fn expands_beside_a_crate_result_alias() {
            assert_eq!(Style::from_str("FLAT").unwrap(), Style::Flat);
            assert_eq!(Style::Nested.to_string(), "nested");
            assert!(Style::from_str("deep").unwrap_err().contains("Invalid Style"));
        }
    }
}
