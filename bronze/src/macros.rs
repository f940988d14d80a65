//! Macros for building and returning [`crate::error::BronzeError`] values.

/// Creates a [`crate::error::BronzeError`] from an error kind, a static description and an
/// optional detail.
#[macro_export]
macro_rules! bronze_error {
    ($kind:expr, $desc:expr) => {
        $crate::error::BronzeError::from(($kind, $desc))
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        $crate::error::BronzeError::from(($kind, $desc, $detail.to_string()))
    };
}

/// Returns early with a [`crate::error::BronzeError`] built by [`bronze_error!`].
#[macro_export]
macro_rules! bail {
    ($kind:expr, $desc:expr) => {
        return Err($crate::bronze_error!($kind, $desc))
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        return Err($crate::bronze_error!($kind, $desc, $detail))
    };
}
