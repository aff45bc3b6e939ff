//! Macros for declaring event identifiers.

/// Declare event identifier constants, checked against the user range at
/// compile time.
///
/// # Example
///
/// ```
/// use statewright::event_ids;
///
/// event_ids! {
///     pub POWER = 1;
///     pub PLAY = 2;
///     STOP = 3;
/// }
///
/// assert_eq!(POWER.raw(), 1);
/// assert_eq!(STOP.raw(), 3);
/// ```
#[macro_export]
macro_rules! event_ids {
    (
        $(
            $(#[$meta:meta])*
            $vis:vis $name:ident = $value:expr;
        )*
    ) => {
        $(
            $(#[$meta])*
            $vis const $name: $crate::core::EventId = {
                assert!($value <= $crate::core::EventId::MAX_USER, "event id outside the user range");
                $crate::core::EventId::new($value)
            };
        )*
    };
}
