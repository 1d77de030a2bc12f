//! Macroses of application

/// Macro for building `ValidationErrors` out of field/code/message triples.
#[macro_export]
macro_rules! validation_errors {
    ({$($field:tt: [$($code:tt => $message:tt),*]),*}) => {{
        let mut errors = ::validator::ValidationErrors::new();
        $($(
            let error = ::validator::ValidationError {
                code: ::std::borrow::Cow::from($code),
                message: Some(::std::borrow::Cow::from($message)),
                params: ::std::collections::HashMap::new(),
            };
            errors.add($field, error);
        )*)*
        errors
    }};
}
