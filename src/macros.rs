//! Macros for constructing [`Document`]s and [`Bson`] arrays from literal syntax.

/// Converts one value token tree into a [`Bson`], recursing into `{ ... }` and `[ ... ]` so that
/// [`doc!`] and [`array!`] literals can nest freely.
#[doc(hidden)]
#[macro_export]
macro_rules! bson_value {
    ({ $($key:expr => $val:tt),* $(,)? }) => {
        $crate::Bson::Document($crate::doc!{ $($key => $val),* })
    };
    ([ $($val:tt),* $(,)? ]) => {
        $crate::array!( $($val),* )
    };
    ($val:expr) => {
        $crate::Bson::from($val)
    };
}

/// Constructs a [`Document`] from a list of `key => value` pairs.
///
/// Values may be plain expressions, `{ ... }` for a nested document, or `[ ... ]` for an array:
///
/// ```
/// use bsonx::doc;
///
/// let d = doc! {
///     "name" => "ferris",
///     "tags" => ["rust", "crab"],
///     "meta" => { "active" => true },
/// };
/// ```
///
/// A literal with a repeated key panics: this is the one place in the crate where malformed
/// input is a programmer error rather than a recoverable [`crate::error::Error`].
#[macro_export]
macro_rules! doc {
    () => {{
        $crate::Document::new()
    }};
    ( $($key:expr => $val:tt),+ $(,)? ) => {{
        let mut document = $crate::Document::new();
        $(
            let key = $key.to_string();
            if document.contains_key(&key) {
                panic!("doc! literal contains a duplicate key: {key:?}");
            }
            document
                .set(key, $crate::bson_value!($val))
                .expect("doc! literal exceeds the maximum representable BSON size");
        )+
        document
    }};
}

/// Constructs a [`Bson::Array`] from a list of values, each of which may itself be a nested
/// `{ ... }` document or `[ ... ]` array.
#[macro_export]
macro_rules! array {
    () => {
        $crate::Bson::Array(Vec::new())
    };
    ( $($val:tt),+ $(,)? ) => {{
        $crate::Bson::Array(vec![ $($crate::bson_value!($val)),+ ])
    }};
}

#[cfg(test)]
mod test {
    use crate::Bson;

    #[test]
    fn doc_builds_nested_structure() {
        let d = doc! {
            "name" => "ferris",
            "tags" => ["rust", "crab"],
            "meta" => { "active" => true },
        };
        assert_eq!(d.get("name").unwrap(), Bson::String("ferris".to_owned()));
        assert_eq!(
            d.get("tags").unwrap(),
            Bson::Array(vec![
                Bson::String("rust".to_owned()),
                Bson::String("crab".to_owned())
            ])
        );
        assert!(matches!(d.get("meta").unwrap(), Bson::Document(_)));
    }

    #[test]
    fn empty_doc_is_empty() {
        let d = doc! {};
        assert!(d.is_empty());
    }

    #[test]
    #[should_panic(expected = "duplicate key")]
    fn duplicate_key_panics() {
        let _ = doc! { "a" => 1, "a" => 2 };
    }

    #[test]
    fn array_macro_builds_bson_array() {
        let a = array![1, 2, 3];
        assert_eq!(
            a,
            Bson::Array(vec![Bson::Int32(1), Bson::Int32(2), Bson::Int32(3)])
        );
    }
}
