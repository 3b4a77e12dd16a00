// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Helper macros.

/// Expands to the name of the enclosing function as a `&'static str`.
///
/// Written for handing a test function's own name to
/// [`Proctor::new`](crate::Proctor::new) without spelling it twice:
///
/// ```rust
/// use proctor::test_name;
///
/// #[allow(non_snake_case)]
/// fn Given_AnEmptyCart_When_AddingOneItem_Then_TheTotalUpdates() -> &'static str {
///     test_name!()
/// }
///
/// assert_eq!(
///     Given_AnEmptyCart_When_AddingOneItem_Then_TheTotalUpdates(),
///     "Given_AnEmptyCart_When_AddingOneItem_Then_TheTotalUpdates",
/// );
/// ```
///
/// The expansion sees through closures, so the name stays right when the
/// macro is invoked inside one.
#[macro_export]
macro_rules! test_name {
    () => {{
        fn __here() {}
        fn __type_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        let path = __type_name_of(__here)
            .strip_suffix("::__here")
            .unwrap_or_default();
        let path = path.trim_end_matches("::{{closure}}");
        path.rsplit("::").next().unwrap_or(path)
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_names_the_enclosing_function() {
        assert_eq!(crate::test_name!(), "test_names_the_enclosing_function");
    }

    #[test]
    fn test_sees_through_closures() {
        let name = (|| crate::test_name!())();

        assert_eq!(name, "test_sees_through_closures");
    }
}
