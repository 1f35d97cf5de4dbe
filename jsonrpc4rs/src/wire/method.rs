// method.rs
//
// Wire method name resolution (spec §3 "Method name resolution"): split
// `<service><sep><method>` on a single `.` or `/`, falling back to a
// snake_case -> PascalCase transform of the service name when a direct
// lookup misses.

use heck::ToUpperCamelCase;

/// Split a wire method name into `(service, method)`. Exactly one of `.`
/// or `/` must appear, optionally after a single leading separator
/// (`.foo.bar` / `/foo/bar`), otherwise this is `Method not found`.
pub fn parse_request_method(method: &str) -> Result<(String, String), String> {
    let err = || format!("rpc: method request ill-formed: {}; need x.y or x/y", method);

    let trimmed = if method.starts_with('.') || method.starts_with('/') {
        &method[1..]
    } else {
        method
    };

    let dot_count = trimmed.matches('.').count();
    let slash_count = trimmed.matches('/').count();
    if dot_count != 1 && slash_count != 1 {
        return Err(err());
    }

    let sep = if dot_count == 1 { '.' } else { '/' };
    let idx = trimmed.rfind(sep).ok_or_else(err)?;
    let (service, rest) = trimmed.split_at(idx);
    let method_name = &rest[1..];
    Ok((service.to_string(), method_name.to_string()))
}

/// snake_case -> PascalCase, used as the service-name lookup fallback:
/// `hello_world` resolves to a service registered as `HelloWorld`.
pub fn snake_to_pascal(name: &str) -> String {
    name.to_upper_camel_case()
}

#[cfg(test)]
mod method_tests {
    use super::*;

    #[test]
    fn dot_and_slash_separators_are_equivalent() {
        assert_eq!(
            parse_request_method("Service.Method").unwrap(),
            ("Service".to_string(), "Method".to_string())
        );
        assert_eq!(
            parse_request_method("Service/Method").unwrap(),
            ("Service".to_string(), "Method".to_string())
        );
    }

    #[test]
    fn leading_separator_is_stripped() {
        assert_eq!(
            parse_request_method("/Service/Method").unwrap(),
            ("Service".to_string(), "Method".to_string())
        );
    }

    #[test]
    fn missing_separator_is_an_error() {
        assert!(parse_request_method("ServiceMethod").is_err());
    }

    #[test]
    fn dot_takes_priority_when_both_separators_present() {
        // Mirrors the original implementation: a single '.' anywhere wins
        // over '/' even if a slash also occurs in the method portion.
        assert_eq!(
            parse_request_method("a.b/c").unwrap(),
            ("a".to_string(), "b/c".to_string())
        );
    }

    #[test]
    fn no_separator_at_all_is_an_error() {
        assert!(parse_request_method("ServiceMethod").is_err());
    }

    #[test]
    fn snake_case_converts_to_pascal_case() {
        assert_eq!(snake_to_pascal("hello_world"), "HelloWorld");
        assert_eq!(snake_to_pascal("int_rpc"), "IntRpc");
    }
}
