//! printf-style message interpolation
//!
//! Supported placeholders:
//!
//! | token | output                                      |
//! |-------|---------------------------------------------|
//! | `%s`  | strings verbatim, other values as JSON      |
//! | `%d`  | number (`NaN` for non-numbers)              |
//! | `%i`  | integer part of a number                    |
//! | `%f`  | floating point number                       |
//! | `%j`, `%o`, `%O` | JSON                             |
//! | `%%`  | a literal `%`                               |
//!
//! A placeholder without a matching argument is left as written. Arguments
//! beyond the last placeholder are ignored.

use super::encoder::to_json;
use super::value::FieldValue;

/// Interpolate `args` into `template`
pub fn format_message(template: &str, args: &[FieldValue]) -> String {
    if args.is_empty() {
        return template.to_string();
    }

    let mut out = String::with_capacity(template.len() + args.len() * 8);
    let mut next = args.iter();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let Some(&spec) = chars.peek() else {
            out.push('%');
            break;
        };
        match spec {
            '%' => {
                chars.next();
                out.push('%');
            }
            's' | 'd' | 'i' | 'f' | 'j' | 'o' | 'O' => {
                chars.next();
                match next.next() {
                    Some(arg) => out.push_str(&render(spec, arg)),
                    None => {
                        out.push('%');
                        out.push(spec);
                    }
                }
            }
            _ => out.push('%'),
        }
    }
    out
}

fn render(spec: char, arg: &FieldValue) -> String {
    match spec {
        's' => match arg {
            FieldValue::String(s) => s.clone(),
            other => json_text(other),
        },
        'd' => match number(arg) {
            Some(n) if n.fract() == 0.0 && n.abs() < 9.0e15 => format!("{}", n as i64),
            Some(n) => format!("{}", n),
            None => "NaN".to_string(),
        },
        'i' => match number(arg) {
            Some(n) => format!("{}", n.trunc() as i64),
            None => "NaN".to_string(),
        },
        'f' => match number(arg) {
            Some(n) => format!("{}", n),
            None => "NaN".to_string(),
        },
        _ => json_text(arg),
    }
}

fn number(arg: &FieldValue) -> Option<f64> {
    match arg {
        FieldValue::String(s) => s.trim().parse::<f64>().ok(),
        FieldValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        other => other.as_f64(),
    }
}

fn json_text(arg: &FieldValue) -> String {
    // Always safe here: interpolation must not fail a log call.
    to_json(arg, true)
        .map(|v| v.to_string())
        .unwrap_or_else(|_| "[Circular]".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::Fields;

    #[test]
    fn test_no_args_is_verbatim() {
        assert_eq!(format_message("100% done %s", &[]), "100% done %s");
    }

    #[test]
    fn test_string_and_numbers() {
        let args = vec![
            FieldValue::from("alice"),
            FieldValue::from(42),
            FieldValue::from(3.75),
            FieldValue::from("7.9"),
        ];
        assert_eq!(
            format_message("%s has %d items, ratio %f, floor %i", &args),
            "alice has 42 items, ratio 3.75, floor 7"
        );
    }

    #[test]
    fn test_json_placeholders() {
        let args = vec![FieldValue::from(Fields::new().with_field("a", 1))];
        assert_eq!(format_message("obj=%j", &args), "obj={\"a\":1}");
    }

    #[test]
    fn test_escape_and_missing_args() {
        let args = vec![FieldValue::from("x")];
        assert_eq!(format_message("%% %s %s", &args), "% x %s");
    }

    #[test]
    fn test_non_number_and_extra_args() {
        let args = vec![FieldValue::from("abc"), FieldValue::from("extra")];
        assert_eq!(format_message("n=%d", &args), "n=NaN");
    }

    #[test]
    fn test_unknown_specifier_kept() {
        let args = vec![FieldValue::from(1)];
        assert_eq!(format_message("%x %d", &args), "%x 1");
    }
}
