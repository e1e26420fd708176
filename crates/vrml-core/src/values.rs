//! Token stream with one-token pushback, and the literal grammars for every
//! non-node field type.
//!
//! The parser and [`parse_literal`] share these grammars. Out-of-range colors
//! and non-unit rotation axes are repaired and reported as warnings, never
//! rejected.

use crate::error::{Diagnostic, VrmlError};
use crate::field::{Color, FieldType, FieldValue, Image, Rotation, Vec2f, Vec3f};
use crate::scanner::{Scanner, Token, TokenKind};

/// Tolerance of the "axis is nearly unit length" test.
const AXIS_EPSILON: f32 = 1e-5;

pub type Result<T> = std::result::Result<T, VrmlError>;

// ─── Token stream ────────────────────────────────────────────────────────

pub struct TokenStream<'a> {
    scanner: Scanner<'a>,
    pushback: Option<Token>,
    uri: String,
    /// Non-fatal findings collected while reading values.
    pub diagnostics: Vec<Diagnostic>,
}

impl<'a> TokenStream<'a> {
    pub fn new(uri: &str, text: &'a str) -> Self {
        Self {
            scanner: Scanner::new(text),
            pushback: None,
            uri: uri.to_string(),
            diagnostics: Vec::new(),
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn peek(&mut self) -> &Token {
        let scanner = &mut self.scanner;
        self.pushback.get_or_insert_with(|| scanner.next_token())
    }

    pub fn peek_kind(&mut self) -> TokenKind {
        self.peek().kind
    }

    pub fn next(&mut self) -> Token {
        self.pushback
            .take()
            .unwrap_or_else(|| self.scanner.next_token())
    }

    /// Return a token that was read too far. Only one token of pushback exists.
    pub fn push_back(&mut self, token: Token) {
        debug_assert!(self.pushback.is_none(), "double pushback");
        self.pushback = Some(token);
    }

    /// Consume the next token if it has the given kind.
    pub fn eat(&mut self, kind: TokenKind) -> Option<Token> {
        (self.peek_kind() == kind).then(|| self.next())
    }

    pub fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token> {
        let token = self.next();
        if token.kind == kind {
            Ok(token)
        } else {
            Err(self.unexpected(&token, what))
        }
    }

    /// Syntax error naming what was expected and what was found.
    pub fn unexpected(&self, token: &Token, what: &str) -> VrmlError {
        let found = match token.kind {
            TokenKind::Eof => "end of input".to_string(),
            _ => format!("\"{}\"", token.text),
        };
        VrmlError::syntax(&self.uri, token, format!("expected {what}, found {found}"))
    }

    pub fn semantic(&self, token: &Token, message: impl Into<String>) -> VrmlError {
        VrmlError::semantic(&self.uri, token, message)
    }

    pub fn warn(&mut self, token: &Token, message: impl Into<String>) {
        let d = Diagnostic::warning(&self.uri, token, message);
        self.diagnostics.push(d);
    }

    pub fn info(&mut self, token: &Token, message: impl Into<String>) {
        let d = Diagnostic::info(&self.uri, token, message);
        self.diagnostics.push(d);
    }
}

// ─── Scalars ─────────────────────────────────────────────────────────────

pub fn parse_bool(ts: &mut TokenStream) -> Result<bool> {
    let token = ts.next();
    match token.kind {
        TokenKind::True => Ok(true),
        TokenKind::False => Ok(false),
        _ => Err(ts.unexpected(&token, "TRUE or FALSE")),
    }
}

fn number_token(ts: &mut TokenStream, what: &str) -> Result<Token> {
    let token = ts.next();
    match token.kind {
        TokenKind::Integer | TokenKind::Real => Ok(token),
        _ => Err(ts.unexpected(&token, what)),
    }
}

pub fn parse_float(ts: &mut TokenStream) -> Result<f32> {
    let token = number_token(ts, "a floating point value")?;
    token
        .text
        .parse::<f32>()
        .map_err(|_| ts.unexpected(&token, "a floating point value"))
}

pub fn parse_double(ts: &mut TokenStream) -> Result<f64> {
    let token = number_token(ts, "a time value")?;
    token
        .text
        .parse::<f64>()
        .map_err(|_| ts.unexpected(&token, "a time value"))
}

/// Decimal or hex integer. Values outside the 32-bit range wrap.
fn integer_value(token: &Token) -> Option<i64> {
    match token.kind {
        TokenKind::Integer => token.text.parse::<i64>().ok(),
        TokenKind::HexInteger => {
            let (negative, digits) = match token.text.as_bytes().first() {
                Some(b'-') => (true, &token.text[1..]),
                Some(b'+') => (false, &token.text[1..]),
                _ => (false, token.text.as_str()),
            };
            let magnitude = u64::from_str_radix(digits.get(2..)?, 16).ok()? as i64;
            Some(if negative { magnitude.wrapping_neg() } else { magnitude })
        }
        _ => None,
    }
}

pub fn parse_int32(ts: &mut TokenStream) -> Result<i32> {
    let token = ts.next();
    integer_value(&token)
        .map(|v| v as i32)
        .ok_or_else(|| ts.unexpected(&token, "an integer value"))
}

pub fn parse_string(ts: &mut TokenStream) -> Result<String> {
    let token = ts.next();
    if token.kind != TokenKind::String {
        return Err(ts.unexpected(&token, "a string"));
    }
    Ok(unescape(&token.text))
}

/// Strip the delimiters and drop one backslash from every `\X` pair.
pub fn unescape(quoted: &str) -> String {
    let mut out = String::with_capacity(quoted.len());
    let mut chars = quoted.chars().skip(1);
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            }
            '"' => break,
            c => out.push(c),
        }
    }
    out
}

pub fn parse_vec2f(ts: &mut TokenStream) -> Result<Vec2f> {
    Ok([parse_float(ts)?, parse_float(ts)?])
}

pub fn parse_vec3f(ts: &mut TokenStream) -> Result<Vec3f> {
    Ok([parse_float(ts)?, parse_float(ts)?, parse_float(ts)?])
}

pub fn parse_color(ts: &mut TokenStream) -> Result<Color> {
    let first = ts.peek().clone();
    let raw = Color::rgb(parse_float(ts)?, parse_float(ts)?, parse_float(ts)?);
    let (color, repaired) = raw.clamped();
    if repaired {
        ts.warn(
            &first,
            format!(
                "Color component out of range [0, 1]: {} {} {} clamped to {} {} {}",
                raw.r, raw.g, raw.b, color.r, color.g, color.b
            ),
        );
    }
    Ok(color)
}

pub fn parse_rotation(ts: &mut TokenStream) -> Result<Rotation> {
    let first = ts.peek().clone();
    let mut r = Rotation::new(
        parse_float(ts)?,
        parse_float(ts)?,
        parse_float(ts)?,
        parse_float(ts)?,
    );
    let len = r.axis_length();
    if (len - 1.0).abs() > AXIS_EPSILON {
        if len < AXIS_EPSILON {
            ts.warn(&first, "Rotation axis has zero length, using (0, 0, 1)");
            (r.x, r.y, r.z) = (0.0, 0.0, 1.0);
        } else {
            ts.warn(
                &first,
                format!("Rotation axis ({} {} {}) is not unit length, normalized", r.x, r.y, r.z),
            );
            (r.x, r.y, r.z) = (r.x / len, r.y / len, r.z / len);
        }
    }
    Ok(r)
}

pub fn parse_image(ts: &mut TokenStream) -> Result<Image> {
    let width = parse_int32(ts)?;
    let height = parse_int32(ts)?;
    let components_tok = ts.peek().clone();
    let components = parse_int32(ts)?;
    if !(0..=4).contains(&components) {
        return Err(ts.semantic(&components_tok, "Image components must be between 0 and 4"));
    }
    let expected = i64::from(width.max(0)) * i64::from(height.max(0));
    let mut pixels = Vec::new();
    while matches!(ts.peek_kind(), TokenKind::Integer | TokenKind::HexInteger) {
        let token = ts.next();
        if pixels.len() as i64 >= expected {
            return Err(ts.semantic(&token, "Too many pixel values"));
        }
        let value = integer_value(&token).ok_or_else(|| ts.unexpected(&token, "a pixel value"))?;
        pixels.push(value as u32);
    }
    if (pixels.len() as i64) < expected {
        let token = ts.peek().clone();
        return Err(ts.semantic(&token, "Insufficient pixel values"));
    }
    Ok(Image {
        width: width.max(0) as u32,
        height: height.max(0) as u32,
        components: components.max(0) as u32,
        pixels,
    })
}

// ─── Multi-valued ────────────────────────────────────────────────────────

/// A single item, or a bracketed list of zero or more items.
pub fn parse_multi<T>(
    ts: &mut TokenStream,
    mut item: impl FnMut(&mut TokenStream) -> Result<T>,
) -> Result<Vec<T>> {
    if ts.eat(TokenKind::LBracket).is_none() {
        return Ok(vec![item(ts)?]);
    }
    let mut items = Vec::new();
    while ts.eat(TokenKind::RBracket).is_none() {
        items.push(item(ts)?);
    }
    Ok(items)
}

// ─── Dispatch ────────────────────────────────────────────────────────────

/// Parse a literal of a non-node type. Node-valued types belong to the
/// parser, which needs the scope to resolve DEF/USE.
pub fn parse_value(ts: &mut TokenStream, field_type: FieldType) -> Result<FieldValue> {
    Ok(match field_type {
        FieldType::SFBool => FieldValue::SFBool(parse_bool(ts)?),
        FieldType::SFColor => FieldValue::SFColor(parse_color(ts)?),
        FieldType::SFFloat => FieldValue::SFFloat(parse_float(ts)?),
        FieldType::SFImage => FieldValue::SFImage(parse_image(ts)?),
        FieldType::SFInt32 => FieldValue::SFInt32(parse_int32(ts)?),
        FieldType::SFRotation => FieldValue::SFRotation(parse_rotation(ts)?),
        FieldType::SFString => FieldValue::SFString(parse_string(ts)?),
        FieldType::SFTime => FieldValue::SFTime(parse_double(ts)?),
        FieldType::SFVec2f => FieldValue::SFVec2f(parse_vec2f(ts)?),
        FieldType::SFVec3f => FieldValue::SFVec3f(parse_vec3f(ts)?),
        FieldType::MFColor => FieldValue::MFColor(parse_multi(ts, parse_color)?),
        FieldType::MFFloat => FieldValue::MFFloat(parse_multi(ts, parse_float)?),
        FieldType::MFInt32 => FieldValue::MFInt32(parse_multi(ts, parse_int32)?),
        FieldType::MFRotation => FieldValue::MFRotation(parse_multi(ts, parse_rotation)?),
        FieldType::MFString => FieldValue::MFString(parse_multi(ts, parse_string)?),
        FieldType::MFTime => FieldValue::MFTime(parse_multi(ts, parse_double)?),
        FieldType::MFVec2f => FieldValue::MFVec2f(parse_multi(ts, parse_vec2f)?),
        FieldType::MFVec3f => FieldValue::MFVec3f(parse_multi(ts, parse_vec3f)?),
        FieldType::SFNode | FieldType::MFNode => {
            let token = ts.peek().clone();
            return Err(ts.semantic(
                &token,
                format!("{field_type} values have no literal form outside a scene"),
            ));
        }
    })
}

/// Parse a standalone literal such as `"0 1 0 1.57"`. The whole text must
/// be consumed.
pub fn parse_literal(field_type: FieldType, text: &str) -> Result<FieldValue> {
    let mut ts = TokenStream::new("<literal>", text);
    let value = parse_value(&mut ts, field_type)?;
    let trailing = ts.next();
    if trailing.kind != TokenKind::Eof {
        return Err(ts.unexpected(&trailing, "end of literal"));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Severity;
    use pretty_assertions::assert_eq;

    fn value(ft: FieldType, text: &str) -> (FieldValue, Vec<Diagnostic>) {
        let mut ts = TokenStream::new("test.wrl", text);
        let v = parse_value(&mut ts, ft).unwrap();
        (v, ts.diagnostics)
    }

    fn error(ft: FieldType, text: &str) -> String {
        let mut ts = TokenStream::new("test.wrl", text);
        parse_value(&mut ts, ft).unwrap_err().message()
    }

    #[test]
    fn scalars() {
        assert_eq!(value(FieldType::SFBool, "TRUE").0, FieldValue::SFBool(true));
        assert_eq!(value(FieldType::SFFloat, "-1.5e1").0, FieldValue::SFFloat(-15.0));
        assert_eq!(value(FieldType::SFFloat, "3").0, FieldValue::SFFloat(3.0));
        assert_eq!(value(FieldType::SFInt32, "0x1F").0, FieldValue::SFInt32(31));
        assert_eq!(value(FieldType::SFInt32, "-0xff").0, FieldValue::SFInt32(-255));
        assert_eq!(value(FieldType::SFTime, "1.25").0, FieldValue::SFTime(1.25));
        assert_eq!(
            value(FieldType::SFVec3f, "1 2, 3").0,
            FieldValue::SFVec3f([1.0, 2.0, 3.0])
        );
    }

    #[test]
    fn int32_wraps_past_32_bits() {
        assert_eq!(value(FieldType::SFInt32, "0xFFFFFFFF").0, FieldValue::SFInt32(-1));
        assert_eq!(value(FieldType::SFInt32, "-0x10").0, FieldValue::SFInt32(-16));
        assert_eq!(value(FieldType::SFInt32, "-0x8000000000000000").0, FieldValue::SFInt32(0));
        assert_eq!(value(FieldType::SFInt32, "-0x80000001").0, FieldValue::SFInt32(i32::MAX));
    }

    #[test]
    fn bool_rejects_other_tokens() {
        assert_eq!(
            error(FieldType::SFBool, "true"),
            "syntax error: expected TRUE or FALSE, found \"true\""
        );
    }

    #[test]
    fn string_unescape_drops_one_backslash_per_pair() {
        assert_eq!(unescape(r#""a\"b""#), "a\"b");
        assert_eq!(unescape(r#""c:\\dir\n""#), "c:\\dirn");
        assert_eq!(unescape(r#""open"#), "open");
    }

    #[test]
    fn color_out_of_range_is_clamped_with_warning() {
        let (v, diags) = value(FieldType::SFColor, "1.5 -0.2 0.5");
        assert_eq!(v, FieldValue::SFColor(Color::rgb(1.0, 0.0, 0.5)));
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, Severity::Warning);
    }

    #[test]
    fn rotation_axis_repairs() {
        let (v, diags) = value(FieldType::SFRotation, "0 0 0 1");
        assert_eq!(v, FieldValue::SFRotation(Rotation::new(0.0, 0.0, 1.0, 1.0)));
        assert_eq!(diags.len(), 1);

        let (v, diags) = value(FieldType::SFRotation, "0 2 0 0.5");
        assert_eq!(v, FieldValue::SFRotation(Rotation::new(0.0, 1.0, 0.0, 0.5)));
        assert_eq!(diags.len(), 1);

        let (_, diags) = value(FieldType::SFRotation, "0 1 0 3.14");
        assert!(diags.is_empty());
    }

    #[test]
    fn image_pixel_counts_are_enforced() {
        let (v, _) = value(FieldType::SFImage, "2 1 3 0xFF0000 0x00FF00");
        assert_eq!(
            v,
            FieldValue::SFImage(Image {
                width: 2,
                height: 1,
                components: 3,
                pixels: vec![0xFF0000, 0x00FF00],
            })
        );
        assert_eq!(error(FieldType::SFImage, "2 2 1 0 0 0"), "Insufficient pixel values");
        assert_eq!(error(FieldType::SFImage, "1 1 1 0 0"), "Too many pixel values");
        assert_eq!(
            error(FieldType::SFImage, "1 1 2000000000 0"),
            "Image components must be between 0 and 4"
        );
    }

    #[test]
    fn multi_values_single_or_bracketed() {
        assert_eq!(value(FieldType::MFFloat, "4").0, FieldValue::MFFloat(vec![4.0]));
        assert_eq!(value(FieldType::MFFloat, "[ ]").0, FieldValue::MFFloat(vec![]));
        assert_eq!(
            value(FieldType::MFString, r#"[ "a", "b" "a" ]"#).0,
            FieldValue::MFString(vec!["a".into(), "b".into(), "a".into()])
        );
        assert_eq!(
            value(FieldType::MFVec2f, "[0 1, 2 3]").0,
            FieldValue::MFVec2f(vec![[0.0, 1.0], [2.0, 3.0]])
        );
    }

    #[test]
    fn literal_must_be_fully_consumed() {
        assert!(parse_literal(FieldType::SFFloat, "1 2").is_err());
        assert_eq!(
            parse_literal(FieldType::SFVec3f, "0 0 10").unwrap(),
            FieldValue::SFVec3f([0.0, 0.0, 10.0])
        );
        assert!(parse_literal(FieldType::SFNode, "NULL").is_err());
    }

    #[test]
    fn display_reparses_to_equal_value() {
        let cases = [
            (FieldType::SFBool, "FALSE"),
            (FieldType::SFInt32, "-42"),
            (FieldType::SFString, r#""quote \" and \\ slash""#),
            (FieldType::SFColor, "0.2 0.4 0.6"),
            (FieldType::SFRotation, "0 1 0 1.5708"),
            (FieldType::SFImage, "1 2 2 0xFF00 0x00FF"),
            (FieldType::MFVec3f, "[1 2 3, 4 5 6]"),
            (FieldType::MFTime, "[0.5 10]"),
        ];
        for (ft, text) in cases {
            let first = parse_literal(ft, text).unwrap();
            let again = parse_literal(ft, &first.to_string()).unwrap();
            assert_eq!(first, again, "{ft} {text}");
        }
    }
}
