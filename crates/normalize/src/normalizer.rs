use crate::constants::ConstantSource;
use fixcheck_signature::Entity;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// Upper bound on rewrite passes; every rule except constant inlining shrinks the text.
const MAX_PASSES: usize = 32;

static SELF_QUALIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bthis\.").unwrap());
static FINAL_QUALIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bfinal\s+").unwrap());
static NUMBER_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d+(?:\.\d+)?)[LlFfDd]\b").unwrap());
static CONSTANT_REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Za-z_$][0-9A-Za-z_$.]*)\.([A-Z_][0-9A-Z_]*)").unwrap());

const IDENTITY_CAST: &str = "(Object)";

/// Per-call inputs of the normalizer.
///
/// Replaces process-wide "class under analysis" state so that independent
/// checks can normalize concurrently.
#[derive(Clone, Copy, Default)]
pub struct NormalizationContext<'a> {
    class_under_analysis: Option<&'a str>,
    constants: Option<&'a dyn ConstantSource>,
}

impl<'a> NormalizationContext<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_class(mut self, class_under_analysis: &'a str) -> Self {
        self.class_under_analysis = Some(class_under_analysis);
        self
    }

    #[must_use]
    pub fn with_constants(mut self, constants: &'a dyn ConstantSource) -> Self {
        self.constants = Some(constants);
        self
    }

    pub fn class_under_analysis(&self) -> Option<&'a str> {
        self.class_under_analysis
    }
}

impl fmt::Debug for NormalizationContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NormalizationContext")
            .field("class_under_analysis", &self.class_under_analysis)
            .field("constants", &self.constants.is_some())
            .finish()
    }
}

/// Canonicalizes identifier strings so cosmetic differences do not block matching
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NameNormalizer {
    strip_finals: bool,
}

impl NameNormalizer {
    pub const fn new(strip_finals: bool) -> Self {
        Self { strip_finals }
    }

    pub const fn strips_finals(&self) -> bool {
        self.strip_finals
    }

    /// Rewrite `text` until no rule applies anymore
    pub fn normalize(&self, text: &str, ctx: &NormalizationContext<'_>) -> String {
        let mut current = text.to_string();
        for _ in 0..MAX_PASSES {
            let next = self.normalize_once(&current, ctx);
            if next == current {
                return next;
            }
            current = next;
        }
        log::debug!("Normalization of '{text}' did not settle after {MAX_PASSES} passes");
        current
    }

    /// Normalized value of an entity; statements also lose the class-under-analysis qualifier
    pub fn normalize_entity(&self, entity: &Entity, ctx: &NormalizationContext<'_>) -> String {
        match ctx.class_under_analysis() {
            Some(class) if entity.label.is_statement() => {
                self.normalize(&strip_class_qualifier(&entity.value, class), ctx)
            }
            _ => self.normalize(&entity.value, ctx),
        }
    }

    pub fn equal_unique_names(
        &self,
        a: &Entity,
        b: &Entity,
        ctx: &NormalizationContext<'_>,
    ) -> bool {
        if a.value == b.value {
            return true;
        }
        let equal = self.normalize_entity(a, ctx) == self.normalize_entity(b, ctx);
        if equal {
            log::info!(
                "Unique names only equal after normalization: [{}] and [{}]",
                a.value,
                b.value
            );
        }
        equal
    }

    fn normalize_once(&self, text: &str, ctx: &NormalizationContext<'_>) -> String {
        let code = map_outside_literals(text.trim(), |segment| {
            let mut out = SELF_QUALIFIER.replace_all(segment, "").into_owned();
            out = out.replace(IDENTITY_CAST, "");
            if self.strip_finals {
                out = FINAL_QUALIFIER.replace_all(&out, "").into_owned();
            }
            if let Some(constants) = ctx.constants {
                out = inline_constants(&out, constants);
            }
            NUMBER_SUFFIX.replace_all(&out, "$1").into_owned()
        });
        code.trim().to_string()
    }
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

fn inline_constants(segment: &str, constants: &dyn ConstantSource) -> String {
    let mut out = String::with_capacity(segment.len());
    let mut last = 0;
    for caps in CONSTANT_REFERENCE.captures_iter(segment) {
        let (Some(whole), Some(qualifier), Some(field)) = (caps.get(0), caps.get(1), caps.get(2))
        else {
            continue;
        };
        let followed_by_identifier = segment[whole.end()..]
            .chars()
            .next()
            .is_some_and(|c| is_identifier_char(c) || c == '(');
        if followed_by_identifier {
            continue;
        }

        let replacement = match constants.resolve(qualifier.as_str(), field.as_str()) {
            Ok(values) => {
                if values.len() > 1 {
                    log::warn!(
                        "{} candidate values for constant {}, using the first",
                        values.len(),
                        whole.as_str()
                    );
                }
                values.first().map(|v| v.render())
            }
            Err(e) => {
                log::warn!("Cannot resolve constant {}: {e}", whole.as_str());
                None
            }
        };
        if let Some(replacement) = replacement {
            out.push_str(&segment[last..whole.start()]);
            out.push_str(&replacement);
            last = whole.end();
        }
    }
    out.push_str(&segment[last..]);
    out
}

/// Remove `Class.` qualifiers referring to the class under analysis
fn strip_class_qualifier(value: &str, class: &str) -> String {
    let simple = class.rsplit(|c: char| c == '.' || c == '$').next().unwrap_or(class);
    let mut stripped = value.to_string();
    for name in [class, simple] {
        if name.is_empty() {
            continue;
        }
        let needle = format!("{name}.");
        let mut out = String::with_capacity(stripped.len());
        let mut rest = stripped.as_str();
        while let Some(pos) = rest.find(&needle) {
            let boundary = rest[..pos]
                .chars()
                .next_back()
                .map_or(true, |c| !is_identifier_char(c) && c != '.');
            out.push_str(&rest[..pos]);
            if !boundary {
                out.push_str(&needle);
            }
            rest = &rest[pos + needle.len()..];
        }
        out.push_str(rest);
        stripped = out;
    }
    stripped
}

/// Apply `rewrite` to every stretch of `text` outside string and char literals
fn map_outside_literals<F>(text: &str, mut rewrite: F) -> String
where
    F: FnMut(&str) -> String,
{
    let mut out = String::with_capacity(text.len());
    let mut code_start = 0;
    let mut chars = text.char_indices();
    while let Some((start, c)) = chars.next() {
        if c != '"' && c != '\'' {
            continue;
        }
        out.push_str(&rewrite(&text[code_start..start]));
        let mut end = text.len();
        let mut escaped = false;
        for (i, inner) in chars.by_ref() {
            if escaped {
                escaped = false;
            } else if inner == '\\' {
                escaped = true;
            } else if inner == c {
                end = i + inner.len_utf8();
                break;
            }
        }
        out.push_str(&text[start..end]);
        code_start = end;
    }
    if code_start < text.len() {
        out.push_str(&rewrite(&text[code_start..]));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{ConstantTable, ConstantValue};
    use fixcheck_signature::EntityLabel;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn plain(text: &str) -> String {
        NameNormalizer::default().normalize(text, &NormalizationContext::new())
    }

    fn limits() -> ConstantTable {
        let mut table = ConstantTable::new();
        table.insert("org.acme.Limits", "MAX", ConstantValue::Primitive("10".into()));
        table.insert("org.acme.Limits", "NAME", ConstantValue::Text("acme".into()));
        table.insert("org.other.Limits", "MAX", ConstantValue::Primitive("20".into()));
        table.insert("org.acme.Codes", "OK", ConstantValue::Primitive("200".into()));
        table
    }

    #[test]
    fn test_trims_and_removes_self_qualifier() {
        assert_eq!(plain("  this.count = this.count + 1 "), "count = count + 1");
        assert_eq!(plain("other.this.x"), "other.x");
        assert_eq!(plain("withthis.x"), "withthis.x");
    }

    #[test]
    fn test_removes_identity_cast() {
        assert_eq!(plain("list.add((Object) item)"), "list.add( item)");
        assert_eq!(plain("m((Object)x)"), "m(x)");
    }

    #[test]
    fn test_final_is_optional() {
        let ctx = NormalizationContext::new();
        assert_eq!(plain("final int x = 1"), "final int x = 1");
        assert_eq!(
            NameNormalizer::new(true).normalize("final int x = 1", &ctx),
            "int x = 1"
        );
        assert_eq!(
            NameNormalizer::new(true).normalize("finalize()", &ctx),
            "finalize()"
        );
    }

    #[test]
    fn test_number_suffixes() {
        assert_eq!(plain("long x = 10L"), "long x = 10");
        assert_eq!(plain("f(1.5f, 2d, 3l)"), "f(1.5, 2, 3)");
        assert_eq!(plain("int hex = 0xFF"), "int hex = 0xFF");
        assert_eq!(plain("log(\"10L\", 10L)"), "log(\"10L\", 10)");
        assert_eq!(plain("x1L = 2"), "x1L = 2");
    }

    #[test]
    fn test_literals_are_untouched() {
        assert_eq!(plain("s = \"this.x (Object)\""), "s = \"this.x (Object)\"");
        assert_eq!(plain("c = 'x'"), "c = 'x'");
    }

    #[test]
    fn test_inlines_constants() {
        let table = limits();
        let ctx = NormalizationContext::new().with_constants(&table);
        let normalizer = NameNormalizer::default();

        assert_eq!(normalizer.normalize("if (n > Codes.OK)", &ctx), "if (n > 200)");
        assert_eq!(
            normalizer.normalize("label = org.acme.Limits.NAME", &ctx),
            "label = \"acme\""
        );
        // Ambiguous: first registered match wins
        assert_eq!(normalizer.normalize("n < Limits.MAX", &ctx), "n < 10");
        // Unknown constants stay as written
        assert_eq!(normalizer.normalize("n < Limits.MIN", &ctx), "n < Limits.MIN");
        // Constant references inside literals are left alone
        assert_eq!(
            normalizer.normalize("log(\"Codes.OK\")", &ctx),
            "log(\"Codes.OK\")"
        );
        // Method calls are not constants
        assert_eq!(normalizer.normalize("Codes.OK()", &ctx), "Codes.OK()");
    }

    #[test]
    fn test_unresolvable_class_leaves_token() {
        let mut table = ConstantTable::new();
        table.register_unresolvable("org.acme.Broken");
        let ctx = NormalizationContext::new().with_constants(&table);
        assert_eq!(
            NameNormalizer::default().normalize("x = Broken.VALUE", &ctx),
            "x = Broken.VALUE"
        );
    }

    #[test]
    fn test_entity_strips_class_under_analysis_for_statements() {
        let normalizer = NameNormalizer::default();
        let ctx = NormalizationContext::new().with_class("org.acme.Parser");

        let stmt = Entity::new(EntityLabel::MethodInvocation, "Parser.check(org.acme.Parser.MODE)");
        assert_eq!(normalizer.normalize_entity(&stmt, &ctx), "check(MODE)");

        let other = Entity::new(EntityLabel::MethodInvocation, "SubParser.check()");
        assert_eq!(normalizer.normalize_entity(&other, &ctx), "SubParser.check()");

        let method = Entity::new(EntityLabel::Method, "Parser.parse()");
        assert_eq!(normalizer.normalize_entity(&method, &ctx), "Parser.parse()");
    }

    #[test]
    fn test_equal_unique_names() {
        let normalizer = NameNormalizer::default();
        let ctx = NormalizationContext::new();
        let a = Entity::new(EntityLabel::Assignment, "this.size = 0L");
        let b = Entity::new(EntityLabel::Assignment, "size = 0");
        let c = Entity::new(EntityLabel::Assignment, "size = 1");
        assert!(normalizer.equal_unique_names(&a, &b, &ctx));
        assert!(normalizer.equal_unique_names(&b, &b, &ctx));
        assert!(!normalizer.equal_unique_names(&a, &c, &ctx));
    }

    proptest! {
        #[test]
        fn proptest_normalize_is_idempotent(text in r#"[a-zA-Z0-9 ._()"'\\]{0,24}"#) {
            let normalizer = NameNormalizer::new(true);
            let ctx = NormalizationContext::new();
            let once = normalizer.normalize(&text, &ctx);
            let twice = normalizer.normalize(&once, &ctx);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn proptest_normalize_with_constants_is_idempotent(
            text in r"[a-zA-Z .()]{0,12}(Limits|Codes)\.(MAX|OK|NAME)[ ;)]{0,3}"
        ) {
            let table = limits();
            let normalizer = NameNormalizer::default();
            let ctx = NormalizationContext::new().with_constants(&table);
            let once = normalizer.normalize(&text, &ctx);
            let twice = normalizer.normalize(&once, &ctx);
            prop_assert_eq!(once, twice);
        }
    }
}
