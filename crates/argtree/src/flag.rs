//! Typed flags.
//!
//! Every flag kind is a zero-sized [`ValueKind`] marker that knows how to turn
//! text into a value. [`ScalarFlag`] keeps the last value it parsed,
//! [`ArrayFlag`] appends every occurrence. Both implement the object-safe
//! [`Flag`] trait that registries and the parse engine work with.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use parking_lot::Mutex;

use crate::error::{BuildError, ValueError};
use crate::suggest;

/// Largest integer an `int`/`uint` flag accepts (`2^53 - 1`).
pub const MAX_SAFE_INTEGER: i64 = (1 << 53) - 1;

/// Characters that can never be used as a shorthand.
const RESERVED_SHORTHANDS: [char; 4] = ['=', '-', '\'', '"'];

/// Stable type tag of a flag, shown in help output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlagKind {
    String,
    Number,
    Int,
    Uint,
    BigInt,
    Bool,
}

impl FlagKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Int => "int",
            Self::Uint => "uint",
            Self::BigInt => "bigint",
            Self::Bool => "bool",
        }
    }
}

impl fmt::Display for FlagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text conversion rules for one kind of flag value.
pub trait ValueKind: Send + Sync + 'static {
    type Value: Clone + PartialEq + fmt::Debug + Send + Sync + 'static;

    const KIND: FlagKind;

    fn convert(text: &str) -> Result<Self::Value, ValueError>;

    /// Plain text form, used for suggestions and reports.
    fn render(value: &Self::Value) -> String;

    /// Form used in help annotations.
    fn describe(value: &Self::Value) -> String {
        Self::render(value)
    }
}

/// Free-form text.
#[derive(Debug, Clone, Copy, Default)]
pub struct Text;

/// Any real number except NaN.
#[derive(Debug, Clone, Copy, Default)]
pub struct Number;

/// Signed integer within the safe-integer range.
#[derive(Debug, Clone, Copy, Default)]
pub struct Int;

/// Non-negative integer within the safe-integer range.
#[derive(Debug, Clone, Copy, Default)]
pub struct Uint;

/// Integer of arbitrary size.
#[derive(Debug, Clone, Copy, Default)]
pub struct BigInt;

/// `false`, `FALSE`, `False` and `0` are false, every other text is true.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bool;

impl ValueKind for Text {
    type Value = String;
    const KIND: FlagKind = FlagKind::String;

    fn convert(text: &str) -> Result<String, ValueError> {
        Ok(text.to_string())
    }

    fn render(value: &String) -> String {
        value.clone()
    }

    fn describe(value: &String) -> String {
        format!("{value:?}")
    }
}

impl ValueKind for Number {
    type Value = f64;
    const KIND: FlagKind = FlagKind::Number;

    fn convert(text: &str) -> Result<f64, ValueError> {
        let value: f64 = text
            .trim()
            .parse()
            .map_err(|_| ValueError::Invalid(format!("{text:?} is not a number")))?;
        if value.is_nan() {
            return Err(ValueError::Invalid(format!("{text:?} is not a number")));
        }
        Ok(value)
    }

    fn render(value: &f64) -> String {
        value.to_string()
    }
}

fn parse_safe_integer(text: &str) -> Result<i64, ValueError> {
    let value: i64 = text
        .trim()
        .parse()
        .map_err(|_| ValueError::Invalid(format!("{text:?} is not an integer")))?;
    if !(-MAX_SAFE_INTEGER..=MAX_SAFE_INTEGER).contains(&value) {
        return Err(ValueError::Invalid(format!(
            "{text:?} is outside the safe integer range"
        )));
    }
    Ok(value)
}

impl ValueKind for Int {
    type Value = i64;
    const KIND: FlagKind = FlagKind::Int;

    fn convert(text: &str) -> Result<i64, ValueError> {
        parse_safe_integer(text)
    }

    fn render(value: &i64) -> String {
        value.to_string()
    }
}

impl ValueKind for Uint {
    type Value = u64;
    const KIND: FlagKind = FlagKind::Uint;

    fn convert(text: &str) -> Result<u64, ValueError> {
        let value = parse_safe_integer(text)?;
        u64::try_from(value)
            .map_err(|_| ValueError::Invalid(format!("{text:?} must not be negative")))
    }

    fn render(value: &u64) -> String {
        value.to_string()
    }
}

impl ValueKind for BigInt {
    type Value = num_bigint::BigInt;
    const KIND: FlagKind = FlagKind::BigInt;

    fn convert(text: &str) -> Result<num_bigint::BigInt, ValueError> {
        text.trim()
            .parse()
            .map_err(|_| ValueError::Invalid(format!("{text:?} is not an integer")))
    }

    fn render(value: &num_bigint::BigInt) -> String {
        value.to_string()
    }
}

impl ValueKind for Bool {
    type Value = bool;
    const KIND: FlagKind = FlagKind::Bool;

    fn convert(text: &str) -> Result<bool, ValueError> {
        Ok(!matches!(text, "false" | "FALSE" | "False" | "0"))
    }

    fn render(value: &bool) -> String {
        value.to_string()
    }
}

/// The capability set shared by every flag, independent of its value type.
pub trait Flag: Send + Sync {
    /// Long name, used as `--name`.
    fn name(&self) -> &str;

    /// Single-character alias, used as `-x`.
    fn shorthand(&self) -> Option<char>;

    /// Whitespace-normalized one-line description.
    fn usage_text(&self) -> &str;

    fn kind(&self) -> FlagKind;

    /// Whether repeated occurrences accumulate.
    fn is_array(&self) -> bool;

    /// Boolean flags never take the next token as their value.
    fn is_boolean(&self) -> bool {
        self.kind() == FlagKind::Bool
    }

    fn type_tag(&self) -> String {
        if self.is_array() {
            format!("{}[]", self.kind())
        } else {
            self.kind().to_string()
        }
    }

    /// Convert, verify and store one occurrence of the flag.
    fn parse<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<(), ValueError>>;

    /// Forget the value parsed in a previous execution. Defaults stay.
    fn reset(&self);

    /// Whether the current execution supplied a value.
    fn is_set(&self) -> bool;

    fn default_as_string(&self) -> Option<String>;

    fn allowed_values_as_string(&self) -> Option<String>;

    /// Current value (or default) in plain text.
    fn value_as_string(&self) -> Option<String>;

    /// Closest allowed value to `input`, if an allow-list is configured.
    fn guess_closest(&self, input: &str, max_distance: usize) -> Option<String>;
}

/// `-p, --port` or `--port`.
pub fn display_name(flag: &dyn Flag) -> String {
    match flag.shorthand() {
        Some(short) => format!("-{short}, --{}", flag.name()),
        None => format!("--{}", flag.name()),
    }
}

pub(crate) fn check_definition(flag: &dyn Flag) -> Result<(), BuildError> {
    let name = flag.name();
    if name.is_empty() || name.contains('=') {
        return Err(BuildError::InvalidFlagName(name.to_string()));
    }
    if let Some(short) = flag.shorthand() {
        if RESERVED_SHORTHANDS.contains(&short) || short.is_whitespace() {
            return Err(BuildError::InvalidShorthand {
                flag: name.to_string(),
                short,
            });
        }
    }
    Ok(())
}

fn normalize_usage(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn describe_list<K: ValueKind>(values: &[K::Value]) -> String {
    values
        .iter()
        .map(K::describe)
        .collect::<Vec<_>>()
        .join(", ")
}

type Validator<V> = Arc<dyn Fn(V) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Allow-list and validation hook shared by scalar and array flags.
struct Rules<K: ValueKind> {
    allowed: Option<Vec<K::Value>>,
    validator: Option<Validator<K::Value>>,
}

impl<K: ValueKind> Default for Rules<K> {
    fn default() -> Self {
        Self {
            allowed: None,
            validator: None,
        }
    }
}

impl<K: ValueKind> Rules<K> {
    fn set_validator<F, Fut>(&mut self, f: F)
    where
        F: Fn(K::Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let validator: Validator<K::Value> = Arc::new(move |value| f(value).boxed());
        self.validator = Some(validator);
    }

    /// The allow-list is checked first; the hook only sees accepted values.
    async fn verify(&self, candidate: &K::Value) -> Result<(), ValueError> {
        if let Some(allowed) = &self.allowed {
            if !allowed.contains(candidate) {
                return Err(ValueError::NotAllowed {
                    value: K::render(candidate),
                    allowed: describe_list::<K>(allowed),
                });
            }
        }
        if let Some(validator) = &self.validator {
            validator(candidate.clone())
                .await
                .map_err(ValueError::Rejected)?;
        }
        Ok(())
    }

    fn allowed_as_string(&self) -> Option<String> {
        self.allowed.as_deref().map(describe_list::<K>)
    }

    fn guess(&self, input: &str, max_distance: usize) -> Option<String> {
        let rendered: Vec<String> = self.allowed.as_ref()?.iter().map(K::render).collect();
        suggest::closest(input, rendered.iter().map(String::as_str), max_distance)
            .map(str::to_string)
    }
}

/// A flag holding a single value; later occurrences replace earlier ones.
pub struct ScalarFlag<K: ValueKind> {
    name: String,
    short: Option<char>,
    usage: String,
    default: Option<K::Value>,
    rules: Rules<K>,
    current: Mutex<Option<K::Value>>,
}

pub type StringFlag = ScalarFlag<Text>;
pub type NumberFlag = ScalarFlag<Number>;
pub type IntFlag = ScalarFlag<Int>;
pub type UintFlag = ScalarFlag<Uint>;
pub type BigIntFlag = ScalarFlag<BigInt>;
pub type BoolFlag = ScalarFlag<Bool>;

impl<K: ValueKind> ScalarFlag<K> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            short: None,
            usage: String::new(),
            default: None,
            rules: Rules::default(),
            current: Mutex::new(None),
        }
    }

    pub fn short(mut self, short: char) -> Self {
        self.short = Some(short);
        self
    }

    pub fn usage(mut self, usage: &str) -> Self {
        self.usage = normalize_usage(usage);
        self
    }

    pub fn default(mut self, value: K::Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Restrict accepted values to `values`, compared by equality.
    pub fn allowed(mut self, values: impl IntoIterator<Item = K::Value>) -> Self {
        self.rules.allowed = Some(values.into_iter().collect());
        self
    }

    /// Run `f` on every converted value that passed the allow-list.
    pub fn validator<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(K::Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.rules.set_validator(f);
        self
    }

    /// Parsed value of the current execution, else the default.
    pub fn value(&self) -> Option<K::Value> {
        self.current.lock().clone().or_else(|| self.default.clone())
    }

    pub fn default_value(&self) -> Option<&K::Value> {
        self.default.as_ref()
    }

    pub async fn verify(&self, candidate: &K::Value) -> Result<(), ValueError> {
        self.rules.verify(candidate).await
    }
}

impl<K: ValueKind> fmt::Debug for ScalarFlag<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScalarFlag")
            .field("kind", &K::KIND)
            .field("name", &self.name)
            .field("short", &self.short)
            .field("default", &self.default)
            .field("current", &*self.current.lock())
            .finish_non_exhaustive()
    }
}

impl<K: ValueKind> Flag for ScalarFlag<K> {
    fn name(&self) -> &str {
        &self.name
    }

    fn shorthand(&self) -> Option<char> {
        self.short
    }

    fn usage_text(&self) -> &str {
        &self.usage
    }

    fn kind(&self) -> FlagKind {
        K::KIND
    }

    fn is_array(&self) -> bool {
        false
    }

    fn parse<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<(), ValueError>> {
        async move {
            let value = K::convert(text)?;
            self.rules.verify(&value).await?;
            *self.current.lock() = Some(value);
            Ok(())
        }
        .boxed()
    }

    fn reset(&self) {
        *self.current.lock() = None;
    }

    fn is_set(&self) -> bool {
        self.current.lock().is_some()
    }

    fn default_as_string(&self) -> Option<String> {
        self.default.as_ref().map(K::describe)
    }

    fn allowed_values_as_string(&self) -> Option<String> {
        self.rules.allowed_as_string()
    }

    fn value_as_string(&self) -> Option<String> {
        self.value().as_ref().map(K::render)
    }

    fn guess_closest(&self, input: &str, max_distance: usize) -> Option<String> {
        self.rules.guess(input, max_distance)
    }
}

/// A flag collecting every occurrence in order.
pub struct ArrayFlag<K: ValueKind> {
    name: String,
    short: Option<char>,
    usage: String,
    default: Option<Vec<K::Value>>,
    rules: Rules<K>,
    current: Mutex<Option<Vec<K::Value>>>,
}

pub type StringArrayFlag = ArrayFlag<Text>;
pub type NumberArrayFlag = ArrayFlag<Number>;
pub type IntArrayFlag = ArrayFlag<Int>;
pub type UintArrayFlag = ArrayFlag<Uint>;
pub type BigIntArrayFlag = ArrayFlag<BigInt>;
pub type BoolArrayFlag = ArrayFlag<Bool>;

impl<K: ValueKind> ArrayFlag<K> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            short: None,
            usage: String::new(),
            default: None,
            rules: Rules::default(),
            current: Mutex::new(None),
        }
    }

    pub fn short(mut self, short: char) -> Self {
        self.short = Some(short);
        self
    }

    pub fn usage(mut self, usage: &str) -> Self {
        self.usage = normalize_usage(usage);
        self
    }

    pub fn default(mut self, values: impl IntoIterator<Item = K::Value>) -> Self {
        self.default = Some(values.into_iter().collect());
        self
    }

    /// Restrict every element to `values`, compared by equality.
    pub fn allowed(mut self, values: impl IntoIterator<Item = K::Value>) -> Self {
        self.rules.allowed = Some(values.into_iter().collect());
        self
    }

    pub fn validator<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(K::Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.rules.set_validator(f);
        self
    }

    /// Values collected in the current execution, else the default.
    pub fn values(&self) -> Option<Vec<K::Value>> {
        self.current.lock().clone().or_else(|| self.default.clone())
    }

    pub fn default_values(&self) -> Option<&[K::Value]> {
        self.default.as_deref()
    }

    pub async fn verify(&self, candidate: &K::Value) -> Result<(), ValueError> {
        self.rules.verify(candidate).await
    }
}

impl<K: ValueKind> fmt::Debug for ArrayFlag<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayFlag")
            .field("kind", &K::KIND)
            .field("name", &self.name)
            .field("short", &self.short)
            .field("default", &self.default)
            .field("current", &*self.current.lock())
            .finish_non_exhaustive()
    }
}

impl<K: ValueKind> Flag for ArrayFlag<K> {
    fn name(&self) -> &str {
        &self.name
    }

    fn shorthand(&self) -> Option<char> {
        self.short
    }

    fn usage_text(&self) -> &str {
        &self.usage
    }

    fn kind(&self) -> FlagKind {
        K::KIND
    }

    fn is_array(&self) -> bool {
        true
    }

    fn parse<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<(), ValueError>> {
        async move {
            let value = K::convert(text)?;
            self.rules.verify(&value).await?;
            self.current.lock().get_or_insert_with(Vec::new).push(value);
            Ok(())
        }
        .boxed()
    }

    fn reset(&self) {
        *self.current.lock() = None;
    }

    fn is_set(&self) -> bool {
        self.current.lock().is_some()
    }

    fn default_as_string(&self) -> Option<String> {
        self.default
            .as_deref()
            .map(|values| format!("[{}]", describe_list::<K>(values)))
    }

    fn allowed_values_as_string(&self) -> Option<String> {
        self.rules.allowed_as_string()
    }

    fn value_as_string(&self) -> Option<String> {
        self.values().map(|values| {
            let items: Vec<String> = values.iter().map(K::render).collect();
            format!("[{}]", items.join(", "))
        })
    }

    fn guess_closest(&self, input: &str, max_distance: usize) -> Option<String> {
        self.rules.guess(input, max_distance)
    }
}
