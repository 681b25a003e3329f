//! String interning for attribute names.
//!
//! Attribute names are interned once and compared by `StringId` afterwards, so MRO
//! scans and namespace lookups never hash or compare string contents.
//!
//! StringIds are laid out as follows:
//! * 0 to count(StaticStrings) - the names in [`StaticStrings`]
//! * 10_000+ - strings interned per runtime

use std::str::FromStr;

use ahash::AHashMap;
use strum::{EnumString, FromRepr, IntoStaticStr};

/// Index into the string interner's storage.
///
/// Uses `u32` to save space (4 bytes vs 8 bytes for `usize`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub struct StringId(u32);

impl StringId {
    /// Returns the raw index value.
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

const INTERN_STRING_ID_OFFSET: usize = 10_000;

/// Static string values which are known at compile time and don't need to be interned.
#[repr(u16)]
#[derive(
    Debug, Clone, Copy, FromRepr, EnumString, IntoStaticStr, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[strum(serialize_all = "snake_case")]
pub enum StaticStrings {
    #[strum(serialize = "__class__")]
    DunderClass,
    #[strum(serialize = "__thisclass__")]
    DunderThisclass,
    #[strum(serialize = "__self__")]
    DunderSelf,
    #[strum(serialize = "__self_class__")]
    DunderSelfClass,
    #[strum(serialize = "__func__")]
    DunderFunc,
    #[strum(serialize = "__get__")]
    DunderGet,
    #[strum(serialize = "__init__")]
    DunderInit,
    #[strum(serialize = "__repr__")]
    DunderRepr,
    #[strum(serialize = "__name__")]
    DunderName,
    // class names of the builtin types
    Object,
    Type,
    Super,
    #[strum(serialize = "NoneType")]
    NoneType,
    Bool,
    Int,
    Str,
    Function,
    #[strum(serialize = "builtin_function_or_method")]
    BuiltinFunctionOrMethod,
    Method,
    Staticmethod,
    Classmethod,
    Property,
    #[strum(serialize = "member_descriptor")]
    MemberDescriptor,
    #[strum(serialize = "getset_descriptor")]
    GetsetDescriptor,
}

impl StaticStrings {
    /// Attempts to convert a `StringId` back to a `StaticStrings` variant.
    ///
    /// Returns `None` if the `StringId` is a dynamically interned string.
    #[must_use]
    pub fn from_string_id(id: StringId) -> Option<Self> {
        u16::try_from(id.0).ok().and_then(Self::from_repr)
    }

    /// Returns the text of this static string.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// Converts this static string variant to its corresponding `StringId`.
impl From<StaticStrings> for StringId {
    fn from(value: StaticStrings) -> Self {
        Self(value as u32)
    }
}

impl PartialEq<StaticStrings> for StringId {
    fn eq(&self, other: &StaticStrings) -> bool {
        *self == Self::from(*other)
    }
}

impl PartialEq<StringId> for StaticStrings {
    fn eq(&self, other: &StringId) -> bool {
        StringId::from(*self) == *other
    }
}

/// Storage for interned strings owned by a runtime.
#[derive(Debug, Clone, Default)]
pub(crate) struct Interns {
    string_map: AHashMap<String, StringId>,
    strings: Vec<String>,
}

impl Interns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns a string, returning its `StringId`.
    ///
    /// * If the string is a known static string, return the pre-interned string id
    /// * If the string was already interned, returns the existing string id
    /// * Otherwise, stores the string and returns a new string id
    pub fn intern(&mut self, s: &str) -> StringId {
        if let Ok(ss) = StaticStrings::from_str(s) {
            return ss.into();
        }
        if let Some(&id) = self.string_map.get(s) {
            return id;
        }
        let raw = self.strings.len() + INTERN_STRING_ID_OFFSET;
        let id = StringId(u32::try_from(raw).unwrap_or(u32::MAX));
        self.strings.push(s.to_owned());
        self.string_map.insert(s.to_owned(), id);
        id
    }

    /// Returns the `StringId` of `s` if it is static or was interned before,
    /// without storing anything.
    pub fn lookup(&self, s: &str) -> Option<StringId> {
        match StaticStrings::from_str(s) {
            Ok(ss) => Some(ss.into()),
            Err(_) => self.string_map.get(s).copied(),
        }
    }

    /// Looks up a string by its `StringId`.
    ///
    /// # Panics
    ///
    /// Panics if the `StringId` was not produced by this interner.
    #[inline]
    pub fn get_str(&self, id: StringId) -> &str {
        if let Some(ss) = StaticStrings::from_string_id(id) {
            ss.as_str()
        } else {
            &self.strings[id.index() - INTERN_STRING_ID_OFFSET]
        }
    }

    /// Returns the number of dynamically interned strings.
    pub fn interned_string_count(&self) -> usize {
        self.strings.len()
    }
}
