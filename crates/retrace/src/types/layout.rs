//! Target data layouts
//!
//! Two compilations of the same declaration can disagree on widths and
//! alignments; a [`TargetLayout`] captures one side of that. All sizes
//! here are in bits.

use super::kind::BuiltinKind;

/// Width and alignment of a type, in bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeInfo {
    pub width: u64,
    pub align: u64,
}

impl TypeInfo {
    pub const fn new(width: u64, align: u64) -> Self {
        Self { width, align }
    }

    /// Width in whole bytes, rounding up
    pub fn size_in_bytes(&self) -> u64 {
        self.width.div_ceil(8)
    }
}

/// Builtin and pointer layout for one target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetLayout {
    pub name: &'static str,
    pub char_is_signed: bool,
    pub wchar_is_signed: bool,
    pub pointer: TypeInfo,
    pub bool_: TypeInfo,
    pub char_: TypeInfo,
    pub short: TypeInfo,
    pub int: TypeInfo,
    pub long: TypeInfo,
    pub long_long: TypeInfo,
    /// `None` on targets without `__int128`
    pub int128: Option<TypeInfo>,
    pub half: TypeInfo,
    pub float: TypeInfo,
    pub double: TypeInfo,
    pub long_double: TypeInfo,
    pub wchar: TypeInfo,
    pub char16: TypeInfo,
    pub char32: TypeInfo,
}

impl TargetLayout {
    /// x86-64 System V
    pub fn lp64() -> Self {
        Self {
            name: "lp64",
            char_is_signed: true,
            wchar_is_signed: true,
            pointer: TypeInfo::new(64, 64),
            bool_: TypeInfo::new(8, 8),
            char_: TypeInfo::new(8, 8),
            short: TypeInfo::new(16, 16),
            int: TypeInfo::new(32, 32),
            long: TypeInfo::new(64, 64),
            long_long: TypeInfo::new(64, 64),
            int128: Some(TypeInfo::new(128, 128)),
            half: TypeInfo::new(16, 16),
            float: TypeInfo::new(32, 32),
            double: TypeInfo::new(64, 64),
            long_double: TypeInfo::new(128, 128),
            wchar: TypeInfo::new(32, 32),
            char16: TypeInfo::new(16, 16),
            char32: TypeInfo::new(32, 32),
        }
    }

    /// i386 System V
    pub fn ilp32() -> Self {
        Self {
            name: "ilp32",
            pointer: TypeInfo::new(32, 32),
            long: TypeInfo::new(32, 32),
            long_long: TypeInfo::new(64, 32),
            int128: None,
            double: TypeInfo::new(64, 32),
            long_double: TypeInfo::new(96, 32),
            ..Self::lp64()
        }
    }

    /// 64-bit Windows
    pub fn llp64() -> Self {
        Self {
            name: "llp64",
            wchar_is_signed: false,
            long: TypeInfo::new(32, 32),
            long_double: TypeInfo::new(64, 64),
            wchar: TypeInfo::new(16, 16),
            ..Self::lp64()
        }
    }

    /// Motorola 68000: everything wider than a byte is word aligned
    pub fn m68k() -> Self {
        Self {
            name: "m68k",
            char_is_signed: true,
            wchar_is_signed: true,
            pointer: TypeInfo::new(32, 16),
            bool_: TypeInfo::new(8, 8),
            char_: TypeInfo::new(8, 8),
            short: TypeInfo::new(16, 16),
            int: TypeInfo::new(32, 16),
            long: TypeInfo::new(32, 16),
            long_long: TypeInfo::new(64, 16),
            int128: None,
            half: TypeInfo::new(16, 16),
            float: TypeInfo::new(32, 16),
            double: TypeInfo::new(64, 16),
            long_double: TypeInfo::new(96, 16),
            wchar: TypeInfo::new(32, 16),
            char16: TypeInfo::new(16, 16),
            char32: TypeInfo::new(32, 16),
        }
    }

    /// The layout of the machine running this process
    pub fn host() -> Self {
        let mut layout = if cfg!(all(target_pointer_width = "64", windows)) {
            Self::llp64()
        } else if cfg!(target_pointer_width = "64") {
            Self::lp64()
        } else {
            Self::ilp32()
        };
        layout.name = "host";
        layout.char_is_signed = std::ffi::c_char::MIN != 0;
        if cfg!(all(target_arch = "aarch64", not(target_vendor = "apple"), not(windows))) {
            layout.wchar_is_signed = false;
        }
        if cfg!(any(
            windows,
            all(target_arch = "aarch64", target_vendor = "apple")
        )) {
            layout.long_double = TypeInfo::new(64, 64);
        }
        layout
    }

    /// Look up a preset by name
    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "lp64" => Some(Self::lp64()),
            "ilp32" => Some(Self::ilp32()),
            "llp64" => Some(Self::llp64()),
            "m68k" => Some(Self::m68k()),
            "host" => Some(Self::host()),
            _ => None,
        }
    }

    /// The kind plain `char` has on this target
    pub fn plain_char(&self) -> BuiltinKind {
        if self.char_is_signed {
            BuiltinKind::CharS
        } else {
            BuiltinKind::CharU
        }
    }

    /// The kind `wchar_t` has on this target
    pub fn wchar_kind(&self) -> BuiltinKind {
        if self.wchar_is_signed {
            BuiltinKind::WCharS
        } else {
            BuiltinKind::WCharU
        }
    }

    /// Layout of a builtin; `None` for `void` and unavailable kinds
    pub fn builtin(&self, kind: BuiltinKind) -> Option<TypeInfo> {
        let info = match kind {
            BuiltinKind::Void => return None,
            BuiltinKind::Bool => self.bool_,
            BuiltinKind::CharU | BuiltinKind::UChar | BuiltinKind::CharS | BuiltinKind::SChar => {
                self.char_
            }
            BuiltinKind::WCharU | BuiltinKind::WCharS => self.wchar,
            BuiltinKind::Char16 => self.char16,
            BuiltinKind::Char32 => self.char32,
            BuiltinKind::UShort | BuiltinKind::Short => self.short,
            BuiltinKind::UInt | BuiltinKind::Int => self.int,
            BuiltinKind::ULong | BuiltinKind::Long => self.long,
            BuiltinKind::ULongLong | BuiltinKind::LongLong => self.long_long,
            BuiltinKind::UInt128 | BuiltinKind::Int128 => return self.int128,
            BuiltinKind::Half => self.half,
            BuiltinKind::Float => self.float,
            BuiltinKind::Double => self.double,
            BuiltinKind::LongDouble => self.long_double,
            BuiltinKind::NullPtr => self.pointer,
        };
        Some(info)
    }
}

impl Default for TargetLayout {
    fn default() -> Self {
        Self::host()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_long_differs_between_lp64_and_llp64() {
        let lp64 = TargetLayout::lp64();
        let llp64 = TargetLayout::llp64();
        assert_eq!(lp64.builtin(BuiltinKind::Long), Some(TypeInfo::new(64, 64)));
        assert_eq!(llp64.builtin(BuiltinKind::Long), Some(TypeInfo::new(32, 32)));
        assert_eq!(
            lp64.builtin(BuiltinKind::Int),
            llp64.builtin(BuiltinKind::Int)
        );
    }

    #[test]
    fn test_m68k_is_word_aligned() {
        let m68k = TargetLayout::m68k();
        assert_eq!(m68k.builtin(BuiltinKind::Int), Some(TypeInfo::new(32, 16)));
        assert_eq!(m68k.pointer, TypeInfo::new(32, 16));
        assert_eq!(m68k.builtin(BuiltinKind::Int128), None);
    }

    #[test]
    fn test_void_has_no_layout() {
        assert_eq!(TargetLayout::lp64().builtin(BuiltinKind::Void), None);
    }

    #[test]
    fn test_host_pointer_width() {
        let host = TargetLayout::host();
        assert_eq!(host.pointer.width, usize::BITS as u64);
        assert_eq!(host.name, "host");
    }

    #[test]
    fn test_by_name() {
        assert_eq!(TargetLayout::by_name("ilp32"), Some(TargetLayout::ilp32()));
        assert_eq!(TargetLayout::by_name("pdp11"), None);
    }
}
