use std::fmt;

/// Register files an operand can name.
///
/// Each file is an independent resource class for dependency tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterFile {
    /// Virtual general register, numbered by the lowering pass. Only valid
    /// before register allocation.
    Virtual,
    /// Allocated general register.
    General,
    /// Message register used to build send payloads on older generations.
    Message,
    /// General register pinned by the hardware ABI (thread payload, push
    /// constants); valid in both modes.
    FixedGeneral,
    /// The implicit accumulator.
    Accumulator,
}

/// A reference to one or more consecutive registers of a register file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegRef {
    /// Register file
    pub file: RegisterFile,
    /// Register number within the file
    pub nr: u32,
    /// Register offset inside a multi-register virtual register
    pub offset: u32,
    /// Number of consecutive registers covered, at least 1
    pub regs: u32,
}

/// A source or destination operand.
///
/// Only [`Operand::Register`] participates in dependency tracking.
/// [`Operand::Unmodeled`] names a register class the scheduler has no model
/// for; an instruction touching one is serialized against the whole block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Operand {
    /// No operand in this slot.
    #[default]
    None,
    /// A register reference.
    Register(RegRef),
    /// An immediate value.
    Immediate(u32),
    /// A push-constant slot, read-only for the whole shader.
    Uniform(u32),
    /// A compiler-internal register class, identified by an opaque tag.
    Unmodeled(u32),
}

impl Operand {
    /// Virtual register `nr`, at register offset `offset`.
    #[must_use]
    pub const fn vgrf(nr: u32, offset: u32) -> Self {
        Operand::Register(RegRef {
            file: RegisterFile::Virtual,
            nr,
            offset,
            regs: 1,
        })
    }

    /// Allocated general register `nr`.
    #[must_use]
    pub const fn grf(nr: u32) -> Self {
        Operand::Register(RegRef {
            file: RegisterFile::General,
            nr,
            offset: 0,
            regs: 1,
        })
    }

    /// Message register `nr`.
    #[must_use]
    pub const fn mrf(nr: u32) -> Self {
        Operand::Register(RegRef {
            file: RegisterFile::Message,
            nr,
            offset: 0,
            regs: 1,
        })
    }

    /// Hardware-fixed general register `nr`.
    #[must_use]
    pub const fn fixed_grf(nr: u32) -> Self {
        Operand::Register(RegRef {
            file: RegisterFile::FixedGeneral,
            nr,
            offset: 0,
            regs: 1,
        })
    }

    /// The accumulator.
    #[must_use]
    pub const fn accumulator() -> Self {
        Operand::Register(RegRef {
            file: RegisterFile::Accumulator,
            nr: 0,
            offset: 0,
            regs: 1,
        })
    }

    /// Returns this operand widened to cover `regs` consecutive registers.
    ///
    /// Non-register operands are returned unchanged.
    #[must_use]
    pub const fn spanning(self, regs: u32) -> Self {
        match self {
            Operand::Register(r) => Operand::Register(RegRef {
                regs: if regs == 0 { 1 } else { regs },
                ..r
            }),
            other => other,
        }
    }

    /// Returns the register reference, if this operand names a register.
    #[must_use]
    pub const fn as_register(&self) -> Option<&RegRef> {
        match self {
            Operand::Register(r) => Some(r),
            _ => None,
        }
    }

    /// Returns `true` if the slot is empty.
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Operand::None)
    }

    /// Returns `true` for operand kinds without a dependency model.
    #[must_use]
    pub const fn is_unmodeled(&self) -> bool {
        matches!(self, Operand::Unmodeled(_))
    }

    /// Returns the virtual register number, if this operand names one.
    #[must_use]
    pub const fn vgrf_nr(&self) -> Option<u32> {
        match self {
            Operand::Register(RegRef {
                file: RegisterFile::Virtual,
                nr,
                ..
            }) => Some(*nr),
            _ => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::None => f.write_str("null"),
            Operand::Register(r) => {
                match r.file {
                    RegisterFile::Virtual => write!(f, "vgrf{}.{}", r.nr, r.offset)?,
                    RegisterFile::General => write!(f, "g{}", r.nr)?,
                    RegisterFile::Message => write!(f, "m{}", r.nr)?,
                    RegisterFile::FixedGeneral => write!(f, "r{}", r.nr)?,
                    RegisterFile::Accumulator => f.write_str("acc0")?,
                }
                if r.regs > 1 {
                    write!(f, "<{}>", r.regs)?;
                }
                Ok(())
            }
            Operand::Immediate(v) => write!(f, "0x{v:08x}"),
            Operand::Uniform(u) => write!(f, "u{u}"),
            Operand::Unmodeled(tag) => write!(f, "?{tag}"),
        }
    }
}
